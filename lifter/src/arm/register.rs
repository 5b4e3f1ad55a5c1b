//! Architectural registers addressable by the lifter.
//!
//! Core registers carry their ARM register number in the discriminant
//! (R0=0 .. PC=15), followed by the VFP single registers S0-S31, the
//! double registers D0-D15, and the status registers. R9-R12 go by their
//! platform names SB, SL, FP and IP.

use serde::{Deserialize, Serialize};

use crate::error::LiftError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
#[rustfmt::skip]
pub enum Register {
    R0 = 0, R1, R2, R3, R4, R5, R6, R7, R8,
    SB, SL, FP, IP, SP, LR, PC,
    S0 = 16, S1, S2, S3, S4, S5, S6, S7, S8, S9, S10, S11, S12, S13, S14, S15,
    S16, S17, S18, S19, S20, S21, S22, S23, S24, S25, S26, S27, S28, S29, S30, S31,
    D0 = 48, D1, D2, D3, D4, D5, D6, D7, D8, D9, D10, D11, D12, D13, D14, D15,
    APSR = 64, CPSR, SPSR, FPSCR,
}

/// Core registers in ARM numbering order, for register-list iteration.
#[rustfmt::skip]
pub const CORE_REGISTERS: [Register; 16] = [
    Register::R0, Register::R1, Register::R2, Register::R3,
    Register::R4, Register::R5, Register::R6, Register::R7,
    Register::R8, Register::SB, Register::SL, Register::FP,
    Register::IP, Register::SP, Register::LR, Register::PC,
];

impl Register {
    /// Width of the register variable in bits.
    #[must_use]
    pub const fn width(self) -> u32 {
        if (self as u32) >= 48 && (self as u32) < 64 {
            64
        } else {
            32
        }
    }

    /// The ARM register number for core registers (R0=0 .. PC=15).
    #[must_use]
    pub const fn number(self) -> Option<u32> {
        let n = self as u32;
        if n < 16 { Some(n) } else { None }
    }

    #[must_use]
    pub const fn is_single_fp(self) -> bool {
        let n = self as u32;
        n >= 16 && n < 48
    }

    #[must_use]
    pub const fn is_double_fp(self) -> bool {
        let n = self as u32;
        n >= 48 && n < 64
    }

    /// Index within the S0-S31 or D0-D15 bank.
    #[must_use]
    pub const fn fp_index(self) -> Option<u32> {
        let n = self as u32;
        if self.is_single_fp() {
            Some(n - 16)
        } else if self.is_double_fp() {
            Some(n - 48)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_psr(self) -> bool {
        matches!(
            self,
            Self::APSR | Self::CPSR | Self::SPSR | Self::FPSCR
        )
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Builds the 16-bit block-transfer register mask: bit *n* is set iff the
/// register numbered *n* is in the list.
pub fn register_mask(regs: &[Register]) -> Result<u16, LiftError> {
    let mut mask = 0u16;
    for &reg in regs {
        let n = reg.number().ok_or(LiftError::InvalidRegister(reg))?;
        mask |= 1 << n;
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn core_numbering_matches_arm() {
        assert_eq!(Register::R0.number(), Some(0));
        assert_eq!(Register::SB.number(), Some(9));
        assert_eq!(Register::SL.number(), Some(10));
        assert_eq!(Register::FP.number(), Some(11));
        assert_eq!(Register::IP.number(), Some(12));
        assert_eq!(Register::SP.number(), Some(13));
        assert_eq!(Register::LR.number(), Some(14));
        assert_eq!(Register::PC.number(), Some(15));
        assert_eq!(Register::S0.number(), None);
        for (n, reg) in CORE_REGISTERS.iter().enumerate() {
            assert_eq!(reg.number(), Some(u32::try_from(n).unwrap()));
        }
    }

    #[test]
    fn widths() {
        assert_eq!(Register::R0.width(), 32);
        assert_eq!(Register::S31.width(), 32);
        assert_eq!(Register::D0.width(), 64);
        assert_eq!(Register::D15.width(), 64);
        assert_eq!(Register::CPSR.width(), 32);
    }

    #[test]
    fn fp_bank_indices() {
        assert_eq!(Register::S0.fp_index(), Some(0));
        assert_eq!(Register::S31.fp_index(), Some(31));
        assert_eq!(Register::D0.fp_index(), Some(0));
        assert_eq!(Register::D15.fp_index(), Some(15));
        assert_eq!(Register::LR.fp_index(), None);
    }

    #[test]
    fn mask_of_register_list() {
        let mask = register_mask(&[Register::R4, Register::R5, Register::LR]).unwrap();
        assert_eq!(mask, 0b0100_0000_0011_0000);
        assert_eq!(
            register_mask(&[Register::S0]).unwrap_err(),
            LiftError::InvalidRegister(Register::S0)
        );
    }

    #[test]
    fn display_uses_platform_names() {
        assert_eq!(Register::SB.to_string(), "SB");
        assert_eq!(Register::IP.to_string(), "IP");
        assert_eq!(Register::D7.to_string(), "D7");
    }
}
