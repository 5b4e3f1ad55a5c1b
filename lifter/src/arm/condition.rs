//! Condition codes.
//!
//! Almost every ARM instruction is predicated on the APSR flags through a
//! 4-bit condition field:
//!
//! | Code | Meaning             | Flags tested |
//! |------|---------------------|--------------|
//! | EQ   | Equal               | Z=1          |
//! | NE   | Not equal           | Z=0          |
//! | CS   | Unsigned >=         | C=1          |
//! | CC   | Unsigned <          | C=0          |
//! | MI   | Negative            | N=1          |
//! | PL   | Positive or zero    | N=0          |
//! | VS   | Overflow            | V=1          |
//! | VC   | No overflow         | V=0          |
//! | HI   | Unsigned >          | C=1 and Z=0  |
//! | LS   | Unsigned <=         | C=0 or Z=1   |
//! | GE   | Signed >=           | N=V          |
//! | LT   | Signed <            | N<>V         |
//! | GT   | Signed >            | Z=0 and N=V  |
//! | LE   | Signed <=           | Z=1 or N<>V  |
//! | AL   | Always              |              |
//! | UN   | Unconditional       |              |

use serde::{Deserialize, Serialize};

/// Condition codes for conditional execution. `AL` and `UN` both execute
/// unconditionally; `UN` is the encoding used by the unconditional
/// instruction space (e.g. BLX immediate).
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum Condition {
    EQ = 0x0,
    NE = 0x1,
    CS = 0x2,
    CC = 0x3,
    MI = 0x4,
    PL = 0x5,
    VS = 0x6,
    VC = 0x7,
    HI = 0x8,
    LS = 0x9,
    GE = 0xA,
    LT = 0xB,
    GT = 0xC,
    LE = 0xD,
    AL = 0xE,
    UN = 0xF,
}

impl Condition {
    /// True when the condition always passes, so no flag test is needed.
    #[must_use]
    pub const fn is_unconditional(self) -> bool {
        matches!(self, Self::AL | Self::UN)
    }
}

impl From<u8> for Condition {
    fn from(item: u8) -> Self {
        match item & 0xF {
            0x0 => Self::EQ,
            0x1 => Self::NE,
            0x2 => Self::CS,
            0x3 => Self::CC,
            0x4 => Self::MI,
            0x5 => Self::PL,
            0x6 => Self::VS,
            0x7 => Self::VC,
            0x8 => Self::HI,
            0x9 => Self::LS,
            0xA => Self::GE,
            0xB => Self::LT,
            0xC => Self::GT,
            0xD => Self::LE,
            0xE => Self::AL,
            _ => Self::UN,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EQ => f.write_str("EQ"),
            Self::NE => f.write_str("NE"),
            Self::CS => f.write_str("CS"),
            Self::CC => f.write_str("CC"),
            Self::MI => f.write_str("MI"),
            Self::PL => f.write_str("PL"),
            Self::VS => f.write_str("VS"),
            Self::VC => f.write_str("VC"),
            Self::HI => f.write_str("HI"),
            Self::LS => f.write_str("LS"),
            Self::GE => f.write_str("GE"),
            Self::LT => f.write_str("LT"),
            Self::GT => f.write_str("GT"),
            Self::LE => f.write_str("LE"),
            Self::AL => Ok(()),
            Self::UN => Ok(()),
        }
    }
}
