//! ARM32 instruction lifting.
//!
//! Sub-layers, leaves first: operand translation ([`operand`]),
//! shift/carry primitives ([`shift`]), status-register helpers ([`psr`],
//! [`helper`]), PC-write helpers ([`helper`]), and the per-instruction
//! emitters with the top-level opcode dispatch ([`lifter`]).

pub mod condition;
pub mod context;
pub mod helper;
pub mod instruction;
pub mod lifter;
pub mod operand;
pub mod psr;
pub mod register;
pub mod shift;

pub use lifter::translate;
