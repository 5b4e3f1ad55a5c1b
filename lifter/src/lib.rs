//! ARM32 lifter: translates decoded ARM/Thumb instructions into a
//! low-level IR of explicit register and memory effects.
//!
//! The crate layers bottom-up: [`bitvec`] is the width-tagged value type
//! behind every IR constant, [`ir`] is the expression tree and the
//! per-instruction statement builder, and [`arm`] turns decoded
//! instructions into statement sequences via [`arm::translate`].

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
pub mod arm;

pub mod bitvec;
pub mod error;
pub mod ir;

pub use arm::translate;
pub use bitvec::BitVector;
pub use error::LiftError;
