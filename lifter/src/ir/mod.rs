//! The low-level IR emitted by the lifter: an expression tree over
//! bit-vector constants and register/temporary variables, and a linear
//! statement sequence produced per instruction.

pub mod builder;
pub mod expr;
pub mod stmt;

pub use builder::StmtBuilder;
pub use expr::{BinOp, CastKind, Expr, RelOp, UnOp, UndefKind, Var};
pub use stmt::{Label, SideEffect, Stmt};
