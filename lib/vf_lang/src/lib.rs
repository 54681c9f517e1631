//! This crate provides the miniature three-address-code language used
//! to exercise the `ValueFlow` analysis engine: locals, expressions,
//! statements, functions, whole programs, and the program
//! representation that bridges them to the engine.

pub mod errors;
pub mod instrs;
pub mod program;
pub mod repr;

pub use errors::{LangError, LangResult};
pub use instrs::{CmpOp, Cond, Expr, Loc, Local, Operand, Stmt};
pub use program::{Function, Program};
pub use repr::LangRepresentation;
