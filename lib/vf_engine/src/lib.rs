//! This crate provides the context-sensitive inter-procedural data
//! flow analysis engine of the `ValueFlow` project.
//!
//! The engine solves an arbitrary lattice-valued forward or backward
//! monotone data flow problem over a whole program, distinguishing
//! calling contexts by the data flow value reaching the callee: two
//! calls to the same procedure under different incoming values get
//! separate analyses, and recursion terminates as soon as a call
//! carries a value that has been seen before at that procedure.
//!
//! Clients supply the lattice and flow functions through
//! [`DataFlowAnalysis`] and the program through
//! [`ProgramRepresentation`]; the engine computes the fixpoint in
//! [`InterProceduralAnalysis::do_analysis`] and can project the
//! context-sensitive result down to a per-node
//! [`DataFlowSolution`].

pub mod callsite;
pub mod context;
pub mod controlflow;
pub mod errors;
pub mod interproc;
pub mod program;
pub mod solution;
pub mod transitions;

pub use callsite::CallSite;
pub use context::{Context, ContextId};
pub use controlflow::{ControlFlowGraph, NodeIndex};
pub use errors::{AnalysisError, AnalysisResult};
pub use interproc::{DataFlowAnalysis, Direction, InterProceduralAnalysis};
pub use program::ProgramRepresentation;
pub use solution::DataFlowSolution;
pub use transitions::ContextTransitionTable;
