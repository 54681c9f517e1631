//! # `ValueFlow`
//!
//! `valueflow` is the main crate of the `ValueFlow` inter-procedural
//! data flow analysis project. The project is subdivided into
//! multiple crates; `valueflow` acts as entry point by reexporting
//! important structs and functions from those sub-crates, most of
//! them within the `valueflow::prelude` namespace.
//!
//! ## Library basics
//!
//! An analysis run pairs a program representation with a client
//! analysis and drives both to a fixpoint:
//!
//! ```rust
//! use std::rc::Rc;
//! use valueflow::prelude::*;
//! use valueflow::sign::SignAnalysis;
//! use valueflow::lang::{Function, Operand, Program, Stmt};
//!
//! let mut program = Program::new();
//! program.define(Function::new(
//!     "main",
//!     vec![],
//!     vec![Stmt::Return { value: Some(Operand::Const(5)) }],
//! )?)?;
//! program.add_entry_point("main")?;
//! let program = Rc::new(program);
//!
//! let mut analysis = InterProceduralAnalysis::new(
//!     LangRepresentation::new(Rc::clone(&program)),
//!     SignAnalysis::new(program),
//! );
//! analysis.do_analysis()?;
//! println!("contexts created: {}", analysis.contexts_created());
//! # Ok::<(), VfError>(())
//! ```
//!
//! ## Sub-crates
//!
//!  - [`vf_engine`] contains the generic, fully context-sensitive
//!    inter-procedural analysis engine: value contexts, the context
//!    transition table, the forward and backward drivers and the
//!    meet-over-valid-paths projection,
//!  - [`vf_lang`] contains the miniature three-address-code language
//!    the example analyses run on, with its program representation.
//!
//! The example client analyses live in this crate: [`sign`],
//! [`copyconst`] and [`liveness`].

mod errors;

pub mod copyconst;
pub mod liveness;
pub mod sign;

pub use vf_engine as engine;
pub use vf_lang as lang;

/// Reexport module of commonly used structures and functions from
/// `ValueFlow` project sub-crates:
///
/// ```rust
/// use valueflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{VfError, VfResult};

    pub use vf_engine::{
        AnalysisError, CallSite, Context, ContextId, ControlFlowGraph, DataFlowAnalysis,
        DataFlowSolution, Direction, InterProceduralAnalysis, ProgramRepresentation,
    };

    pub use vf_lang::{LangRepresentation, Loc, Local, Program};

    /// Initialises the process-wide logger from the `VF_LOG`
    /// environment, raising the filter to trace level when `verbose`
    /// is set. Safe to call more than once; later calls are ignored.
    pub fn init_logger(verbose: bool) {
        let env = env_logger::Env::new()
            .filter_or("VF_LOG", "info")
            .write_style("VF_LOG_STYLE");

        let mut builder = env_logger::Builder::from_env(env);
        if verbose {
            builder.filter_level(log::LevelFilter::Trace);
        }
        let _ = builder.try_init();
    }
}
