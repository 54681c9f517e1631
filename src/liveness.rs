//! An inter-procedural live-locals analysis.
//!
//! This is a backward flow problem: a local is live at a program point
//! if some path from that point reads it before overwriting it. The
//! value contexts of a function are keyed by the set of locals live at
//! its exit, so a callee whose result is discarded is analysed
//! separately from one whose result is used.

use std::collections::BTreeSet;
use std::rc::Rc;
use vf_engine::{Context, DataFlowAnalysis, Direction};
use vf_lang::{LangRepresentation, Loc, Local, Operand, Program, Stmt};

use crate::sign::return_local;

/// Per-node data flow value: the set of live locals.
pub type LiveSet = BTreeSet<Local>;

/// The backward inter-procedural liveness analysis over the miniature
/// language.
pub struct LivenessAnalysis {
    program: Rc<Program>,
}

impl LivenessAnalysis {
    #[must_use]
    pub fn new(program: Rc<Program>) -> Self {
        Self { program }
    }
}

impl DataFlowAnalysis<LangRepresentation> for LivenessAnalysis {
    type Value = LiveSet;

    const DIRECTION: Direction = Direction::Backward;

    fn boundary_value(&self, _entry_point: &String) -> LiveSet {
        // The environment observes whatever an entry point returns.
        BTreeSet::from([return_local()])
    }

    fn top_value(&self) -> LiveSet {
        BTreeSet::new()
    }

    fn meet(&self, a: &LiveSet, b: &LiveSet) -> LiveSet {
        a.union(b).cloned().collect()
    }

    /// Transfers the live set from after a non-call statement to
    /// before it.
    fn normal_flow(
        &self,
        _context: &Context<String, Loc, LiveSet>,
        node: &Loc,
        value: &LiveSet,
    ) -> LiveSet {
        let mut live = value.clone();
        match node.stmt() {
            Stmt::Assign { target, value: rhs } => {
                live.remove(target);
                live.extend(rhs.locals().cloned());
            }
            Stmt::Branch { cond, .. } => {
                live.extend(cond.locals().cloned());
            }
            Stmt::Return {
                value: Some(operand),
            } => {
                // The return operand matters only when the caller
                // observes the returned value.
                if live.remove(&return_local()) {
                    if let Operand::Local(local) = operand {
                        live.insert(local.clone());
                    }
                }
            }
            _ => {}
        }
        live
    }

    /// Maps the liveness of the callee's parameters back to the
    /// argument locals at the call.
    fn call_entry_flow(
        &self,
        _context: &Context<String, Loc, LiveSet>,
        target: &String,
        node: &Loc,
        value: &LiveSet,
    ) -> LiveSet {
        let mut live = BTreeSet::new();
        let Stmt::Call { args, .. } = node.stmt() else {
            return live;
        };
        if let Some(function) = self.program.function(target) {
            for (param, arg) in function.params().iter().zip(args) {
                if value.contains(param) {
                    if let Operand::Local(local) = arg {
                        live.insert(local.clone());
                    }
                }
            }
        }
        live
    }

    /// Derives the callee's exit liveness from the caller's: only the
    /// pseudo-local for the returned value crosses the boundary, and
    /// only when the call's result is itself live.
    fn call_exit_flow(
        &self,
        _context: &Context<String, Loc, LiveSet>,
        _target: &String,
        node: &Loc,
        value: &LiveSet,
    ) -> LiveSet {
        let mut exit = BTreeSet::new();
        if let Stmt::Call {
            result: Some(result),
            ..
        } = node.stmt()
        {
            if value.contains(result) {
                exit.insert(return_local());
            }
        }
        exit
    }

    /// Locals other than the call result are untouched by the call.
    fn call_local_flow(
        &self,
        _context: &Context<String, Loc, LiveSet>,
        node: &Loc,
        value: &LiveSet,
    ) -> LiveSet {
        let mut live = value.clone();
        if let Stmt::Call {
            result: Some(result),
            ..
        } = node.stmt()
        {
            live.remove(result);
        }
        live
    }
}
