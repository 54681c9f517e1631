//! An inter-procedural copy constant propagation analysis.
//!
//! Data flow values map locals to their constant value, when one can
//! be determined by following assignments of constants to locals and
//! copies of locals to locals. Compound right-hand sides make the
//! target non-constant.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use vf_engine::{Context, DataFlowAnalysis, Direction};
use vf_lang::{Expr, LangRepresentation, Loc, Local, Operand, Program, Stmt};

use crate::sign::return_local;

/// The constant-ness of one local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constness {
    /// Statically known to hold this constant.
    Constant(i64),
    /// Possibly holding different values on different paths.
    Varying,
}

impl fmt::Display for Constness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Constant(value) => value.fmt(f),
            Self::Varying => f.write_str("_|_"),
        }
    }
}

/// Per-node data flow value. Locals absent from the map are at top
/// (no information yet).
pub type ConstMap = BTreeMap<Local, Constness>;

/// The forward inter-procedural copy constant propagation over the
/// miniature language.
pub struct CopyConstantAnalysis {
    program: Rc<Program>,
}

impl CopyConstantAnalysis {
    #[must_use]
    pub fn new(program: Rc<Program>) -> Self {
        Self { program }
    }

    /// Assigns the constant-status of `rhs` under `input` to `target`
    /// in `output`.
    fn assign(&self, target: &Local, rhs: &Expr, input: &ConstMap, output: &mut ConstMap) {
        match rhs {
            Expr::Operand(Operand::Const(value)) => {
                output.insert(target.clone(), Constness::Constant(*value));
            }
            Expr::Operand(Operand::Local(source)) => {
                // Copy the constant-status of the source, if any.
                if let Some(&status) = input.get(source) {
                    output.insert(target.clone(), status);
                }
            }
            _ => {
                // A compound expression; copy constants do not track it.
                output.insert(target.clone(), Constness::Varying);
            }
        }
    }
}

impl DataFlowAnalysis<LangRepresentation> for CopyConstantAnalysis {
    type Value = ConstMap;

    const DIRECTION: Direction = Direction::Forward;

    fn boundary_value(&self, _entry_point: &String) -> ConstMap {
        self.top_value()
    }

    fn top_value(&self) -> ConstMap {
        BTreeMap::new()
    }

    fn meet(&self, a: &ConstMap, b: &ConstMap) -> ConstMap {
        let mut result = a.clone();
        for (local, &status) in b {
            match result.get(local) {
                Some(&existing) if existing == status => {}
                Some(_) => {
                    result.insert(local.clone(), Constness::Varying);
                }
                None => {
                    result.insert(local.clone(), status);
                }
            }
        }
        result
    }

    fn normal_flow(
        &self,
        _context: &Context<String, Loc, ConstMap>,
        node: &Loc,
        value: &ConstMap,
    ) -> ConstMap {
        let mut out = value.clone();
        match node.stmt() {
            Stmt::Assign { target, value: rhs } => {
                self.assign(target, rhs, value, &mut out);
            }
            Stmt::Return {
                value: Some(operand),
            } => {
                self.assign(
                    &return_local(),
                    &Expr::Operand(operand.clone()),
                    value,
                    &mut out,
                );
            }
            _ => {}
        }
        out
    }

    fn call_entry_flow(
        &self,
        _context: &Context<String, Loc, ConstMap>,
        target: &String,
        node: &Loc,
        value: &ConstMap,
    ) -> ConstMap {
        let mut entry = self.top_value();
        let Stmt::Call { args, .. } = node.stmt() else {
            return entry;
        };
        if let Some(function) = self.program.function(target) {
            for (param, arg) in function.params().iter().zip(args) {
                self.assign(param, &Expr::Operand(arg.clone()), value, &mut entry);
            }
        }
        entry
    }

    fn call_exit_flow(
        &self,
        _context: &Context<String, Loc, ConstMap>,
        _target: &String,
        node: &Loc,
        value: &ConstMap,
    ) -> ConstMap {
        let mut after = self.top_value();
        if let Stmt::Call {
            result: Some(result),
            ..
        } = node.stmt()
        {
            self.assign(
                result,
                &Expr::Operand(Operand::Local(return_local())),
                value,
                &mut after,
            );
        }
        after
    }

    fn call_local_flow(
        &self,
        _context: &Context<String, Loc, ConstMap>,
        node: &Loc,
        value: &ConstMap,
    ) -> ConstMap {
        let mut after = value.clone();
        // The constant-status of the result flows in from the callee.
        if let Stmt::Call {
            result: Some(result),
            ..
        } = node.stmt()
        {
            after.remove(result);
        }
        after
    }
}
