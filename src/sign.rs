//! An inter-procedural simplified sign analysis.
//!
//! This analysis maps numeric locals to a sign (negative, positive or
//! zero) if it is statically determined to be singular, or else to
//! bottom. The flow functions are non-distributive for statements
//! involving sums or products of two locals.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use vf_engine::{Context, DataFlowAnalysis, Direction};
use vf_lang::{Expr, LangRepresentation, Loc, Local, Operand, Program, Stmt};

/// A data flow value representation of a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// The sign of an undefined variable: the lattice top.
    Top,
    /// The sign of the number zero.
    Zero,
    Positive,
    Negative,
    /// An unknown sign: the lattice bottom.
    Bottom,
}

impl Sign {
    /// The lattice meet of two signs.
    #[must_use]
    pub fn meet(self, other: Self) -> Self {
        match (self, other) {
            (Self::Top, s) | (s, Self::Top) => s,
            (a, b) if a == b => a,
            _ => Self::Bottom,
        }
    }

    /// The sign of a sum of two numbers with the given signs.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        match (self, other) {
            (Self::Top, s) | (s, Self::Top) => s,
            (Self::Zero, s) | (s, Self::Zero) => s,
            (Self::Positive, Self::Positive) => Self::Positive,
            (Self::Negative, Self::Negative) => Self::Negative,
            _ => Self::Bottom,
        }
    }

    /// The sign of a product of two numbers with the given signs.
    #[must_use]
    pub fn times(self, other: Self) -> Self {
        match (self, other) {
            (Self::Top, s) | (s, Self::Top) => s,
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Zero, _) | (_, Self::Zero) => Self::Zero,
            (a, b) if a == b => Self::Positive,
            _ => Self::Negative,
        }
    }

    /// The sign of the negation of a number with this sign.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
            s => s,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            Self::Top => "T",
            Self::Zero => "0",
            Self::Positive => "+",
            Self::Negative => "-",
            Self::Bottom => "_|_",
        };
        f.write_str(symbol)
    }
}

/// Per-node data flow value: the sign of every tracked local. Locals
/// absent from the map are at top.
pub type SignMap = BTreeMap<Local, Sign>;

/// The artificial local carrying the returned value of a function;
/// needed because a function can have several return statements.
#[must_use]
pub fn return_local() -> Local {
    Local::new("@return")
}

/// The forward inter-procedural sign analysis over the miniature
/// language.
pub struct SignAnalysis {
    program: Rc<Program>,
}

impl SignAnalysis {
    #[must_use]
    pub fn new(program: Rc<Program>) -> Self {
        Self { program }
    }

    fn sign_of_operand(&self, operand: &Operand, values: &SignMap) -> Sign {
        match operand {
            Operand::Const(value) => {
                if *value > 0 {
                    Sign::Positive
                } else if *value < 0 {
                    Sign::Negative
                } else {
                    Sign::Zero
                }
            }
            Operand::Local(local) => values.get(local).copied().unwrap_or(Sign::Top),
        }
    }

    fn sign_of_expr(&self, expr: &Expr, values: &SignMap) -> Sign {
        match expr {
            Expr::Operand(a) => self.sign_of_operand(a, values),
            Expr::Add(a, b) => self
                .sign_of_operand(a, values)
                .plus(self.sign_of_operand(b, values)),
            Expr::Mul(a, b) => self
                .sign_of_operand(a, values)
                .times(self.sign_of_operand(b, values)),
            Expr::Neg(a) => self.sign_of_operand(a, values).negate(),
        }
    }
}

impl DataFlowAnalysis<LangRepresentation> for SignAnalysis {
    type Value = SignMap;

    const DIRECTION: Direction = Direction::Forward;

    fn boundary_value(&self, _entry_point: &String) -> SignMap {
        self.top_value()
    }

    fn top_value(&self) -> SignMap {
        BTreeMap::new()
    }

    fn meet(&self, a: &SignMap, b: &SignMap) -> SignMap {
        let mut result = a.clone();
        for (local, &sign) in b {
            match result.get(local) {
                Some(&existing) => {
                    result.insert(local.clone(), existing.meet(sign));
                }
                None => {
                    result.insert(local.clone(), sign);
                }
            }
        }
        result
    }

    fn normal_flow(
        &self,
        _context: &Context<String, Loc, SignMap>,
        node: &Loc,
        value: &SignMap,
    ) -> SignMap {
        let mut out = value.clone();
        match node.stmt() {
            Stmt::Assign { target, value: rhs } => {
                out.insert(target.clone(), self.sign_of_expr(rhs, value));
            }
            Stmt::Return {
                value: Some(operand),
            } => {
                out.insert(return_local(), self.sign_of_operand(operand, value));
            }
            _ => {}
        }
        out
    }

    fn call_entry_flow(
        &self,
        _context: &Context<String, Loc, SignMap>,
        target: &String,
        node: &Loc,
        value: &SignMap,
    ) -> SignMap {
        let mut entry = self.top_value();
        let Stmt::Call { args, .. } = node.stmt() else {
            return entry;
        };
        if let Some(function) = self.program.function(target) {
            for (param, arg) in function.params().iter().zip(args) {
                entry.insert(param.clone(), self.sign_of_operand(arg, value));
            }
        }
        entry
    }

    fn call_exit_flow(
        &self,
        _context: &Context<String, Loc, SignMap>,
        _target: &String,
        node: &Loc,
        value: &SignMap,
    ) -> SignMap {
        let mut after = self.top_value();
        if let Stmt::Call {
            result: Some(result),
            ..
        } = node.stmt()
        {
            let sign = value.get(&return_local()).copied().unwrap_or(Sign::Top);
            after.insert(result.clone(), sign);
        }
        after
    }

    fn call_local_flow(
        &self,
        _context: &Context<String, Loc, SignMap>,
        node: &Loc,
        value: &SignMap,
    ) -> SignMap {
        let mut after = value.clone();
        // The sign of the result flows in from the callee.
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
