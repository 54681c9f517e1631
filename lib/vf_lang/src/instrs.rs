//! Instructions of the miniature three-address-code language.

use std::fmt;

/// A named local variable (or parameter) of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Local(String);

impl Local {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An immediate operand: an integer constant or a local.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Const(i64),
    Local(Local),
}

impl Operand {
    pub fn local(name: impl Into<String>) -> Self {
        Self::Local(Local::new(name))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Const(value) => value.fmt(f),
            Self::Local(local) => local.fmt(f),
        }
    }
}

/// A right-hand-side expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Operand(Operand),
    Add(Operand, Operand),
    Mul(Operand, Operand),
    Neg(Operand),
}

impl Expr {
    /// The locals read by this expression.
    pub fn locals(&self) -> impl Iterator<Item = &Local> {
        let operands = match self {
            Self::Operand(a) | Self::Neg(a) => vec![a],
            Self::Add(a, b) | Self::Mul(a, b) => vec![a, b],
        };
        operands.into_iter().filter_map(|operand| match operand {
            Operand::Local(local) => Some(local),
            Operand::Const(_) => None,
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Operand(a) => a.fmt(f),
            Self::Add(a, b) => write!(f, "{a} + {b}"),
            Self::Mul(a, b) => write!(f, "{a} * {b}"),
            Self::Neg(a) => write!(f, "-{a}"),
        }
    }
}

/// A comparison operator of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

/// The condition of a conditional branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cond {
    pub op: CmpOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Cond {
    /// The locals read by this condition.
    pub fn locals(&self) -> impl Iterator<Item = &Local> {
        [&self.lhs, &self.rhs]
            .into_iter()
            .filter_map(|operand| match operand {
                Operand::Local(local) => Some(local),
                Operand::Const(_) => None,
            })
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// A statement of a function body. Branch and jump targets are
/// statement indices within the enclosing body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    Assign {
        target: Local,
        value: Expr,
    },
    Branch {
        cond: Cond,
        target: usize,
    },
    Jump {
        target: usize,
    },
    Call {
        result: Option<Local>,
        callee: String,
        args: Vec<Operand>,
    },
    Return {
        value: Option<Operand>,
    },
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Assign { target, value } => write!(f, "{target} = {value}"),
            Self::Branch { cond, target } => write!(f, "if {cond} goto {target}"),
            Self::Jump { target } => write!(f, "goto {target}"),
            Self::Call {
                result,
                callee,
                args,
            } => {
                if let Some(result) = result {
                    write!(f, "{result} = ")?;
                }
                write!(f, "call {callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt(f)?;
                }
                write!(f, ")")
            }
            Self::Return { value: Some(value) } => write!(f, "return {value}"),
            Self::Return { value: None } => write!(f, "return"),
        }
    }
}

/// A program point: one statement at its position in a function body.
///
/// The statement is carried along so that flow functions can inspect
/// it without going back to the program; two points are equal exactly
/// when they denote the same position of the same function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Loc {
    function: String,
    index: usize,
    stmt: Stmt,
}

impl Loc {
    pub(crate) fn new(function: String, index: usize, stmt: Stmt) -> Self {
        Self {
            function,
            index,
            stmt,
        }
    }

    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn stmt(&self) -> &Stmt {
        &self.stmt
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}: {}", self.function, self.index, self.stmt)
    }
}
