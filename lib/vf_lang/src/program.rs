//! Functions and whole programs.

use crate::errors::{LangError, LangResult};
use crate::instrs::{Local, Stmt};
use std::collections::BTreeMap;
use std::fmt;

/// A function: a name, parameters and an optional body.
///
/// A function without a body models an external (native) routine: it
/// can be called but not analysed.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    params: Vec<Local>,
    body: Option<Vec<Stmt>>,
}

impl Function {
    /// Builds a function with a body, checking that every branch
    /// target is in range and that control cannot fall off the end.
    ///
    /// # Errors
    ///
    /// Returns a `LangError` for an empty body, an out-of-range
    /// branch or jump target, or a final statement that falls through.
    pub fn new(
        name: impl Into<String>,
        params: Vec<Local>,
        body: Vec<Stmt>,
    ) -> LangResult<Self> {
        let name = name.into();
        if body.is_empty() {
            return Err(LangError::EmptyBody { function: name });
        }
        for stmt in &body {
            if let Stmt::Branch { target, .. } | Stmt::Jump { target } = stmt {
                if *target >= body.len() {
                    return Err(LangError::TargetOutOfRange {
                        function: name,
                        target: *target,
                    });
                }
            }
        }
        match body.last() {
            Some(Stmt::Return { .. } | Stmt::Jump { .. }) => {}
            _ => return Err(LangError::FallsOffEnd { function: name }),
        }
        Ok(Self {
            name,
            params,
            body: Some(body),
        })
    }

    /// Declares an external function with no analysable body.
    pub fn native(name: impl Into<String>, params: Vec<Local>) -> Self {
        Self {
            name: name.into(),
            params,
            body: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &[Local] {
        &self.params
    }

    #[must_use]
    pub fn body(&self) -> Option<&[Stmt]> {
        self.body.as_deref()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            param.fmt(f)?;
        }
        match &self.body {
            Some(body) => {
                writeln!(f, ") {{")?;
                for (index, stmt) in body.iter().enumerate() {
                    writeln!(f, "  {index:3}: {stmt}")?;
                }
                write!(f, "}}")
            }
            None => write!(f, ") <native>"),
        }
    }
}

/// A whole program: a set of functions plus its entry points.
#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: BTreeMap<String, Function>,
    entry_points: Vec<String>,
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function to the program.
    ///
    /// # Errors
    ///
    /// Returns a `LangError` if a function with the same name already
    /// exists.
    pub fn define(&mut self, function: Function) -> LangResult<()> {
        if self.functions.contains_key(function.name()) {
            return Err(LangError::DuplicateFunction(function.name().to_string()));
        }
        self.functions.insert(function.name().to_string(), function);
        Ok(())
    }

    /// Marks a previously defined function as a program entry point.
    ///
    /// # Errors
    ///
    /// Returns a `LangError` if no function with this name exists.
    pub fn add_entry_point(&mut self, name: &str) -> LangResult<()> {
        if !self.functions.contains_key(name) {
            return Err(LangError::UnknownFunction(name.to_string()));
        }
        self.entry_points.push(name.to_string());
        Ok(())
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    #[must_use]
    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    pub fn iter_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrs::{CmpOp, Cond, Expr, Operand};

    #[test]
    fn rejects_out_of_range_target() {
        let body = vec![
            Stmt::Branch {
                cond: Cond {
                    op: CmpOp::Lt,
                    lhs: Operand::local("a"),
                    rhs: Operand::Const(0),
                },
                target: 7,
            },
            Stmt::Return { value: None },
        ];
        assert!(matches!(
            Function::new("f", vec![Local::new("a")], body),
            Err(LangError::TargetOutOfRange { target: 7, .. })
        ));
    }

    #[test]
    fn rejects_fall_through_at_end() {
        let body = vec![Stmt::Assign {
            target: Local::new("x"),
            value: Expr::Operand(Operand::Const(1)),
        }];
        assert!(matches!(
            Function::new("f", vec![], body),
            Err(LangError::FallsOffEnd { .. })
        ));
    }

    #[test]
    fn entry_point_must_exist() {
        let mut program = Program::new();
        assert!(matches!(
            program.add_entry_point("main"),
            Err(LangError::UnknownFunction(_))
        ));
        program
            .define(Function::new("main", vec![], vec![Stmt::Return { value: None }]).unwrap())
            .unwrap();
        assert!(program.add_entry_point("main").is_ok());
        assert_eq!(program.entry_points(), ["main"]);
        assert_eq!(program.iter_functions().count(), 1);
    }
}
