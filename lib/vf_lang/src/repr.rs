//! Program representation bridging the language to the analysis
//! engine.

use crate::instrs::{Loc, Stmt};
use crate::program::Program;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use vf_engine::{AnalysisError, AnalysisResult, ControlFlowGraph, ProgramRepresentation};

/// The [`ProgramRepresentation`] of a [`Program`].
///
/// Builds one control flow graph per function, on demand, and hands
/// out the same shared graph to every value context of that function.
pub struct LangRepresentation {
    program: Rc<Program>,
    cfgs: RefCell<HashMap<String, Rc<ControlFlowGraph<Loc>>>>,
}

impl LangRepresentation {
    #[must_use]
    pub fn new(program: Rc<Program>) -> Self {
        Self {
            program,
            cfgs: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    fn build_cfg(&self, name: &str) -> AnalysisResult<ControlFlowGraph<Loc>> {
        let function = self
            .program
            .function(name)
            .ok_or_else(|| AnalysisError::NoBody(name.to_string()))?;
        let body = function
            .body()
            .ok_or_else(|| AnalysisError::NoBody(name.to_string()))?;

        let mut graph = DiGraph::new();
        let ids: Vec<NodeIndex> = body
            .iter()
            .enumerate()
            .map(|(index, stmt)| graph.add_node(Loc::new(name.to_string(), index, stmt.clone())))
            .collect();

        let mut tails = Vec::new();
        for (index, stmt) in body.iter().enumerate() {
            match stmt {
                Stmt::Assign { .. } | Stmt::Call { .. } => {
                    graph.add_edge(ids[index], ids[index + 1], ());
                }
                Stmt::Branch { target, .. } => {
                    graph.add_edge(ids[index], ids[*target], ());
                    graph.add_edge(ids[index], ids[index + 1], ());
                }
                Stmt::Jump { target } => {
                    graph.add_edge(ids[index], ids[*target], ());
                }
                Stmt::Return { .. } => tails.push(ids[index]),
            }
        }

        log::trace!(
            "built control flow graph for {name}: {} node(s), {} tail(s)",
            graph.node_count(),
            tails.len()
        );
        Ok(ControlFlowGraph::new(graph, vec![ids[0]], tails))
    }
}

impl ProgramRepresentation for LangRepresentation {
    type Method = String;
    type Node = Loc;

    fn entry_points(&self) -> Vec<String> {
        self.program.entry_points().to_vec()
    }

    fn control_flow_graph(&self, method: &String) -> AnalysisResult<Rc<ControlFlowGraph<Loc>>> {
        if let Some(cfg) = self.cfgs.borrow().get(method) {
            return Ok(Rc::clone(cfg));
        }
        let cfg = Rc::new(self.build_cfg(method)?);
        self.cfgs
            .borrow_mut()
            .insert(method.clone(), Rc::clone(&cfg));
        Ok(cfg)
    }

    fn is_call(&self, node: &Loc) -> bool {
        matches!(node.stmt(), Stmt::Call { .. })
    }

    fn resolve_targets(&self, _caller_method: &String, call_node: &Loc) -> Option<Vec<String>> {
        let Stmt::Call { callee, .. } = call_node.stmt() else {
            return Some(Vec::new());
        };
        // Calls are direct, so resolution is a lookup; a callee absent
        // from the program altogether has unknown targets.
        match self.program.function(callee) {
            Some(function) => Some(vec![function.name().to_string()]),
            None => None,
        }
    }

    fn is_phantom(&self, method: &String) -> bool {
        self.program
            .function(method)
            .is_some_and(|function| function.body().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrs::{CmpOp, Cond, Expr, Local, Operand};
    use crate::program::Function;

    // fn f(a) { 0: if a < 0 goto 3; 1: x = 1; 2: return x; 3: x = -a; 4: return x }
    fn program() -> Rc<Program> {
        let body = vec![
            Stmt::Branch {
                cond: Cond {
                    op: CmpOp::Lt,
                    lhs: Operand::local("a"),
                    rhs: Operand::Const(0),
                },
                target: 3,
            },
            Stmt::Assign {
                target: Local::new("x"),
                value: Expr::Operand(Operand::Const(1)),
            },
            Stmt::Return {
                value: Some(Operand::local("x")),
            },
            Stmt::Assign {
                target: Local::new("x"),
                value: Expr::Neg(Operand::local("a")),
            },
            Stmt::Return {
                value: Some(Operand::local("x")),
            },
        ];
        let mut program = Program::new();
        program
            .define(Function::new("f", vec![Local::new("a")], body).unwrap())
            .unwrap();
        Rc::new(program)
    }

    #[test]
    fn cfg_shape() {
        let repr = LangRepresentation::new(program());
        let cfg = repr.control_flow_graph(&"f".to_string()).unwrap();
        assert_eq!(cfg.len(), 5);
        assert_eq!(cfg.heads().len(), 1);
        assert_eq!(cfg.tails().len(), 2);
        let branch = cfg.heads()[0];
        assert_eq!(cfg.successors(branch).count(), 2);
        for &tail in cfg.tails() {
            assert_eq!(cfg.successors(tail).count(), 0);
        }
    }

    #[test]
    fn cfg_is_shared() {
        let repr = LangRepresentation::new(program());
        let first = repr.control_flow_graph(&"f".to_string()).unwrap();
        let second = repr.control_flow_graph(&"f".to_string()).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_callee_has_unknown_targets() {
        let repr = LangRepresentation::new(program());
        let call = Loc::new(
            "f".to_string(),
            0,
            Stmt::Call {
                result: None,
                callee: "mystery".to_string(),
                args: Vec::new(),
            },
        );
        assert!(repr.is_call(&call));
        assert_eq!(repr.resolve_targets(&"f".to_string(), &call), None);
    }
}
