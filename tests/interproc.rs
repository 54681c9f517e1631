//! End-to-end tests of the inter-procedural engine through the
//! example analyses.

use std::collections::BTreeSet;
use std::rc::Rc;
use valueflow::copyconst::{Constness, CopyConstantAnalysis};
use valueflow::liveness::LivenessAnalysis;
use valueflow::prelude::*;
use valueflow::sign::{return_local, Sign, SignAnalysis};
use vf_lang::{CmpOp, Cond, Expr, Function, Operand, Program, Stmt};

fn local(name: &str) -> vf_lang::Local {
    vf_lang::Local::new(name)
}

fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: local(target),
        value,
    }
}

fn call(result: Option<&str>, callee: &str, args: Vec<Operand>) -> Stmt {
    Stmt::Call {
        result: result.map(local),
        callee: callee.to_string(),
        args,
    }
}

fn ret(operand: Operand) -> Stmt {
    Stmt::Return {
        value: Some(operand),
    }
}

fn branch(lhs: Operand, op: CmpOp, rhs: Operand, target: usize) -> Stmt {
    Stmt::Branch {
        cond: Cond { op, lhs, rhs },
        target,
    }
}

/// `f(a, b) { x = a; y = b; if a < 5 { z = x } else { z = y }; return z }`
fn branching_callee() -> Function {
    Function::new(
        "f",
        vec![local("a"), local("b")],
        vec![
            assign("x", Expr::Operand(Operand::local("a"))),
            assign("y", Expr::Operand(Operand::local("b"))),
            branch(Operand::local("a"), CmpOp::Lt, Operand::Const(5), 5),
            assign("z", Expr::Operand(Operand::local("y"))),
            Stmt::Jump { target: 6 },
            assign("z", Expr::Operand(Operand::local("x"))),
            ret(Operand::local("z")),
        ],
    )
    .unwrap()
}

/// Finds the unique node of `method` satisfying `pred`.
fn find_node<R, C>(
    analysis: &InterProceduralAnalysis<R, C>,
    method: &R::Method,
    pred: impl Fn(&R::Node) -> bool,
) -> vf_engine::NodeIndex
where
    R: ProgramRepresentation,
    C: DataFlowAnalysis<R>,
{
    let cfg = analysis.program().control_flow_graph(method).unwrap();
    let mut matches = cfg.node_indices().filter(|&id| pred(cfg.node(id)));
    let found = matches.next().expect("node present");
    assert!(matches.next().is_none(), "node not unique");
    found
}

// Straight-line constant: one method returning 5 gets one context
// whose exit value binds the return pseudo-local to a positive sign.
#[test]
fn sign_of_straight_line_constant() {
    init_logger(false);
    let mut program = Program::new();
    program
        .define(Function::new("main", vec![], vec![ret(Operand::Const(5))]).unwrap())
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        SignAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();

    let contexts = analysis.contexts_of(&"main".to_string());
    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].is_analysed());
    assert_eq!(
        contexts[0].exit_value().get(&return_local()),
        Some(&Sign::Positive)
    );
}

// Mutual recursion with a reusable context: f(a, b) = if a < b then
// a * b else g(10), g(u) = f(-u, u), called as f(5, -3). The
// invariant under test is termination with every context analysed.
#[test]
fn sign_terminates_on_mutual_recursion() {
    let mut program = Program::new();
    program
        .define(
            Function::new(
                "f",
                vec![local("a"), local("b")],
                vec![
                    branch(Operand::local("a"), CmpOp::Lt, Operand::local("b"), 3),
                    call(Some("t"), "g", vec![Operand::Const(10)]),
                    ret(Operand::local("t")),
                    assign("r", Expr::Mul(Operand::local("a"), Operand::local("b"))),
                    ret(Operand::local("r")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program
        .define(
            Function::new(
                "g",
                vec![local("u")],
                vec![
                    assign("n", Expr::Neg(Operand::local("u"))),
                    call(Some("t"), "f", vec![Operand::local("n"), Operand::local("u")]),
                    ret(Operand::local("t")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program
        .define(
            Function::new(
                "main",
                vec![],
                vec![
                    call(
                        Some("r"),
                        "f",
                        vec![Operand::Const(5), Operand::Const(-3)],
                    ),
                    ret(Operand::local("r")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        SignAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();

    for method in ["main", "f", "g"] {
        let contexts = analysis.contexts_of(&method.to_string());
        assert!(!contexts.is_empty(), "no context for {method}");
        for context in contexts {
            assert!(context.is_analysed(), "partial analysis of {method}");
        }
    }
    let main = analysis.contexts_of(&"main".to_string())[0];
    assert_eq!(
        main.exit_value().get(&return_local()),
        Some(&Sign::Negative)
    );
}

// Copy constants across one call: f(8, 8) yields a constant 8 both at
// f's return and at the caller's result local.
#[test]
fn copy_constant_across_one_call() {
    let mut program = Program::new();
    program.define(branching_callee()).unwrap();
    program
        .define(
            Function::new(
                "main",
                vec![],
                vec![
                    call(
                        Some("z"),
                        "f",
                        vec![Operand::Const(8), Operand::Const(8)],
                    ),
                    ret(Operand::local("z")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        CopyConstantAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();

    let entry: valueflow::copyconst::ConstMap = [
        (local("a"), Constness::Constant(8)),
        (local("b"), Constness::Constant(8)),
    ]
    .into_iter()
    .collect();
    let f_context = analysis
        .context(&"f".to_string(), &entry)
        .expect("context keyed by the call's entry value");
    assert_eq!(
        f_context.exit_value().get(&return_local()),
        Some(&Constness::Constant(8))
    );

    let call_node = find_node(&analysis, &"main".to_string(), |loc| {
        matches!(loc.stmt(), Stmt::Call { .. })
    });
    let main_context = analysis.contexts_of(&"main".to_string())[0];
    assert_eq!(
        main_context.value_after(call_node).unwrap().get(&local("z")),
        Some(&Constness::Constant(8))
    );
}

// Different entry values produce separate contexts; equal ones are
// reused.
#[test]
fn distinct_entry_values_get_distinct_contexts() {
    let mut program = Program::new();
    program.define(branching_callee()).unwrap();
    program
        .define(
            Function::new(
                "main",
                vec![],
                vec![
                    call(
                        Some("r1"),
                        "f",
                        vec![Operand::Const(8), Operand::Const(8)],
                    ),
                    call(
                        Some("r2"),
                        "f",
                        vec![Operand::Const(3), Operand::Const(3)],
                    ),
                    call(
                        Some("r3"),
                        "f",
                        vec![Operand::Const(8), Operand::Const(8)],
                    ),
                    ret(Operand::local("r2")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        CopyConstantAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();

    let contexts = analysis.contexts_of(&"f".to_string());
    assert_eq!(contexts.len(), 2);
    assert_ne!(contexts[0].entry_value(), contexts[1].entry_value());
}

// A call whose targets cannot be resolved: no callee context is
// created, the call-site is recorded as a default site, and the value
// after the call is the local component alone.
#[test]
fn unresolved_call_applies_local_flow_alone() {
    let mut program = Program::new();
    program
        .define(
            Function::new(
                "main",
                vec![],
                vec![
                    assign("x", Expr::Operand(Operand::Const(1))),
                    call(None, "mystery", vec![Operand::local("x")]),
                    ret(Operand::local("x")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        CopyConstantAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();

    let methods: Vec<&String> = analysis.methods().collect();
    assert_eq!(methods, [&"main".to_string()]);
    assert_eq!(analysis.transition_table().default_call_sites().len(), 1);

    let call_node = find_node(&analysis, &"main".to_string(), |loc| {
        matches!(loc.stmt(), Stmt::Call { .. })
    });
    let main_context = analysis.contexts_of(&"main".to_string())[0];
    let before = main_context.value_before(call_node).unwrap();
    let after = main_context.value_after(call_node).unwrap();
    assert_eq!(after, before);
    assert_eq!(after.get(&local("x")), Some(&Constness::Constant(1)));
}

// A resolved call to a body-less function gets a degenerate context
// that is analysed immediately with its exit equal to its entry.
#[test]
fn phantom_target_gets_degenerate_context() {
    let mut program = Program::new();
    program.define(Function::native("ext", vec![local("p")])).unwrap();
    program
        .define(
            Function::new(
                "main",
                vec![],
                vec![
                    call(Some("y"), "ext", vec![Operand::Const(7)]),
                    ret(Operand::local("y")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        CopyConstantAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();

    let contexts = analysis.contexts_of(&"ext".to_string());
    assert_eq!(contexts.len(), 1);
    let phantom = contexts[0];
    assert!(phantom.is_analysed());
    assert!(!phantom.is_freed());
    assert!(phantom.cfg().is_none());
    assert_eq!(phantom.entry_value(), phantom.exit_value());
    assert_eq!(
        phantom.entry_value().get(&local("p")),
        Some(&Constness::Constant(7))
    );

    // The transition to the phantom context is recorded.
    let call_node = find_node(&analysis, &"main".to_string(), |loc| {
        matches!(loc.stmt(), Stmt::Call { .. })
    });
    let main_id = analysis.contexts_of(&"main".to_string())[0].id();
    let targets = analysis.targets(CallSite::new(main_id, call_node)).unwrap();
    assert_eq!(targets[&"ext".to_string()], phantom.id());
}

// On-the-fly reclamation drops per-node tables but keeps boundary
// values and the transition table queryable; the meet-over-valid-paths
// projection becomes unavailable.
#[test]
fn reclamation_keeps_boundary_values_and_transitions() {
    let mut program = Program::new();
    program.define(branching_callee()).unwrap();
    program
        .define(
            Function::new(
                "main",
                vec![],
                vec![
                    call(
                        Some("z"),
                        "f",
                        vec![Operand::Const(8), Operand::Const(8)],
                    ),
                    ret(Operand::local("z")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        CopyConstantAnalysis::new(program),
    )
    .free_results_on_the_fly(true);
    analysis.do_analysis().unwrap();

    for method in ["main", "f"] {
        for context in analysis.contexts_of(&method.to_string()) {
            assert!(context.is_analysed());
            assert!(context.is_freed(), "context of {method} not reclaimed");
        }
    }
    let f_context = analysis.contexts_of(&"f".to_string())[0];
    assert_eq!(
        f_context.exit_value().get(&return_local()),
        Some(&Constness::Constant(8))
    );

    assert!(matches!(
        analysis.meet_over_valid_paths_solution(),
        Err(AnalysisError::FreedContext(_))
    ));

    let call_node = find_node(&analysis, &"main".to_string(), |loc| {
        matches!(loc.stmt(), Stmt::Call { .. })
    });
    let main_id = analysis.contexts_of(&"main".to_string())[0].id();
    let targets = analysis.targets(CallSite::new(main_id, call_node)).unwrap();
    assert_eq!(targets[&"f".to_string()], f_context.id());
}

// The meet-over-valid-paths projection merges per-node values across
// contexts: a local that is a different constant in each context of a
// method projects to non-constant.
#[test]
fn meet_over_valid_paths_merges_contexts() {
    let mut program = Program::new();
    program.define(branching_callee()).unwrap();
    program
        .define(
            Function::new(
                "main",
                vec![],
                vec![
                    call(
                        Some("r1"),
                        "f",
                        vec![Operand::Const(8), Operand::Const(8)],
                    ),
                    call(
                        Some("r2"),
                        "f",
                        vec![Operand::Const(3), Operand::Const(3)],
                    ),
                    ret(Operand::local("r1")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        CopyConstantAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();

    let return_node = find_node(&analysis, &"f".to_string(), |loc| {
        matches!(loc.stmt(), Stmt::Return { .. })
    });
    let cfg = analysis
        .program()
        .control_flow_graph(&"f".to_string())
        .unwrap();
    let return_loc = cfg.node(return_node).clone();

    // Context-sensitively, z is constant in each context of f.
    for (context, expected) in analysis
        .contexts_of(&"f".to_string())
        .iter()
        .zip([Constness::Constant(8), Constness::Constant(3)])
    {
        assert_eq!(
            context.value_before(return_node).unwrap().get(&local("z")),
            Some(&expected)
        );
    }

    // The projection merges the two constants to non-constant.
    let solution = analysis.meet_over_valid_paths_solution().unwrap();
    assert_eq!(
        solution.value_before(&return_loc).unwrap().get(&local("z")),
        Some(&Constness::Varying)
    );
}

// Re-running the analysis over the same program and client is a no-op
// at the observable-solution level.
#[test]
fn reanalysis_is_idempotent() {
    let mut program = Program::new();
    program
        .define(Function::new("main", vec![], vec![ret(Operand::Const(5))]).unwrap())
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        SignAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();
    let created = analysis.contexts_created();
    let exit = analysis.contexts_of(&"main".to_string())[0]
        .exit_value()
        .clone();

    analysis.do_analysis().unwrap();
    assert_eq!(analysis.contexts_created(), created);
    assert_eq!(
        analysis.contexts_of(&"main".to_string())[0].exit_value(),
        &exit
    );
}

// Backward liveness: the callee's context is keyed by its exit
// liveness, so an argument whose parameter is dead in the callee is
// dead at the call, and calls that discard their result get a second
// context.
#[test]
fn backward_liveness_is_context_sensitive() {
    let mut program = Program::new();
    program
        .define(
            Function::new(
                "use_first",
                vec![local("x"), local("y")],
                vec![ret(Operand::local("x"))],
            )
            .unwrap(),
        )
        .unwrap();
    program
        .define(
            Function::new(
                "main",
                vec![],
                vec![
                    assign("a", Expr::Operand(Operand::Const(1))),
                    assign("b", Expr::Operand(Operand::Const(2))),
                    call(
                        Some("c"),
                        "use_first",
                        vec![Operand::local("a"), Operand::local("b")],
                    ),
                    call(
                        None,
                        "use_first",
                        vec![Operand::local("a"), Operand::local("b")],
                    ),
                    ret(Operand::local("c")),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    program.add_entry_point("main").unwrap();
    let program = Rc::new(program);

    let mut analysis = InterProceduralAnalysis::new(
        LangRepresentation::new(Rc::clone(&program)),
        LivenessAnalysis::new(program),
    );
    analysis.do_analysis().unwrap();

    // Two contexts for the callee: result used and result discarded.
    let callee_contexts = analysis.contexts_of(&"use_first".to_string());
    assert_eq!(callee_contexts.len(), 2);
    let keys: Vec<&BTreeSet<vf_lang::Local>> = callee_contexts
        .iter()
        .map(|context| context.exit_value())
        .collect();
    assert!(keys.contains(&&BTreeSet::from([return_local()])));
    assert!(keys.contains(&&BTreeSet::new()));

    // Only the first argument is live before the result-using call;
    // the second parameter is never read by the callee.
    let using_call = find_node(&analysis, &"main".to_string(), |loc| {
        matches!(loc.stmt(), Stmt::Call { result: Some(_), .. })
    });
    let main_context = analysis.contexts_of(&"main".to_string())[0];
    let live_before = main_context.value_before(using_call).unwrap();
    assert!(live_before.contains(&local("a")));
    assert!(!live_before.contains(&local("b")));
}
