//! Inter-procedural analysis driver.
//!
//! The driver runs a two-level work-list fixpoint: an id-ordered
//! work-list of value contexts, each holding its own priority-ordered
//! work-list of CFG nodes. The forward and backward variants share all
//! of the engine state and differ only in edge direction and boundary
//! placement; they live in the sibling modules of this one.

use crate::callsite::CallSite;
use crate::context::{Context, ContextId, WorkItem};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::program::ProgramRepresentation;
use crate::solution::DataFlowSolution;
use crate::transitions::ContextTransitionTable;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

mod backward;
mod forward;

/// The direction of a data flow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// The client-supplied half of an inter-procedural data flow problem:
/// the lattice operations and the four flow functions.
///
/// Values form a meet semi-lattice: `top_value` is the identity of
/// `meet`, and `meet` must be commutative, associative and idempotent.
/// Copy semantics are Rust's `Clone` and lattice equality is
/// `PartialEq`. Flow functions must be monotone with respect to
/// `meet` for the fixpoint to be precise; the engine defensively meets
/// every transfer result with the previous value, so a mildly
/// non-monotone client still terminates on a finite lattice.
pub trait DataFlowAnalysis<R: ProgramRepresentation> {
    /// The type of a data flow value.
    type Value: Clone + PartialEq + fmt::Debug;

    /// The direction of this analysis.
    const DIRECTION: Direction;

    /// The initial data flow value at the boundary of one program
    /// entry point.
    fn boundary_value(&self, entry_point: &R::Method) -> Self::Value;

    /// The default data flow value (lattice top).
    fn top_value(&self) -> Self::Value;

    /// The meet of two data flow values.
    fn meet(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Transfer for a node that does not contain a method call.
    fn normal_flow(
        &self,
        context: &Context<R::Method, R::Node, Self::Value>,
        node: &R::Node,
        value: &Self::Value,
    ) -> Self::Value;

    /// Maps the caller-side value at a call to the boundary value of
    /// the called method (for example, binds actuals to formals).
    fn call_entry_flow(
        &self,
        context: &Context<R::Method, R::Node, Self::Value>,
        target: &R::Method,
        node: &R::Node,
        value: &Self::Value,
    ) -> Self::Value;

    /// Maps the boundary value of the called method back to the caller
    /// side (for example, extracts the returned value).
    fn call_exit_flow(
        &self,
        context: &Context<R::Method, R::Node, Self::Value>,
        target: &R::Method,
        node: &R::Node,
        value: &Self::Value,
    ) -> Self::Value;

    /// Propagates the component of the caller's value that is not
    /// affected by the call across the call-site.
    fn call_local_flow(
        &self,
        context: &Context<R::Method, R::Node, Self::Value>,
        node: &R::Node,
        value: &Self::Value,
    ) -> Self::Value;
}

/// A generic inter-procedural analysis which is fully context
/// sensitive, even in the presence of recursion, using the data flow
/// value reaching a method to distinguish calling contexts.
pub struct InterProceduralAnalysis<R, C>
where
    R: ProgramRepresentation,
    C: DataFlowAnalysis<R>,
{
    program: R,
    client: C,
    /// All contexts ever created, indexed by their id.
    arena: Vec<Context<R::Method, R::Node, C::Value>>,
    /// Contexts of each method, for value-keyed lookups.
    contexts: HashMap<R::Method, Vec<ContextId>>,
    transitions: ContextTransitionTable<R::Method>,
    /// Contexts pending processing, ordered by id; the newest (last)
    /// is processed first.
    worklist: BTreeSet<ContextId>,
    verbose: bool,
    free_results_on_the_fly: bool,
}

impl<R, C> InterProceduralAnalysis<R, C>
where
    R: ProgramRepresentation,
    C: DataFlowAnalysis<R>,
{
    pub fn new(program: R, client: C) -> Self {
        Self {
            program,
            client,
            arena: Vec::new(),
            contexts: HashMap::new(),
            transitions: ContextTransitionTable::new(),
            worklist: BTreeSet::new(),
            verbose: false,
            free_results_on_the_fly: false,
        }
    }

    /// Enables value-level diagnostic output on the `log` facade.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Directs the analysis to release per-node value storage of a
    /// context once it can no longer be revisited.
    ///
    /// Only useful for clients that aggregate secondary results on the
    /// fly (such as call graph construction from the transition
    /// table); it makes [`Self::meet_over_valid_paths_solution`]
    /// unavailable. Boundary values are never released, so reclaimed
    /// contexts still terminate recursion and serve as cache hits.
    #[must_use]
    pub fn free_results_on_the_fly(mut self, free: bool) -> Self {
        self.free_results_on_the_fly = free;
        self
    }

    /// Runs the work-list based analysis to its fixpoint.
    ///
    /// # Errors
    ///
    /// Fails if the program representation cannot produce a control
    /// flow graph for a method that needs one.
    pub fn do_analysis(&mut self) -> AnalysisResult<()> {
        for method in self.program.entry_points() {
            let boundary = self.client.boundary_value(&method);
            self.get_or_create_context(&method, boundary)?;
        }

        while let Some(&current) = self.worklist.last() {
            if self.arena[current].worklist_is_empty() {
                self.arena[current].mark_analysed();
                self.worklist.remove(&current);
                continue;
            }
            let item = self.arena[current]
                .dequeue()
                .expect("work-list checked non-empty");
            match (item, C::DIRECTION) {
                (WorkItem::Node(_, node), Direction::Forward) => {
                    self.process_node_forward(current, node)?;
                }
                (WorkItem::Node(_, node), Direction::Backward) => {
                    self.process_node_backward(current, node)?;
                }
                (WorkItem::Boundary, Direction::Forward) => self.process_boundary_forward(current),
                (WorkItem::Boundary, Direction::Backward) => {
                    self.process_boundary_backward(current);
                }
            }
        }

        for ids in self.contexts.values() {
            for &id in ids {
                if !self.arena[id].is_analysed() {
                    log::warn!(
                        "only partial analysis of context X{} for method {:?}",
                        id,
                        self.arena[id].method()
                    );
                }
            }
        }
        Ok(())
    }

    /// Retrieves the context of `method` keyed by `value`, if one has
    /// been constructed.
    ///
    /// The key is the entry value for forward analyses and the exit
    /// value for backward analyses, compared with the lattice equality
    /// of the client's value type.
    #[must_use]
    pub fn context(
        &self,
        method: &R::Method,
        value: &C::Value,
    ) -> Option<&Context<R::Method, R::Node, C::Value>> {
        self.find_context(method, value).map(|id| &self.arena[id])
    }

    /// The contexts constructed for a method, oldest first.
    #[must_use]
    pub fn contexts_of(&self, method: &R::Method) -> Vec<&Context<R::Method, R::Node, C::Value>> {
        self.contexts
            .get(method)
            .map(|ids| ids.iter().map(|&id| &self.arena[id]).collect())
            .unwrap_or_default()
    }

    /// A context by its globally unique id.
    #[must_use]
    pub fn context_by_id(&self, id: ContextId) -> Option<&Context<R::Method, R::Node, C::Value>> {
        self.arena.get(id)
    }

    /// All methods for which at least one context was created.
    pub fn methods(&self) -> impl Iterator<Item = &R::Method> {
        self.contexts.keys()
    }

    /// The total number of contexts created so far.
    #[must_use]
    pub fn contexts_created(&self) -> usize {
        self.arena.len()
    }

    /// The call-sites which transition to the given context.
    #[must_use]
    pub fn callers(&self, context: ContextId) -> Option<&std::collections::HashSet<CallSite>> {
        self.transitions.callers(context)
    }

    /// The targets of a call-site, as a map of called methods to
    /// called contexts.
    #[must_use]
    pub fn targets(&self, call_site: CallSite) -> Option<&HashMap<R::Method, ContextId>> {
        self.transitions.targets(call_site)
    }

    #[must_use]
    pub fn transition_table(&self) -> &ContextTransitionTable<R::Method> {
        &self.transitions
    }

    #[must_use]
    pub fn program(&self) -> &R {
        &self.program
    }

    /// Reduces the context-sensitive result to a context-insensitive
    /// one by merging the values of every context at each node.
    ///
    /// # Errors
    ///
    /// Fails with [`AnalysisError::FreedContext`] if any context's
    /// per-node storage was reclaimed on the fly.
    pub fn meet_over_valid_paths_solution(
        &self,
    ) -> AnalysisResult<DataFlowSolution<R::Node, C::Value>> {
        let mut in_values: HashMap<R::Node, C::Value> = HashMap::new();
        let mut out_values: HashMap<R::Node, C::Value> = HashMap::new();
        for ids in self.contexts.values() {
            for &id in ids {
                let context = &self.arena[id];
                if context.is_freed() {
                    return Err(AnalysisError::FreedContext(id));
                }
                // Phantom contexts carry no per-node values.
                let Some(cfg) = context.cfg() else { continue };
                for node_id in cfg.node_indices() {
                    let node = cfg.node(node_id);
                    let value = context
                        .value_before(node_id)
                        .expect("per-node storage present");
                    merge_into(|a, b| self.client.meet(a, b), &mut in_values, node, value);
                    let value = context
                        .value_after(node_id)
                        .expect("per-node storage present");
                    merge_into(|a, b| self.client.meet(a, b), &mut out_values, node, value);
                }
            }
        }
        Ok(DataFlowSolution::new(in_values, out_values))
    }

    /// Looks up the context of `method` whose key equals `value`.
    fn find_context(&self, method: &R::Method, value: &C::Value) -> Option<ContextId> {
        let ids = self.contexts.get(method)?;
        ids.iter().copied().find(|&id| {
            let context = &self.arena[id];
            match C::DIRECTION {
                Direction::Forward => context.entry_value() == value,
                Direction::Backward => context.exit_value() == value,
            }
        })
    }

    /// Returns the context of `method` keyed by `value`, creating and
    /// scheduling a fresh one on a cache miss.
    fn get_or_create_context(
        &mut self,
        method: &R::Method,
        value: C::Value,
    ) -> AnalysisResult<ContextId> {
        if let Some(id) = self.find_context(method, &value) {
            return Ok(id);
        }
        self.init_context(method, value)
    }

    /// Creates a new value context and initialises the data flow
    /// values of its nodes.
    ///
    /// Every node starts at top and is placed on the node work-list;
    /// the boundary value is copied onto the head nodes (forward) or
    /// tail nodes (backward). Phantom methods get a degenerate context
    /// that is analysed immediately and never scheduled.
    fn init_context(&mut self, method: &R::Method, value: C::Value) -> AnalysisResult<ContextId> {
        let id = self.arena.len();
        if self.program.is_phantom(method) {
            let context = Context::phantom(id, method.clone(), value.clone(), value);
            self.arena.push(context);
            self.contexts.entry(method.clone()).or_default().push(id);
            log::debug!("[PHANTOM] context X{id} for {method:?}");
            return Ok(id);
        }

        let cfg = self.program.control_flow_graph(method)?;
        let mut context = Context::new(
            id,
            method.clone(),
            Rc::clone(&cfg),
            C::DIRECTION,
            self.client.top_value(),
            self.client.top_value(),
        );
        for node_id in cfg.node_indices() {
            context.set_value_before(node_id, self.client.top_value());
            context.set_value_after(node_id, self.client.top_value());
            context.enqueue_node(node_id);
        }
        match C::DIRECTION {
            Direction::Forward => {
                context.set_entry_value(value.clone());
                for &head in cfg.heads() {
                    context.set_value_before(head, value.clone());
                }
            }
            Direction::Backward => {
                context.set_exit_value(value.clone());
                for &tail in cfg.tails() {
                    context.set_value_after(tail, value.clone());
                }
            }
        }
        self.arena.push(context);
        self.contexts.entry(method.clone()).or_default().push(id);
        self.worklist.insert(id);
        log::debug!("[NEW] context X{id} for {method:?}");
        Ok(id)
    }

    /// Wakes the callers of a context that has just stabilised: their
    /// call node is re-queued and the calling context re-enters the
    /// context work-list.
    fn wake_callers(&mut self, context: ContextId) {
        let Some(callers) = self.transitions.callers(context) else {
            return;
        };
        let callers: Vec<CallSite> = callers.iter().copied().collect();
        for call_site in callers {
            let calling_context = call_site.calling_context();
            self.arena[calling_context].enqueue_node(call_site.call_node());
            self.worklist.insert(calling_context);
        }
    }

    /// Releases per-node storage of the stabilised context and of
    /// everything reachable from it, provided none of the reachable
    /// contexts can be revisited (i.e. none is on the context
    /// work-list).
    fn reclaim(&mut self, context: ContextId) {
        let arena = &self.arena;
        let reachable = self
            .transitions
            .reachable_contexts(context, |id| arena[id].is_freed());
        if reachable.iter().any(|id| self.worklist.contains(id)) {
            return;
        }
        for id in &reachable {
            self.arena[*id].free_tables();
        }
        if !reachable.contains(&context) {
            self.arena[context].free_tables();
        }
        log::debug!(
            "reclaimed per-node storage of X{context} and {} reachable context(s)",
            reachable.len()
        );
    }
}

/// Meets `value` into `values[node]`, cloning on first sight.
fn merge_into<N, A>(meet: impl Fn(&A, &A) -> A, values: &mut HashMap<N, A>, node: &N, value: &A)
where
    N: Clone + Eq + std::hash::Hash,
    A: Clone,
{
    match values.entry(node.clone()) {
        Entry::Occupied(mut entry) => {
            let merged = meet(entry.get(), value);
            entry.insert(merged);
        }
        Entry::Vacant(entry) => {
            entry.insert(value.clone());
        }
    }
}
