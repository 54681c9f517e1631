//! Value contexts: one analysis of one method under one boundary value.

use crate::controlflow::{ControlFlowGraph, NodeIndex};
use crate::interproc::Direction;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// Identifier of a value context, globally unique within one analysis.
///
/// Identifiers are assigned in creation order and index the engine's
/// context arena, so a larger id always means a newer context.
pub type ContextId = usize;

/// An entry of a context's node work-list.
///
/// Real nodes are ordered by their reverse-postorder priority; the
/// `Boundary` marker stands for "method boundary reached, recompute the
/// entry/exit value" and sorts after every real node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum WorkItem {
    Node(u32, NodeIndex),
    Boundary,
}

/// A value-based context for a context-sensitive inter-procedural
/// data flow analysis.
///
/// A context is identified by a pair of a method and the data flow
/// value at the entry of the method (forward flows) or at its exit
/// (backward flows). Two calls to the same method carrying the same
/// boundary value share one context, which is what bounds the analysis
/// in the presence of recursion: the number of contexts per method is
/// limited by the height of the (finite) lattice.
///
/// Each context owns its node work-list and its per-node before/after
/// value tables; the control flow graph is shared with every other
/// context of the same method.
#[derive(Debug)]
pub struct Context<M, N, A> {
    id: ContextId,
    method: M,
    cfg: Option<Rc<ControlFlowGraph<N>>>,
    entry_value: A,
    exit_value: A,
    in_values: Option<BTreeMap<NodeIndex, A>>,
    out_values: Option<BTreeMap<NodeIndex, A>>,
    work: Option<BTreeSet<WorkItem>>,
    priorities: Option<Vec<u32>>,
    analysed: bool,
}

impl<M, N, A> Context<M, N, A> {
    /// Creates a fresh context over the given shared control flow
    /// graph, with empty value tables and an empty work-list.
    ///
    /// The node priority order is fixed at construction from the
    /// analysis direction.
    pub(crate) fn new(
        id: ContextId,
        method: M,
        cfg: Rc<ControlFlowGraph<N>>,
        direction: Direction,
        entry_value: A,
        exit_value: A,
    ) -> Self {
        let priorities = cfg.priorities(direction);
        Self {
            id,
            method,
            cfg: Some(cfg),
            entry_value,
            exit_value,
            in_values: Some(BTreeMap::new()),
            out_values: Some(BTreeMap::new()),
            work: Some(BTreeSet::new()),
            priorities: Some(priorities),
            analysed: false,
        }
    }

    /// Creates a degenerate context for a phantom method (one without
    /// an analysable body).
    ///
    /// The context has no control flow graph and no per-node tables;
    /// its boundary values are fixed at creation and it counts as
    /// analysed immediately, so call-sites hitting it observe an
    /// identity transfer over the boundary.
    pub(crate) fn phantom(id: ContextId, method: M, entry_value: A, exit_value: A) -> Self {
        Self {
            id,
            method,
            cfg: None,
            entry_value,
            exit_value,
            in_values: Some(BTreeMap::new()),
            out_values: Some(BTreeMap::new()),
            work: Some(BTreeSet::new()),
            priorities: None,
            analysed: true,
        }
    }

    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    #[must_use]
    pub fn method(&self) -> &M {
        &self.method
    }

    /// The shared control flow graph, if this context still holds one.
    ///
    /// `None` for phantom contexts and for contexts whose storage has
    /// been reclaimed.
    #[must_use]
    pub fn cfg(&self) -> Option<&Rc<ControlFlowGraph<N>>> {
        self.cfg.as_ref()
    }

    /// The data flow value at the method entry. For forward analyses
    /// this is the context key and never changes after creation.
    #[must_use]
    pub fn entry_value(&self) -> &A {
        &self.entry_value
    }

    /// The data flow value at the method exit. For backward analyses
    /// this is the context key and never changes after creation.
    #[must_use]
    pub fn exit_value(&self) -> &A {
        &self.exit_value
    }

    /// The data flow value at the entry of the given node, if per-node
    /// storage is still live.
    #[must_use]
    pub fn value_before(&self, node: NodeIndex) -> Option<&A> {
        self.in_values.as_ref().and_then(|values| values.get(&node))
    }

    /// The data flow value at the exit of the given node, if per-node
    /// storage is still live.
    #[must_use]
    pub fn value_after(&self, node: NodeIndex) -> Option<&A> {
        self.out_values
            .as_ref()
            .and_then(|values| values.get(&node))
    }

    /// Whether this context has been fully analysed at least once.
    #[must_use]
    pub fn is_analysed(&self) -> bool {
        self.analysed
    }

    /// Whether the per-node information has been released.
    #[must_use]
    pub fn is_freed(&self) -> bool {
        self.in_values.is_none() && self.out_values.is_none()
    }

    pub(crate) fn mark_analysed(&mut self) {
        self.analysed = true;
    }

    pub(crate) fn set_entry_value(&mut self, value: A) {
        self.entry_value = value;
    }

    pub(crate) fn set_exit_value(&mut self, value: A) {
        self.exit_value = value;
    }

    pub(crate) fn set_value_before(&mut self, node: NodeIndex, value: A) {
        self.in_values
            .as_mut()
            .expect("per-node storage reclaimed")
            .insert(node, value);
    }

    pub(crate) fn set_value_after(&mut self, node: NodeIndex, value: A) {
        self.out_values
            .as_mut()
            .expect("per-node storage reclaimed")
            .insert(node, value);
    }

    pub(crate) fn enqueue_node(&mut self, node: NodeIndex) {
        let priority = self.priorities.as_ref().expect("work-list reclaimed")[node.index()];
        self.work
            .as_mut()
            .expect("work-list reclaimed")
            .insert(WorkItem::Node(priority, node));
    }

    pub(crate) fn enqueue_boundary(&mut self) {
        self.work
            .as_mut()
            .expect("work-list reclaimed")
            .insert(WorkItem::Boundary);
    }

    pub(crate) fn dequeue(&mut self) -> Option<WorkItem> {
        self.work.as_mut().and_then(BTreeSet::pop_first)
    }

    pub(crate) fn worklist_is_empty(&self) -> bool {
        self.work.as_ref().map_or(true, BTreeSet::is_empty)
    }

    /// Destroys all data flow information associated with the nodes of
    /// this context, keeping only the boundary values, the id, the
    /// method and the analysed flag.
    pub(crate) fn free_tables(&mut self) {
        self.in_values = None;
        self.out_values = None;
        self.work = None;
        self.priorities = None;
        self.cfg = None;
    }
}

impl<M, N, A> fmt::Display for Context<M, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "X{}", self.id)
    }
}
