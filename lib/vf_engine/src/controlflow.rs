//! Control flow graph representation shared by all contexts of a method.

use crate::interproc::Direction;
use petgraph::graph::DiGraph;
use petgraph::visit::{DfsPostOrder, NodeIndexable, Reversed};
use std::fmt;
use std::fmt::Write;

pub use petgraph::graph::NodeIndex;

/// An intra-procedural control flow graph.
///
/// Node weights are the client's program points; edges carry no
/// information. The graph is built once per method by the program
/// representation and shared (behind an `Rc`) by every value context
/// of that method. The engine never mutates it.
#[derive(Debug)]
pub struct ControlFlowGraph<N> {
    graph: DiGraph<N, ()>,
    heads: Vec<NodeIndex>,
    tails: Vec<NodeIndex>,
}

impl<N> ControlFlowGraph<N> {
    /// Wraps a directed graph with its designated entry and exit nodes.
    ///
    /// Heads and tails are given explicitly rather than derived from
    /// edge structure, so that a loop back to the first node does not
    /// hide the method entry.
    #[must_use]
    pub fn new(graph: DiGraph<N, ()>, heads: Vec<NodeIndex>, tails: Vec<NodeIndex>) -> Self {
        Self {
            graph,
            heads,
            tails,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    #[inline]
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    #[must_use]
    pub fn node(&self, id: NodeIndex) -> &N {
        &self.graph[id]
    }

    #[inline]
    pub fn predecessors(&self, id: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .neighbors_directed(id, petgraph::Direction::Incoming)
    }

    #[inline]
    pub fn successors(&self, id: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .neighbors_directed(id, petgraph::Direction::Outgoing)
    }

    #[must_use]
    pub fn heads(&self) -> &[NodeIndex] {
        &self.heads
    }

    #[must_use]
    pub fn tails(&self) -> &[NodeIndex] {
        &self.tails
    }

    #[must_use]
    pub fn graph(&self) -> &DiGraph<N, ()> {
        &self.graph
    }

    /// Computes the work-list priority of every node for the given
    /// analysis direction.
    ///
    /// Priorities follow reverse postorder: forward analyses number
    /// from the heads over forward edges, backward analyses from the
    /// tails over reversed edges. Lower numbers are processed first.
    /// Nodes unreachable from the boundary in the analysis direction
    /// are numbered after all reachable ones.
    pub(crate) fn priorities(&self, direction: Direction) -> Vec<u32> {
        let mut postorder: Vec<NodeIndex> = Vec::with_capacity(self.graph.node_count());
        match direction {
            Direction::Forward => {
                let mut dfs = DfsPostOrder::empty(&self.graph);
                for &head in &self.heads {
                    dfs.move_to(head);
                    while let Some(id) = dfs.next(&self.graph) {
                        postorder.push(id);
                    }
                }
            }
            Direction::Backward => {
                let reversed = Reversed(&self.graph);
                let mut dfs = DfsPostOrder::empty(reversed);
                for &tail in &self.tails {
                    dfs.move_to(tail);
                    while let Some(id) = dfs.next(reversed) {
                        postorder.push(id);
                    }
                }
            }
        }

        let reached = postorder.len() as u32;
        let mut priorities = vec![u32::MAX; self.graph.node_bound()];
        // The postorder list read back-to-front is the reverse postorder.
        for (i, id) in postorder.iter().enumerate() {
            priorities[id.index()] = reached - 1 - i as u32;
        }
        let mut next = reached;
        for priority in &mut priorities {
            if *priority == u32::MAX {
                *priority = next;
                next += 1;
            }
        }
        priorities
    }
}

impl<N: fmt::Debug> ControlFlowGraph<N> {
    /// Renders the graph in graphviz dot format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut res = String::new();
        res.push_str("digraph {\n");
        for id in self.graph.node_indices() {
            let shape = if self.heads.contains(&id) || self.tails.contains(&id) {
                "box"
            } else {
                "ellipse"
            };
            let _ = writeln!(
                res,
                "  n{} [shape={},label=\"{:?}\"];",
                id.index(),
                shape,
                self.graph[id]
            );
        }
        for edge in self.graph.edge_indices() {
            if let Some((src, dst)) = self.graph.edge_endpoints(edge) {
                let _ = writeln!(res, "  n{} -> n{};", src.index(), dst.index());
            }
        }
        res.push('}');
        res
    }
}
