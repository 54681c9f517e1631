//! Program representation contract consumed by the engine.

use crate::controlflow::ControlFlowGraph;
use crate::errors::AnalysisResult;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// A wrapper for the API of the underlying intermediate representation
/// over which inter-procedural analysis is performed.
///
/// The program representation specifies program entry points, builds
/// control flow graphs for methods, and resolves call targets. The
/// engine consumes it as an explicit value passed to its constructor;
/// there is no process-wide singleton.
pub trait ProgramRepresentation {
    /// Opaque method handle.
    type Method: Clone + Eq + Hash + fmt::Debug;

    /// Opaque CFG node handle (a program point).
    type Node: Clone + Eq + Hash + fmt::Debug;

    /// The program entry points. The client analysis must provide a
    /// boundary value for each of them.
    fn entry_points(&self) -> Vec<Self::Method>;

    /// The intra-procedural control flow graph of a method.
    ///
    /// The graph is shared across all value contexts of the method and
    /// is never mutated by the engine; implementations are expected to
    /// build it once and hand out the same `Rc` on every call.
    ///
    /// # Errors
    ///
    /// Fails if the method has no analysable body.
    fn control_flow_graph(&self, method: &Self::Method)
        -> AnalysisResult<Rc<ControlFlowGraph<Self::Node>>>;

    /// Whether the given node contains a method call.
    fn is_call(&self, node: &Self::Node) -> bool;

    /// The target methods of the call in the given node.
    ///
    /// Static and special invocations yield a singleton sequence;
    /// virtual calls may yield several targets. An empty sequence
    /// means the call has no analysable target and the engine applies
    /// only the local flow function. `None` means the targets are
    /// unknown altogether (for example a native call), in which case
    /// the engine additionally records the call-site as a default site
    /// in the transition table.
    fn resolve_targets(
        &self,
        caller_method: &Self::Method,
        call_node: &Self::Node,
    ) -> Option<Vec<Self::Method>>;

    /// Whether the given method lacks an analysable body. Resolved
    /// call targets that are phantom get a degenerate, immediately
    /// analysed context instead of a CFG-backed one.
    fn is_phantom(&self, method: &Self::Method) -> bool;
}
