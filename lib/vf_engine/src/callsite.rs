//! Context-sensitive call-site locations.

use crate::context::ContextId;
use crate::controlflow::NodeIndex;
use std::fmt;

/// A context-sensitive location of a method invocation.
///
/// A call-site is uniquely identified by the calling context and the
/// CFG node containing the call statement. The derived ordering sorts
/// by the caller context first, so iterating a sorted collection of
/// call-sites visits newer calling contexts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSite {
    calling_context: ContextId,
    call_node: NodeIndex,
}

impl CallSite {
    #[must_use]
    pub fn new(calling_context: ContextId, call_node: NodeIndex) -> Self {
        Self {
            calling_context,
            call_node,
        }
    }

    /// The value context at this call-site.
    #[must_use]
    pub fn calling_context(&self) -> ContextId {
        self.calling_context
    }

    /// The CFG node at which the call is made.
    #[must_use]
    pub fn call_node(&self) -> NodeIndex {
        self.call_node
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "X{}@{}", self.calling_context, self.call_node.index())
    }
}
