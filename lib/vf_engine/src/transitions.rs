//! A record of transitions between contexts at call-sites.

use crate::callsite::CallSite;
use crate::context::ContextId;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// The context transition table records a bidirectional one-to-many
/// mapping of call-sites to called contexts, parameterised by the
/// called method.
///
/// A call-site whose targets cannot be resolved (for example a call
/// into native code) is recorded as a "default site" with no callee
/// context. The table stores context ids only; context storage is
/// owned by the engine's arena, so reclaiming a context never leaves a
/// dangling transition.
#[derive(Debug)]
pub struct ContextTransitionTable<M> {
    /// Call-site to called context, parameterised by the called method.
    transitions: HashMap<CallSite, HashMap<M, ContextId>>,
    /// Called context to the set of call-sites that transition to it.
    callers: HashMap<ContextId, HashSet<CallSite>>,
    /// Calling context to the call-sites within its method body.
    call_sites_of_context: HashMap<ContextId, HashSet<CallSite>>,
    /// Call-sites from which transitions are unknown.
    default_call_sites: HashSet<CallSite>,
}

impl<M> Default for ContextTransitionTable<M> {
    fn default() -> Self {
        Self {
            transitions: HashMap::new(),
            callers: HashMap::new(),
            call_sites_of_context: HashMap::new(),
            default_call_sites: HashSet::new(),
        }
    }
}

impl<M: Clone + Eq + Hash> ContextTransitionTable<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transition to the table.
    ///
    /// A `None` target marks the call-site as a default site with
    /// unknown targets and deletes any previously recorded edges out
    /// of it. A `Some` target replaces the previous callee context of
    /// the same called method, keeping the caller index consistent in
    /// both directions.
    pub fn add_transition(&mut self, call_site: CallSite, target: Option<(M, ContextId)>) {
        match target {
            Some((method, target_context)) => {
                if let Some(old_target) = self
                    .transitions
                    .get(&call_site)
                    .and_then(|targets| targets.get(&method))
                    .copied()
                {
                    if let Some(sites) = self.callers.get_mut(&old_target) {
                        sites.remove(&call_site);
                    }
                }
                self.transitions
                    .entry(call_site)
                    .or_default()
                    .insert(method, target_context);
                self.callers
                    .entry(target_context)
                    .or_default()
                    .insert(call_site);
            }
            None => {
                if let Some(targets) = self.transitions.remove(&call_site) {
                    for (_, old_target) in targets {
                        if let Some(sites) = self.callers.get_mut(&old_target) {
                            sites.remove(&call_site);
                        }
                    }
                }
                self.default_call_sites.insert(call_site);
            }
        }
        self.call_sites_of_context
            .entry(call_site.calling_context())
            .or_default()
            .insert(call_site);
    }

    /// The call-sites which transition to the given target context.
    #[must_use]
    pub fn callers(&self, target: ContextId) -> Option<&HashSet<CallSite>> {
        self.callers.get(&target)
    }

    /// The targets of a call-site, as a map of called methods to
    /// called contexts.
    #[must_use]
    pub fn targets(&self, call_site: CallSite) -> Option<&HashMap<M, ContextId>> {
        self.transitions.get(&call_site)
    }

    /// All recorded transitions.
    #[must_use]
    pub fn transitions(&self) -> &HashMap<CallSite, HashMap<M, ContextId>> {
        &self.transitions
    }

    /// The call-sites found within the body of the given calling
    /// context.
    #[must_use]
    pub fn call_sites_of(&self, context: ContextId) -> Option<&HashSet<CallSite>> {
        self.call_sites_of_context.get(&context)
    }

    /// The call-sites marked as having unknown targets.
    #[must_use]
    pub fn default_call_sites(&self) -> &HashSet<CallSite> {
        &self.default_call_sites
    }

    /// Computes the set of contexts transitively reachable from
    /// `source` by traversing recorded transitions.
    ///
    /// The source context itself is a member only if a cycle of
    /// transitions leads back to it. Contexts for which `skip` returns
    /// true (and everything reachable only through them) are left out;
    /// the engine uses this to ignore already-reclaimed contexts.
    pub fn reachable_contexts(
        &self,
        source: ContextId,
        skip: impl Fn(ContextId) -> bool,
    ) -> HashSet<ContextId> {
        let mut reachable = HashSet::new();
        let mut stack = vec![source];
        while let Some(current) = stack.pop() {
            let Some(call_sites) = self.call_sites_of_context.get(&current) else {
                continue;
            };
            for call_site in call_sites {
                if self.default_call_sites.contains(call_site) {
                    continue;
                }
                let Some(targets) = self.transitions.get(call_site) else {
                    continue;
                };
                for &target in targets.values() {
                    if !reachable.contains(&target) && !skip(target) {
                        reachable.insert(target);
                        stack.push(target);
                    }
                }
            }
        }
        reachable
    }
}
