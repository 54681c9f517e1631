//! Backward-flow half of the inter-procedural driver.

use crate::callsite::CallSite;
use crate::context::ContextId;
use crate::controlflow::NodeIndex;
use crate::errors::AnalysisResult;
use crate::interproc::{DataFlowAnalysis, InterProceduralAnalysis};
use crate::program::ProgramRepresentation;
use std::rc::Rc;

impl<R, C> InterProceduralAnalysis<R, C>
where
    R: ProgramRepresentation,
    C: DataFlowAnalysis<R>,
{
    /// Processes one CFG node of a backward analysis: merges the IN
    /// values of the successors, applies the flow function against the
    /// flow of control, and schedules the predecessors if the IN value
    /// changed.
    pub(super) fn process_node_backward(
        &mut self,
        current: ContextId,
        node_id: NodeIndex,
    ) -> AnalysisResult<()> {
        let cfg = Rc::clone(
            self.arena[current]
                .cfg()
                .expect("scheduled context has a control-flow graph"),
        );

        // Merge outgoing edges; exit nodes keep the boundary value
        // placed at context creation.
        let successors: Vec<NodeIndex> = cfg.successors(node_id).collect();
        if !successors.is_empty() {
            let mut out_value = self.client.top_value();
            for successor in successors {
                let successor_in = self.arena[current]
                    .value_before(successor)
                    .expect("per-node storage present");
                out_value = self.client.meet(&out_value, successor_in);
            }
            self.arena[current].set_value_after(node_id, out_value);
        }

        let prev_in = self.arena[current]
            .value_before(node_id)
            .expect("per-node storage present")
            .clone();
        let out_value = self.arena[current]
            .value_after(node_id)
            .expect("per-node storage present")
            .clone();
        let node = cfg.node(node_id);

        if self.verbose {
            log::trace!("X{current} OUT({node:?}) = {out_value:?}");
        }

        let in_value = if self.program.is_call(node) {
            let mut in_value = self.client.top_value();
            let caller_method = self.arena[current].method().clone();
            let call_site = CallSite::new(current, node_id);
            match self.program.resolve_targets(&caller_method, node) {
                Some(targets) => {
                    for target in targets {
                        // Backward analyses key the callee context by
                        // its exit value.
                        let exit_value = self.client.call_exit_flow(
                            &self.arena[current],
                            &target,
                            node,
                            &out_value,
                        );
                        let callee = self.get_or_create_context(&target, exit_value)?;
                        self.transitions
                            .add_transition(call_site, Some((target.clone(), callee)));
                        if self.arena[callee].is_analysed() {
                            let entry_value = self.arena[callee].entry_value().clone();
                            if self.verbose {
                                log::debug!("[HIT] X{current} -> X{callee} {target:?}");
                                log::trace!("ENTRY(X{callee}) = {entry_value:?}");
                            }
                            let called = self.client.call_entry_flow(
                                &self.arena[current],
                                &target,
                                node,
                                &entry_value,
                            );
                            in_value = self.client.meet(&in_value, &called);
                        }
                    }
                }
                None => {
                    self.transitions.add_transition(call_site, None);
                }
            }
            let local = self
                .client
                .call_local_flow(&self.arena[current], node, &out_value);
            self.client.meet(&in_value, &local)
        } else {
            self.client
                .normal_flow(&self.arena[current], node, &out_value)
        };

        // Merge with the previous IN to force monotonicity.
        let in_value = self.client.meet(&in_value, &prev_in);

        if self.verbose {
            log::trace!("X{current} IN({node:?}) = {in_value:?}");
        }

        let changed = in_value != prev_in;
        self.arena[current].set_value_before(node_id, in_value);
        if changed {
            for predecessor in cfg.predecessors(node_id) {
                self.arena[current].enqueue_node(predecessor);
            }
        }
        // A head node means at least one path to the start of the
        // method, so schedule the boundary marker.
        if cfg.heads().contains(&node_id) {
            self.arena[current].enqueue_boundary();
        }
        Ok(())
    }

    /// Processes the boundary marker of a backward analysis: the entry
    /// value becomes the meet of the IN values of the head nodes, the
    /// context is marked analysed and its callers are woken.
    pub(super) fn process_boundary_backward(&mut self, current: ContextId) {
        let cfg = Rc::clone(
            self.arena[current]
                .cfg()
                .expect("scheduled context has a control-flow graph"),
        );
        let mut entry_value = self.client.top_value();
        for &head in cfg.heads() {
            let head_in = self.arena[current]
                .value_before(head)
                .expect("per-node storage present");
            entry_value = self.client.meet(&entry_value, head_in);
        }
        if self.verbose {
            log::debug!("ENTRY(X{current}) = {entry_value:?}");
        }
        self.arena[current].set_entry_value(entry_value);
        self.arena[current].mark_analysed();
        self.wake_callers(current);
        if self.free_results_on_the_fly {
            self.reclaim(current);
        }
    }
}
