//! Forward-flow half of the inter-procedural driver.

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
    /// Processes one CFG node of a forward analysis: merges the OUT
    /// values of the predecessors, applies the flow function, and
    /// schedules the successors if the OUT value changed.
    pub(super) fn process_node_forward(
        &mut self,
        current: ContextId,
        node_id: NodeIndex,
    ) -> AnalysisResult<()> {
        let cfg = Rc::clone(
            self.arena[current]
                .cfg()
                .expect("scheduled context has a control-flow graph"),
        );

        // Merge incoming edges; entry nodes keep the boundary value
        // placed at context creation.
        let predecessors: Vec<NodeIndex> = cfg.predecessors(node_id).collect();
        if !predecessors.is_empty() {
            let mut in_value = self.client.top_value();
            for predecessor in predecessors {
                let predecessor_out = self.arena[current]
                    .value_after(predecessor)
                    .expect("per-node storage present");
                in_value = self.client.meet(&in_value, predecessor_out);
            }
            self.arena[current].set_value_before(node_id, in_value);
        }

        let prev_out = self.arena[current]
            .value_after(node_id)
            .expect("per-node storage present")
            .clone();
        let in_value = self.arena[current]
            .value_before(node_id)
            .expect("per-node storage present")
            .clone();
        let node = cfg.node(node_id);

        if self.verbose {
            log::trace!("X{current} IN({node:?}) = {in_value:?}");
        }

        let out_value = if self.program.is_call(node) {
            let mut out_value = self.client.top_value();
            let caller_method = self.arena[current].method().clone();
            let call_site = CallSite::new(current, node_id);
            match self.program.resolve_targets(&caller_method, node) {
                Some(targets) => {
                    for target in targets {
                        let entry_value = self.client.call_entry_flow(
                            &self.arena[current],
                            &target,
                            node,
                            &in_value,
                        );
                        let callee = self.get_or_create_context(&target, entry_value)?;
                        self.transitions
                            .add_transition(call_site, Some((target.clone(), callee)));
                        if self.arena[callee].is_analysed() {
                            let exit_value = self.arena[callee].exit_value().clone();
                            if self.verbose {
                                log::debug!("[HIT] X{current} -> X{callee} {target:?}");
                                log::trace!("EXIT(X{callee}) = {exit_value:?}");
                            }
                            let returned = self.client.call_exit_flow(
                                &self.arena[current],
                                &target,
                                node,
                                &exit_value,
                            );
                            out_value = self.client.meet(&out_value, &returned);
                        }
                        // An unanalysed callee contributes nothing on
                        // this pass; it wakes this call node once it
                        // stabilises.
                    }
                }
                None => {
                    // Unknown targets (e.g. a native call): remember
                    // the call-site as a default site.
                    self.transitions.add_transition(call_site, None);
                }
            }
            let local = self
                .client
                .call_local_flow(&self.arena[current], node, &in_value);
            self.client.meet(&out_value, &local)
        } else {
            self.client
                .normal_flow(&self.arena[current], node, &in_value)
        };

        // Merge with the previous OUT to force monotonicity (harmless
        // if the flow functions are monotone).
        let out_value = self.client.meet(&out_value, &prev_out);

        if self.verbose {
            log::trace!("X{current} OUT({node:?}) = {out_value:?}");
        }

        let changed = out_value != prev_out;
        self.arena[current].set_value_after(node_id, out_value);
        if changed {
            for successor in cfg.successors(node_id) {
                self.arena[current].enqueue_node(successor);
            }
        }
        // A tail node means at least one path to the end of the
        // method, so schedule the boundary marker.
        if cfg.tails().contains(&node_id) {
            self.arena[current].enqueue_boundary();
        }
        Ok(())
    }

    /// Processes the boundary marker of a forward analysis: the exit
    /// value becomes the meet of the OUT values of the tail nodes, the
    /// context is marked analysed and its callers are woken.
    pub(super) fn process_boundary_forward(&mut self, current: ContextId) {
        let cfg = Rc::clone(
            self.arena[current]
                .cfg()
                .expect("scheduled context has a control-flow graph"),
        );
        let mut exit_value = self.client.top_value();
        for &tail in cfg.tails() {
            let tail_out = self.arena[current]
                .value_after(tail)
                .expect("per-node storage present");
            exit_value = self.client.meet(&exit_value, tail_out);
        }
        if self.verbose {
            log::debug!("EXIT(X{current}) = {exit_value:?}");
        }
        self.arena[current].set_exit_value(exit_value);
        self.arena[current].mark_analysed();
        self.wake_callers(current);
        if self.free_results_on_the_fly {
            self.reclaim(current);
        }
    }
}
