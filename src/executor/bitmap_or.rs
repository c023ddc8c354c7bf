use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, trace, warn};
use measure_time::trace_time;

use crate::common::errors::ExecutorError;
use crate::core::RowSetBitmap;

use super::exec_node::{check_bitmap_exec_flags, end_subplans, init_subplans, rescan_subplans};
use super::{BitmapExec, BitmapOrPlan, ExecContext, ExecFlags, ExecNode, Instrumentation, NodeState};

/// Union of the bitmaps produced by a list of subplans.
#[derive(Debug)]
pub struct BitmapOrState {
    state: NodeState,
    bitmap_plans: Vec<Option<ExecNode>>,
    ended: bool,
}

impl BitmapOrState {
    pub fn init(plan: &BitmapOrPlan, ctx: &Arc<ExecContext>, eflags: ExecFlags) -> Result<Self, ExecutorError> {
        check_bitmap_exec_flags("BitmapOr", eflags)?;

        let bitmap_plans = init_subplans(plan.bitmap_plans(), ctx, eflags)?;
        let all_params: BTreeSet<_> = plan.bitmap_plans().iter().flat_map(|subplan| subplan.referenced_params()).collect();
        debug!("[init] BitmapOr nplans:{}", bitmap_plans.len());

        Ok(BitmapOrState { state: NodeState::new(all_params, ctx), bitmap_plans, ended: false })
    }

    pub fn nplans(&self) -> usize {
        self.bitmap_plans.len()
    }

    pub fn children(&self) -> impl Iterator<Item = &ExecNode> {
        self.bitmap_plans.iter().flatten()
    }

    pub fn instrument(&self) -> Option<&Instrumentation> {
        self.state.instrument()
    }

    fn union_subplans(&mut self) -> Result<RowSetBitmap, ExecutorError> {
        if self.ended {
            return Err(ExecutorError::ContractViolation("BitmapOr executed after it was ended".to_string()));
        }

        let nplans = self.bitmap_plans.len();
        let mut result: Option<RowSetBitmap> = None;
        for (i, slot) in self.bitmap_plans.iter_mut().enumerate() {
            let subnode = slot
                .as_mut()
                .ok_or_else(|| ExecutorError::ContractViolation(format!("BitmapOr subplan {} is not initialized", i)))?;
            let subresult = subnode.multi_exec_proc_node()?;
            let merged = match result.take() {
                Some(acc) => acc.union(subresult),
                None => subresult,
            };
            trace!("[union_subplans] after subplan {} of {}: {} rows", i + 1, nplans, merged.len());
            result = Some(merged);
        }

        let result = result.ok_or_else(|| ExecutorError::ContractViolation("BitmapOr doesn't support zero inputs".to_string()))?;
        if result.exceeds_budget() {
            warn!("[union_subplans] result of {} rows exceeds work_mem budget {}", result.len(), result.memory_budget());
        }
        Ok(result)
    }
}

impl BitmapExec for BitmapOrState {
    fn multi_exec(&mut self) -> Result<RowSetBitmap, ExecutorError> {
        trace_time!("[BitmapOr] multi_exec, nplans:{}", self.bitmap_plans.len());
        self.state.start_instrument();
        let result = self.union_subplans();
        self.state.stop_instrument(result.as_ref().map_or(0, RowSetBitmap::len));
        result
    }

    fn rescan(&mut self) -> Result<(), ExecutorError> {
        rescan_subplans(self.state.chg_param(), &mut self.bitmap_plans)?;
        // Forwarded to the subplans, nothing left pending here.
        self.state.clear_chg_param();
        Ok(())
    }

    fn end(&mut self) {
        if std::mem::replace(&mut self.ended, true) {
            return;
        }
        debug!("[end] BitmapOr nplans:{}", self.bitmap_plans.len());
        end_subplans(&mut self.bitmap_plans);
    }

    fn node_state(&self) -> &NodeState {
        &self.state
    }

    fn node_state_mut(&mut self) -> &mut NodeState {
        &mut self.state
    }
}

impl Drop for BitmapOrState {
    fn drop(&mut self) {
        self.end();
    }
}
