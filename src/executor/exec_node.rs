use std::collections::BTreeSet;
use std::sync::Arc;

use enum_dispatch::enum_dispatch;
use log::{error, trace};

use crate::common::errors::ExecutorError;
use crate::common::ParamId;
use crate::core::RowSetBitmap;

use super::{
    BitmapAndState, BitmapOrState, ChangedParamSet, ExecContext, ExecFlags, IndexScanState, Instrumentation, PlanNode,
    SimilarityScanState,
};

/// Bookkeeping every execution node carries.
#[derive(Debug, Default)]
pub struct NodeState {
    chg_param: Option<ChangedParamSet>,
    all_params: BTreeSet<ParamId>,
    instrument: Option<Instrumentation>,
}

impl NodeState {
    pub fn new(all_params: BTreeSet<ParamId>, ctx: &ExecContext) -> Self {
        NodeState {
            chg_param: None,
            all_params,
            instrument: ctx.config().enable_instrumentation.then(Instrumentation::default),
        }
    }

    /// Params changed since the node last ran, `None` when nothing is pending.
    pub fn chg_param(&self) -> Option<&ChangedParamSet> {
        self.chg_param.as_ref()
    }

    pub fn all_params(&self) -> &BTreeSet<ParamId> {
        &self.all_params
    }

    /// Record the changed params this node depends on; the rest are ignored.
    pub fn update_changed_param_set(&mut self, new_chg: &ChangedParamSet) {
        if let Some(relevant) = new_chg.restricted_to(&self.all_params) {
            match self.chg_param.as_mut() {
                Some(pending) => pending.merge(relevant),
                None => self.chg_param = Some(relevant),
            }
        }
    }

    pub fn instrument(&self) -> Option<&Instrumentation> {
        self.instrument.as_ref()
    }

    pub(super) fn start_instrument(&mut self) {
        if let Some(instrument) = self.instrument.as_mut() {
            instrument.start_node();
        }
    }

    pub(super) fn stop_instrument(&mut self, ntuples: u64) {
        if let Some(instrument) = self.instrument.as_mut() {
            instrument.stop_node(ntuples);
        }
    }

    pub(super) fn clear_chg_param(&mut self) {
        self.chg_param = None;
    }
}

/// Counters kept by leaf scan nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub scans: u64,
    pub rescans: u64,
    pub ends: u64,
}

/// Capabilities of a node that produces a row bitmap.
#[enum_dispatch]
pub trait BitmapExec {
    /// Produce the node's bitmap. Ownership of the bitmap moves to the caller.
    fn multi_exec(&mut self) -> Result<RowSetBitmap, ExecutorError>;

    /// Reset the node so the next `multi_exec` starts over.
    fn rescan(&mut self) -> Result<(), ExecutorError>;

    /// Shut the node down and release what it holds.
    fn end(&mut self);

    fn node_state(&self) -> &NodeState;

    fn node_state_mut(&mut self) -> &mut NodeState;
}

#[enum_dispatch(BitmapExec)]
#[derive(Debug)]
pub enum ExecNode {
    IndexScan(IndexScanState),
    SimilarityScan(SimilarityScanState),
    BitmapAnd(BitmapAndState),
    BitmapOr(BitmapOrState),
}

/// Generic init entry point: build the execution node for `plan`.
pub fn exec_init_node(plan: &PlanNode, ctx: &Arc<ExecContext>, eflags: ExecFlags) -> Result<ExecNode, ExecutorError> {
    let node = match plan {
        PlanNode::IndexScan(plan) => IndexScanState::init(plan, ctx, eflags)?.into(),
        PlanNode::SimilarityScan(plan) => SimilarityScanState::init(plan, ctx, eflags)?.into(),
        PlanNode::BitmapAnd(plan) => BitmapAndState::init(plan, ctx, eflags)?.into(),
        PlanNode::BitmapOr(plan) => BitmapOrState::init(plan, ctx, eflags)?.into(),
    };
    Ok(node)
}

impl ExecNode {
    /// Run the node, first rescanning it if parameters it depends on changed.
    pub fn multi_exec_proc_node(&mut self) -> Result<RowSetBitmap, ExecutorError> {
        if self.node_state().chg_param().is_some() {
            self.exec_rescan()?;
        }
        self.multi_exec()
    }

    pub fn exec_rescan(&mut self) -> Result<(), ExecutorError> {
        self.rescan()?;
        self.node_state_mut().clear_chg_param();
        Ok(())
    }

    pub fn update_changed_param_set(&mut self, new_chg: &ChangedParamSet) {
        self.node_state_mut().update_changed_param_set(new_chg);
    }

    pub fn exec_end_node(&mut self) {
        self.end();
    }

    /// The node as a similarity scan over a vector access method, if it is one.
    pub fn vector_scan_mut(&mut self) -> Option<&mut SimilarityScanState> {
        match self {
            ExecNode::SimilarityScan(scan) if scan.access_method().is_vector() => Some(scan),
            _ => None,
        }
    }

    pub fn is_vector_scan(&self) -> bool {
        matches!(self, ExecNode::SimilarityScan(scan) if scan.access_method().is_vector())
    }

    /// Name of the scanned index for leaf nodes.
    pub fn index_name(&self) -> Option<&str> {
        match self {
            ExecNode::IndexScan(scan) => Some(scan.index_name()),
            ExecNode::SimilarityScan(scan) => Some(scan.index_name()),
            _ => None,
        }
    }

    pub fn scan_stats(&self) -> Option<ScanStats> {
        match self {
            ExecNode::IndexScan(scan) => Some(scan.stats()),
            ExecNode::SimilarityScan(scan) => Some(scan.stats()),
            _ => None,
        }
    }
}

/// Bitmap nodes only ever run forward and never restore a position.
pub(super) fn check_bitmap_exec_flags(node: &str, eflags: ExecFlags) -> Result<(), ExecutorError> {
    if eflags.intersects(ExecFlags::BACKWARD | ExecFlags::MARK) {
        error!("[init] {} node can't support flags {:?}", node, eflags);
        return Err(ExecutorError::UnsupportedExecutionMode(eflags));
    }
    Ok(())
}

/// Init every subplan into a fixed-size slot array. On failure the subplans already
/// initialized are ended before the error is returned.
pub(super) fn init_subplans(
    plans: &[PlanNode],
    ctx: &Arc<ExecContext>,
    eflags: ExecFlags,
) -> Result<Vec<Option<ExecNode>>, ExecutorError> {
    let mut subplans: Vec<Option<ExecNode>> = std::iter::repeat_with(|| None).take(plans.len()).collect();
    fill_subplans(plans, ctx, eflags, &mut subplans)?;
    Ok(subplans)
}

fn fill_subplans(
    plans: &[PlanNode],
    ctx: &Arc<ExecContext>,
    eflags: ExecFlags,
    subplans: &mut [Option<ExecNode>],
) -> Result<(), ExecutorError> {
    for (i, plan) in plans.iter().enumerate() {
        match exec_init_node(plan, ctx, eflags) {
            Ok(node) => subplans[i] = Some(node),
            Err(e) => {
                error!("[init_subplans] subplan {} of {} failed: {}", i, plans.len(), e);
                end_subplans(subplans);
                return Err(e);
            }
        }
    }
    Ok(())
}

pub(super) fn end_subplans(subplans: &mut [Option<ExecNode>]) {
    for subnode in subplans.iter_mut().flatten() {
        subnode.exec_end_node();
    }
}

/// Forward pending parameter changes to subplans. The engine doesn't know about them,
/// so the parent does the signaling itself.
pub(super) fn rescan_subplans(
    chg_param: Option<&ChangedParamSet>,
    subplans: &mut [Option<ExecNode>],
) -> Result<(), ExecutorError> {
    for subnode in subplans.iter_mut().flatten() {
        if let Some(changed) = chg_param {
            subnode.update_changed_param_set(changed);
        }
        // A subnode with pending changes rescans itself on its next execution.
        if subnode.node_state().chg_param().is_none() {
            subnode.exec_rescan()?;
        } else {
            trace!("[rescan_subplans] deferring rescan of {:?}", subnode.index_name());
        }
    }
    Ok(())
}
