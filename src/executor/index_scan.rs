use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, trace};

use crate::common::errors::ExecutorError;
use crate::core::{KeyIndex, RowSetBitmap, ScanOp};

use super::exec_node::check_bitmap_exec_flags;
use super::{BitmapExec, ExecContext, ExecFlags, IndexScanPlan, NodeState, ScanArgument, ScanStats};

/// Ordinary bitmap index scan over a key index.
#[derive(Debug)]
pub struct IndexScanState {
    state: NodeState,
    ctx: Arc<ExecContext>,
    index: Arc<KeyIndex>,
    op: ScanOp,
    arg: ScanArgument,
    stats: ScanStats,
}

impl IndexScanState {
    pub fn init(plan: &IndexScanPlan, ctx: &Arc<ExecContext>, eflags: ExecFlags) -> Result<Self, ExecutorError> {
        check_bitmap_exec_flags("IndexScan", eflags)?;
        let index = ctx.catalog().key_index(&plan.index_name)?;
        let mut all_params = BTreeSet::new();
        if let ScanArgument::Param(param_id) = plan.arg {
            all_params.insert(param_id);
        }
        Ok(IndexScanState {
            state: NodeState::new(all_params, ctx),
            ctx: Arc::clone(ctx),
            index,
            op: plan.op,
            arg: plan.arg,
            stats: ScanStats::default(),
        })
    }

    pub fn index_name(&self) -> &str {
        self.index.name()
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn scan_key(&self) -> Result<i64, ExecutorError> {
        match self.arg {
            ScanArgument::Const(value) => Ok(value),
            ScanArgument::Param(param_id) => self.ctx.param(param_id),
        }
    }
}

impl BitmapExec for IndexScanState {
    fn multi_exec(&mut self) -> Result<RowSetBitmap, ExecutorError> {
        self.state.start_instrument();
        let key = self.scan_key();
        let result = key.map(|key| self.index.scan(self.op, key, self.ctx.work_mem_bytes()));
        self.stats.scans += 1;
        self.state.stop_instrument(result.as_ref().map_or(0, RowSetBitmap::len));
        result
    }

    fn rescan(&mut self) -> Result<(), ExecutorError> {
        trace!("[rescan] index:{}", self.index.name());
        self.stats.rescans += 1;
        Ok(())
    }

    fn end(&mut self) {
        debug!("[end] index:{}, scans:{}", self.index.name(), self.stats.scans);
        self.stats.ends += 1;
    }

    fn node_state(&self) -> &NodeState {
        &self.state
    }

    fn node_state_mut(&mut self) -> &mut NodeState {
        &mut self.state
    }
}
