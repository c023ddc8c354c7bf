use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::common::errors::ExecutorError;
use crate::common::AccessMethodId;
use crate::core::{RowSetBitmap, SimilarityClause, VectorIndex};

use super::exec_node::check_bitmap_exec_flags;
use super::{BitmapExec, ExecContext, ExecFlags, NodeState, ScanStats, SimilarityScanPlan};

/// Nearest-neighbor bitmap scan.
///
/// A parent may hand over a clause and a sink bitmap before execution with
/// [`SimilarityScanState::configure`]. Without one the scan is authoritative: every match,
/// written into a fresh bitmap.
#[derive(Debug)]
pub struct SimilarityScanState {
    state: NodeState,
    ctx: Arc<ExecContext>,
    index: Arc<VectorIndex>,
    query: Vec<f32>,
    pending: Option<(SimilarityClause, RowSetBitmap)>,
    last_clause: Option<SimilarityClause>,
    stats: ScanStats,
}

impl SimilarityScanState {
    pub fn init(plan: &SimilarityScanPlan, ctx: &Arc<ExecContext>, eflags: ExecFlags) -> Result<Self, ExecutorError> {
        check_bitmap_exec_flags("SimilarityScan", eflags)?;
        let index = ctx.catalog().vector_index(&plan.index_name)?;
        if plan.query.len() != index.dim() {
            return Err(ExecutorError::DimensionMismatch { expected: index.dim(), actual: plan.query.len() });
        }
        Ok(SimilarityScanState {
            state: NodeState::new(BTreeSet::new(), ctx),
            ctx: Arc::clone(ctx),
            index,
            query: plan.query.clone(),
            pending: None,
            last_clause: None,
            stats: ScanStats::default(),
        })
    }

    pub fn access_method(&self) -> AccessMethodId {
        self.index.access_method()
    }

    pub fn index_name(&self) -> &str {
        self.index.name()
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Clause used by the most recent execution.
    pub fn last_clause(&self) -> Option<&SimilarityClause> {
        self.last_clause.as_ref()
    }

    /// Set the clause and output sink for the next execution only.
    pub fn configure(&mut self, clause: SimilarityClause, sink: RowSetBitmap) {
        if self.pending.is_some() {
            warn!("[configure] index:{}, replacing a clause that never ran", self.index.name());
        }
        trace!(
            "[configure] index:{}, check_row_id:{}, candidate_limit:{}, sink rows:{}",
            self.index.name(),
            clause.check_row_id,
            clause.candidate_limit,
            sink.len()
        );
        self.pending = Some((clause, sink));
    }
}

impl BitmapExec for SimilarityScanState {
    fn multi_exec(&mut self) -> Result<RowSetBitmap, ExecutorError> {
        self.state.start_instrument();
        let (clause, sink) = self
            .pending
            .take()
            .unwrap_or_else(|| (SimilarityClause::default(), RowSetBitmap::with_memory_budget(self.ctx.work_mem_bytes())));
        let result = self.index.search(&self.query, &clause, sink);
        self.stats.scans += 1;
        self.last_clause = Some(clause);
        self.state.stop_instrument(result.as_ref().map_or(0, RowSetBitmap::len));
        result
    }

    fn rescan(&mut self) -> Result<(), ExecutorError> {
        trace!("[rescan] index:{}", self.index.name());
        self.pending = None;
        self.stats.rescans += 1;
        Ok(())
    }

    fn end(&mut self) {
        debug!("[end] index:{}, scans:{}", self.index.name(), self.stats.scans);
        self.pending = None;
        self.stats.ends += 1;
    }

    fn node_state(&self) -> &NodeState {
        &self.state
    }

    fn node_state_mut(&mut self) -> &mut NodeState {
        &mut self.state
    }
}
