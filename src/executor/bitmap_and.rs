use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, trace, warn};
use measure_time::trace_time;

use crate::common::errors::ExecutorError;
use crate::core::{RowSetBitmap, SimilarityClause};

use super::exec_node::{check_bitmap_exec_flags, end_subplans, init_subplans, rescan_subplans};
use super::{BitmapAndPlan, BitmapExec, ExecContext, ExecFlags, ExecNode, Instrumentation, NodeState, SimilarityClauseTemplate};

/// Intersection of the bitmaps produced by a list of subplans.
///
/// Subplans are evaluated in order and the running intersection is dropped into early once it
/// becomes empty. A similarity scan over a vector index always runs last: it receives the
/// running intersection as its sink and is told whether that sink already holds candidates.
#[derive(Debug)]
pub struct BitmapAndState {
    state: NodeState,
    ctx: Arc<ExecContext>,
    bitmap_plans: Vec<Option<ExecNode>>,
    similarity_clause: Option<SimilarityClauseTemplate>,
    limit: i64,
    ended: bool,
}

impl BitmapAndState {
    pub fn init(plan: &BitmapAndPlan, ctx: &Arc<ExecContext>, eflags: ExecFlags) -> Result<Self, ExecutorError> {
        check_bitmap_exec_flags("BitmapAnd", eflags)?;

        let bitmap_plans = init_subplans(plan.bitmap_plans(), ctx, eflags)?;
        let all_params: BTreeSet<_> = plan.bitmap_plans().iter().flat_map(|subplan| subplan.referenced_params()).collect();
        debug!("[init] BitmapAnd nplans:{}, limit:{}", bitmap_plans.len(), plan.limit());

        Ok(BitmapAndState {
            state: NodeState::new(all_params, ctx),
            ctx: Arc::clone(ctx),
            bitmap_plans,
            similarity_clause: plan.similarity_clause().copied(),
            limit: plan.limit(),
            ended: false,
        })
    }

    pub fn nplans(&self) -> usize {
        self.bitmap_plans.len()
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Subplans in their current evaluation order.
    pub fn children(&self) -> impl Iterator<Item = &ExecNode> {
        self.bitmap_plans.iter().flatten()
    }

    pub fn instrument(&self) -> Option<&Instrumentation> {
        self.state.instrument()
    }

    /// Move the first vector similarity scan behind every other subplan, keeping the order of
    /// the rest. Returns the position it was moved from.
    fn move_vector_scan_last(&mut self) -> Option<usize> {
        let last = self.bitmap_plans.len().checked_sub(1)?;
        let position =
            self.bitmap_plans.iter().position(|slot| slot.as_ref().is_some_and(ExecNode::is_vector_scan))?;
        if position == last {
            return None;
        }
        self.bitmap_plans[position..].rotate_left(1);
        debug!("[move_vector_scan_last] similarity subplan moved from {} to {}", position, last);
        Some(position)
    }

    fn intersect_subplans(&mut self) -> Result<RowSetBitmap, ExecutorError> {
        if self.ended {
            return Err(ExecutorError::ContractViolation("BitmapAnd executed after it was ended".to_string()));
        }
        self.move_vector_scan_last();

        let nplans = self.bitmap_plans.len();
        let work_mem = self.ctx.work_mem_bytes();
        let mut result: Option<RowSetBitmap> = None;

        for (i, slot) in self.bitmap_plans.iter_mut().enumerate() {
            let subnode = slot
                .as_mut()
                .ok_or_else(|| ExecutorError::ContractViolation(format!("BitmapAnd subplan {} is not initialized", i)))?;

            // The similarity scan takes the running result as its sink and returns the filled
            // sink, which replaces the result without another intersection.
            let mut skip_intersect = false;
            if let Some(scan) = subnode.vector_scan_mut() {
                let sink = result.take().unwrap_or_else(|| RowSetBitmap::with_memory_budget(work_mem));
                scan.configure(similarity_clause_for(i, self.limit, self.similarity_clause.as_ref()), sink);
                skip_intersect = true;
            }

            let subresult = subnode.multi_exec_proc_node()?;
            let merged = match result.take() {
                Some(acc) if !skip_intersect => acc.intersect(subresult),
                _ => subresult,
            };
            trace!("[intersect_subplans] after subplan {} of {}: {} rows", i + 1, nplans, merged.len());

            // Intersecting with anything else can't bring rows back.
            let empty = merged.is_empty();
            result = Some(merged);
            if empty {
                debug!("[intersect_subplans] empty after subplan {} of {}, skipping the rest", i + 1, nplans);
                break;
            }
        }

        let result = result.ok_or_else(|| ExecutorError::ContractViolation("BitmapAnd doesn't support zero inputs".to_string()))?;
        if result.exceeds_budget() {
            warn!("[intersect_subplans] result of {} rows exceeds work_mem budget {}", result.len(), result.memory_budget());
        }
        Ok(result)
    }
}

/// A similarity scan at position 0 is the only predicate, so its answer is final. Anywhere
/// else it filters the candidates already collected, bounded by the plan limit.
fn similarity_clause_for(position: usize, limit: i64, template: Option<&SimilarityClauseTemplate>) -> SimilarityClause {
    let max_distance = template.and_then(|template| template.max_distance);
    if position == 0 {
        SimilarityClause::authoritative(max_distance)
    } else {
        SimilarityClause::filtering(limit, max_distance)
    }
}

impl BitmapExec for BitmapAndState {
    fn multi_exec(&mut self) -> Result<RowSetBitmap, ExecutorError> {
        trace_time!("[BitmapAnd] multi_exec, nplans:{}", self.bitmap_plans.len());
        self.state.start_instrument();
        let result = self.intersect_subplans();
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
        debug!("[end] BitmapAnd nplans:{}", self.bitmap_plans.len());
        end_subplans(&mut self.bitmap_plans);
    }

    fn node_state(&self) -> &NodeState {
        &self.state
    }

    fn node_state_mut(&mut self) -> &mut NodeState {
        &mut self.state
    }
}

impl Drop for BitmapAndState {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::Rng;

    use super::*;
    use crate::common::RowId;
    use crate::executor::test_fixtures::*;
    use crate::executor::{BitmapOrPlan, ChangedParamSet, PlanNode, ScanStats};
    use crate::row_set;

    fn init_and(plans: Vec<PlanNode>, limit: i64, ctx: &Arc<ExecContext>) -> BitmapAndState {
        let plan = BitmapAndPlan::try_new(plans, limit).unwrap();
        BitmapAndState::init(&plan, ctx, ExecFlags::empty()).unwrap()
    }

    fn child_names(node: &BitmapAndState) -> Vec<&str> {
        node.children().filter_map(ExecNode::index_name).collect()
    }

    fn child_stats(node: &BitmapAndState, index_name: &str) -> ScanStats {
        node.children().find(|child| child.index_name() == Some(index_name)).and_then(ExecNode::scan_stats).unwrap()
    }

    fn similarity_child(node: &BitmapAndState) -> &crate::executor::SimilarityScanState {
        node.children()
            .find_map(|child| match child {
                ExecNode::SimilarityScan(scan) => Some(scan),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_intersection_of_three_children() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3, 4]), ("b", &[2, 3, 4, 5]), ("c", &[3, 4, 5, 6])], None), false);
        let mut node = init_and(vec![key_scan("a"), key_scan("b"), key_scan("c")], 10, &ctx);
        assert_eq!(node.nplans(), 3);
        assert_eq!(node.multi_exec().unwrap(), row_set![3, 4]);
        assert_eq!(child_names(&node), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_random_intersections() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let nplans = rng.gen_range(1..=5);
            let sets: Vec<Vec<RowId>> =
                (0..nplans).map(|_| (0..64).filter(|_| rng.gen_bool(0.7)).collect()).collect();
            let names: Vec<String> = (0..nplans).map(|i| format!("idx_{}", i)).collect();
            let key_indexes: Vec<(&str, &[RowId])> =
                names.iter().zip(sets.iter()).map(|(name, rows)| (name.as_str(), rows.as_slice())).collect();

            let expected: BTreeSet<RowId> = sets
                .iter()
                .map(|rows| rows.iter().copied().collect::<BTreeSet<_>>())
                .reduce(|acc, rows| acc.intersection(&rows).copied().collect())
                .unwrap();

            let ctx = context(catalog_of(&key_indexes, None), false);
            let mut node = init_and(names.iter().map(|name| key_scan(name)).collect(), 10, &ctx);
            let result: Vec<RowId> = node.multi_exec().unwrap().into();
            assert_eq!(result, expected.into_iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_stops_at_first_empty_result() {
        let ctx = context(catalog_of(&[("empty", &[]), ("b", &[1, 2]), ("c", &[2, 3])], None), false);
        // params 1 and 2 are never bound: running "b" or "c" would fail the execution
        let mut node = init_and(vec![key_scan("empty"), param_scan("b", 1), param_scan("c", 2)], 10, &ctx);

        let result = node.multi_exec().unwrap();
        assert!(result.is_empty());
        assert_eq!(child_stats(&node, "empty").scans, 1);
        assert_eq!(child_stats(&node, "b").scans, 0);
        assert_eq!(child_stats(&node, "c").scans, 0);
    }

    #[test]
    fn test_stops_when_intersection_becomes_empty() {
        let ctx = context(catalog_of(&[("a", &[1, 2]), ("b", &[3, 4]), ("c", &[1])], None), false);
        let mut node = init_and(vec![key_scan("a"), key_scan("b"), param_scan("c", 9)], 10, &ctx);
        assert!(node.multi_exec().unwrap().is_empty());
        assert_eq!(child_stats(&node, "b").scans, 1);
        assert_eq!(child_stats(&node, "c").scans, 0);
    }

    #[test]
    fn test_similarity_child_moves_last() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3, 4]), ("b", &[1, 2, 3]), ("c", &[1, 2, 3, 5])], Some(6)), false);
        let mut node = init_and(vec![similarity_scan(VECTOR_INDEX), key_scan("a"), key_scan("b"), key_scan("c")], 2, &ctx);
        assert_eq!(child_names(&node), vec![VECTOR_INDEX, "a", "b", "c"]);

        node.multi_exec().unwrap();
        assert_eq!(child_names(&node), vec!["a", "b", "c", VECTOR_INDEX]);

        // idempotent across executions
        node.multi_exec().unwrap();
        assert_eq!(child_names(&node), vec!["a", "b", "c", VECTOR_INDEX]);
    }

    #[test]
    fn test_similarity_child_in_the_middle_moves_last() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3]), ("b", &[2, 3])], Some(6)), false);
        let mut node = init_and(vec![key_scan("a"), similarity_scan(VECTOR_INDEX), key_scan("b")], 5, &ctx);
        assert_eq!(node.multi_exec().unwrap(), row_set![2, 3]);
        assert_eq!(child_names(&node), vec!["a", "b", VECTOR_INDEX]);
    }

    #[test]
    fn test_sole_similarity_child_is_authoritative() {
        let ctx = context(catalog_of(&[], Some(5)), false);
        let mut node = init_and(vec![similarity_scan(VECTOR_INDEX)], 2, &ctx);

        let result = node.multi_exec().unwrap();
        assert_eq!(result, row_set![1, 2, 3, 4, 5]);
        let clause = similarity_child(&node).last_clause().unwrap();
        assert!(!clause.check_row_id);
        assert_eq!(clause.candidate_limit, -1);
        assert_eq!(result.memory_budget(), 64 * 1024);
    }

    #[test]
    fn test_similarity_child_filters_other_predicates() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3])], Some(6)), false);
        let mut node = init_and(vec![similarity_scan(VECTOR_INDEX), key_scan("a")], 2, &ctx);

        let result = node.multi_exec().unwrap();
        assert_eq!(child_names(&node), vec!["a", VECTOR_INDEX]);
        let clause = similarity_child(&node).last_clause().unwrap();
        assert!(clause.check_row_id);
        assert_eq!(clause.candidate_limit, 2);

        // the two nearest rows among {1, 2, 3}
        assert_eq!(result, row_set![1, 2]);
        assert_eq!(result.clone().intersect(row_set![1, 2, 3]), result);
    }

    #[test]
    fn test_similarity_limit_above_candidates() {
        let ctx = context(catalog_of(&[("a", &[2, 4, 9])], Some(6)), false);
        let mut node = init_and(vec![key_scan("a"), similarity_scan(VECTOR_INDEX)], 100, &ctx);
        // row 9 has no vector
        assert_eq!(node.multi_exec().unwrap(), row_set![2, 4]);
        assert_eq!(similarity_child(&node).last_clause(), Some(&SimilarityClause::filtering(100, None)));
    }

    #[test]
    fn test_similarity_clause_template() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3, 4, 5])], Some(6)), false);
        let plan = BitmapAndPlan::try_new(vec![key_scan("a"), similarity_scan(VECTOR_INDEX)], 10)
            .unwrap()
            .with_similarity_clause(SimilarityClauseTemplate { max_distance: Some(3.0) });
        let mut node = BitmapAndState::init(&plan, &ctx, ExecFlags::empty()).unwrap();
        assert_eq!(node.multi_exec().unwrap(), row_set![1, 2, 3]);
        assert_eq!(similarity_child(&node).last_clause().unwrap().max_distance, Some(3.0));
    }

    #[test]
    fn test_early_exit_leaves_similarity_child_unconfigured() {
        let ctx = context(catalog_of(&[("empty", &[])], Some(6)), false);
        let mut node = init_and(vec![similarity_scan(VECTOR_INDEX), key_scan("empty")], 2, &ctx);
        assert!(node.multi_exec().unwrap().is_empty());
        assert_eq!(child_names(&node), vec!["empty", VECTOR_INDEX]);
        assert!(similarity_child(&node).last_clause().is_none());
        assert_eq!(child_stats(&node, VECTOR_INDEX).scans, 0);

        // children skipped by the early exit are still ended
        node.end();
        assert_eq!(child_stats(&node, "empty"), ScanStats { scans: 1, rescans: 0, ends: 1 });
        assert_eq!(child_stats(&node, VECTOR_INDEX), ScanStats { scans: 0, rescans: 0, ends: 1 });
    }

    #[test]
    fn test_end_after_early_exit_ends_skipped_children() {
        let ctx = context(catalog_of(&[("empty", &[]), ("b", &[1]), ("c", &[1])], None), false);
        let mut node = init_and(vec![key_scan("empty"), key_scan("b"), key_scan("c")], 10, &ctx);
        assert!(node.multi_exec().unwrap().is_empty());
        assert_eq!(child_stats(&node, "b").scans, 0);
        assert_eq!(child_stats(&node, "c").scans, 0);

        node.end();
        for name in ["empty", "b", "c"] {
            assert_eq!(child_stats(&node, name).ends, 1);
        }
    }

    #[test]
    fn test_similarity_over_other_access_method_is_intersected() {
        let mut catalog = catalog_with_exact_vector_index();
        catalog.register_key_index({
            let mut index = crate::core::KeyIndex::new("a");
            index.insert(MATCH_KEY, 2);
            index.insert(MATCH_KEY, 3);
            index
        })
        .unwrap();
        let ctx = context(catalog, false);
        let mut node = init_and(vec![similarity_scan(EXACT_VECTOR_INDEX), key_scan("a")], 1, &ctx);
        assert_eq!(node.multi_exec().unwrap(), row_set![2, 3]);
        assert_eq!(child_names(&node), vec![EXACT_VECTOR_INDEX, "a"]);
    }

    #[test]
    fn test_two_similarity_children_rejected_regardless_of_access_method() {
        let res = BitmapAndPlan::try_new(
            vec![similarity_scan(VECTOR_INDEX), key_scan("a"), similarity_scan(EXACT_VECTOR_INDEX)],
            10,
        );
        assert!(matches!(res, Err(ExecutorError::InvalidPlan(_))));
    }

    #[test]
    fn test_zero_children() {
        let ctx = context(catalog_of(&[], None), false);
        let mut node = init_and(vec![], 10, &ctx);
        assert!(matches!(node.multi_exec(), Err(ExecutorError::ContractViolation(_))));
    }

    #[test]
    fn test_unsupported_execution_mode() {
        let ctx = context(catalog_of(&[("a", &[1])], None), false);
        let plan = BitmapAndPlan::try_new(vec![key_scan("a")], 10).unwrap();
        for eflags in [ExecFlags::BACKWARD, ExecFlags::MARK] {
            assert!(matches!(
                BitmapAndState::init(&plan, &ctx, eflags | ExecFlags::REWIND),
                Err(ExecutorError::UnsupportedExecutionMode(_))
            ));
        }
    }

    #[test]
    fn test_child_init_failure() {
        let ctx = context(catalog_of(&[("a", &[1])], None), false);
        let plan = BitmapAndPlan::try_new(vec![key_scan("a"), key_scan("missing")], 10).unwrap();
        assert!(matches!(
            BitmapAndState::init(&plan, &ctx, ExecFlags::empty()),
            Err(ExecutorError::IndexNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_child_failure_propagates() {
        let ctx = context(catalog_of(&[("a", &[1]), ("b", &[1])], None), false);
        let mut node = init_and(vec![key_scan("a"), param_scan("b", 4)], 10, &ctx);
        assert!(matches!(node.multi_exec(), Err(ExecutorError::ParamNotBound(4))));
    }

    #[test]
    fn test_rescan_forwards_changed_params() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3]), ("b", &[2, 3])], None), false);
        ctx.set_param(1, MATCH_KEY);
        let mut node = init_and(vec![param_scan("a", 1), key_scan("b")], 10, &ctx);
        assert_eq!(node.multi_exec().unwrap(), row_set![2, 3]);

        ctx.set_param(1, MATCH_KEY + 1);
        let changed: ChangedParamSet = [1].into_iter().collect();
        node.node_state_mut().update_changed_param_set(&changed);
        assert_eq!(node.node_state().chg_param(), Some(&changed));
        node.rescan().unwrap();

        // "a" depends on the changed param and rescans itself when it next runs
        assert_eq!(child_stats(&node, "a").rescans, 0);
        assert_eq!(child_stats(&node, "b").rescans, 1);
        assert!(node.children().next().unwrap().node_state().chg_param().is_some());

        assert!(node.multi_exec().unwrap().is_empty());
        assert_eq!(child_stats(&node, "a").rescans, 1);
        assert!(node.children().all(|child| child.node_state().chg_param().is_none()));
    }

    #[test]
    fn test_rescan_clears_forwarded_changes() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3]), ("b", &[2, 3])], None), false);
        ctx.set_param(1, MATCH_KEY);
        let mut node = init_and(vec![param_scan("a", 1), key_scan("b")], 10, &ctx);
        node.multi_exec().unwrap();

        node.node_state_mut().update_changed_param_set(&[1].into_iter().collect());
        node.rescan().unwrap();
        assert!(node.node_state().chg_param().is_none());
        assert_eq!(node.multi_exec().unwrap(), row_set![2, 3]);
        assert_eq!(child_stats(&node, "a").rescans, 1);

        // nothing changed since: every child gets an explicit rescan
        node.rescan().unwrap();
        assert!(node.children().all(|child| child.node_state().chg_param().is_none()));
        assert_eq!(child_stats(&node, "a").rescans, 2);
        assert_eq!(child_stats(&node, "b").rescans, 2);
        assert_eq!(node.multi_exec().unwrap(), row_set![2, 3]);
        assert_eq!(child_stats(&node, "a").rescans, 2);
    }

    #[test]
    fn test_rescan_without_changed_params() {
        let ctx = context(catalog_of(&[("a", &[1]), ("b", &[1])], Some(2)), false);
        let mut node = init_and(vec![key_scan("a"), key_scan("b"), similarity_scan(VECTOR_INDEX)], 10, &ctx);
        node.rescan().unwrap();
        for name in ["a", "b", VECTOR_INDEX] {
            assert_eq!(child_stats(&node, name).rescans, 1);
        }
    }

    #[test]
    fn test_end_is_idempotent() {
        let ctx = context(catalog_of(&[("a", &[1, 2]), ("b", &[2])], Some(3)), false);
        let mut node = init_and(vec![key_scan("a"), key_scan("b"), similarity_scan(VECTOR_INDEX)], 10, &ctx);
        node.multi_exec().unwrap();
        node.end();
        node.end();
        for name in ["a", "b", VECTOR_INDEX] {
            assert_eq!(child_stats(&node, name).ends, 1);
        }
        assert!(matches!(node.multi_exec(), Err(ExecutorError::ContractViolation(_))));
    }

    #[test]
    fn test_nested_bitmap_or() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3, 4]), ("b", &[1]), ("c", &[4, 7])], None), false);
        let or_plan = BitmapOrPlan::new(vec![key_scan("b"), key_scan("c")]);
        let mut node = init_and(vec![key_scan("a"), or_plan.into()], 10, &ctx);
        assert_eq!(node.multi_exec().unwrap(), row_set![1, 4]);
    }

    #[test]
    fn test_instrumentation() {
        let ctx = context(catalog_of(&[("a", &[1, 2, 3]), ("b", &[2, 3])], None), true);
        let mut node = init_and(vec![key_scan("a"), key_scan("b")], 10, &ctx);
        node.multi_exec().unwrap();
        node.multi_exec().unwrap();
        let instrument = node.instrument().unwrap();
        assert_eq!(instrument.nloops(), 2);
        assert_eq!(instrument.ntuples(), 4);
        assert!(!instrument.is_running());

        let ctx = context(catalog_of(&[("a", &[1])], None), false);
        let node = init_and(vec![key_scan("a")], 10, &ctx);
        assert!(node.instrument().is_none());
    }
}
