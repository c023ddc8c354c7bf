use std::collections::BTreeSet;

use typed_builder::TypedBuilder;

use crate::common::errors::ExecutorError;
use crate::common::{DistanceType, ParamId, ParamValue};
use crate::core::ScanOp;

/// Right-hand side of an index predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanArgument {
    Const(ParamValue),
    /// Resolved from the query's bound parameters on every scan.
    Param(ParamId),
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct IndexScanPlan {
    #[builder(setter(into))]
    pub index_name: String,
    #[builder(default = ScanOp::Eq)]
    pub op: ScanOp,
    pub arg: ScanArgument,
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct SimilarityScanPlan {
    #[builder(setter(into))]
    pub index_name: String,
    pub query: Vec<f32>,
}

/// Read-only part of the similarity clause stored on the plan.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimilarityClauseTemplate {
    pub max_distance: Option<DistanceType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitmapAndPlan {
    bitmap_plans: Vec<PlanNode>,
    similarity_clause: Option<SimilarityClauseTemplate>,
    limit: i64,
}

impl BitmapAndPlan {
    /// `limit` is the candidate limit handed to a similarity child that runs after other
    /// predicates. At most one similarity child is accepted, whatever access method serves it:
    /// a plan only names its index, the access method is resolved later at node init.
    pub fn try_new(bitmap_plans: Vec<PlanNode>, limit: i64) -> Result<Self, ExecutorError> {
        let similarity_plans = bitmap_plans.iter().filter(|plan| plan.is_similarity_scan()).count();
        if similarity_plans > 1 {
            return Err(ExecutorError::InvalidPlan(format!(
                "BitmapAnd supports at most one similarity scan, got {}",
                similarity_plans
            )));
        }
        Ok(BitmapAndPlan { bitmap_plans, similarity_clause: None, limit })
    }

    pub fn with_similarity_clause(mut self, template: SimilarityClauseTemplate) -> Self {
        self.similarity_clause = Some(template);
        self
    }

    pub fn bitmap_plans(&self) -> &[PlanNode] {
        &self.bitmap_plans
    }

    pub fn similarity_clause(&self) -> Option<&SimilarityClauseTemplate> {
        self.similarity_clause.as_ref()
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitmapOrPlan {
    bitmap_plans: Vec<PlanNode>,
}

impl BitmapOrPlan {
    pub fn new(bitmap_plans: Vec<PlanNode>) -> Self {
        BitmapOrPlan { bitmap_plans }
    }

    pub fn bitmap_plans(&self) -> &[PlanNode] {
        &self.bitmap_plans
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    IndexScan(IndexScanPlan),
    SimilarityScan(SimilarityScanPlan),
    BitmapAnd(BitmapAndPlan),
    BitmapOr(BitmapOrPlan),
}

impl PlanNode {
    pub fn is_similarity_scan(&self) -> bool {
        matches!(self, PlanNode::SimilarityScan(_))
    }

    /// Every runtime parameter this subtree reads.
    pub fn referenced_params(&self) -> BTreeSet<ParamId> {
        let mut params = BTreeSet::new();
        self.collect_params(&mut params);
        params
    }

    fn collect_params(&self, params: &mut BTreeSet<ParamId>) {
        match self {
            PlanNode::IndexScan(plan) => {
                if let ScanArgument::Param(param_id) = plan.arg {
                    params.insert(param_id);
                }
            }
            PlanNode::SimilarityScan(_) => {}
            PlanNode::BitmapAnd(plan) => plan.bitmap_plans.iter().for_each(|child| child.collect_params(params)),
            PlanNode::BitmapOr(plan) => plan.bitmap_plans.iter().for_each(|child| child.collect_params(params)),
        }
    }
}

impl From<IndexScanPlan> for PlanNode {
    fn from(plan: IndexScanPlan) -> Self {
        PlanNode::IndexScan(plan)
    }
}

impl From<SimilarityScanPlan> for PlanNode {
    fn from(plan: SimilarityScanPlan) -> Self {
        PlanNode::SimilarityScan(plan)
    }
}

impl From<BitmapAndPlan> for PlanNode {
    fn from(plan: BitmapAndPlan) -> Self {
        PlanNode::BitmapAnd(plan)
    }
}

impl From<BitmapOrPlan> for PlanNode {
    fn from(plan: BitmapOrPlan) -> Self {
        PlanNode::BitmapOr(plan)
    }
}
