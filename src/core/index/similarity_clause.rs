use crate::common::constants::UNLIMITED_CANDIDATES;
use crate::common::DistanceType;

/// Per-execution instructions for a similarity index scan.
///
/// A clause is built fresh for every execution and moved into the scan, it never lives in
/// shared plan data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityClause {
    /// Only rows already present in the sink bitmap may be returned.
    pub check_row_id: bool,
    /// Maximum number of nearest rows to return, `-1` for all of them.
    pub candidate_limit: i64,
    pub max_distance: Option<DistanceType>,
}

impl Default for SimilarityClause {
    fn default() -> Self {
        Self::authoritative(None)
    }
}

impl SimilarityClause {
    /// The scan is the sole predicate: return every match, nothing to filter against.
    pub fn authoritative(max_distance: Option<DistanceType>) -> Self {
        SimilarityClause { check_row_id: false, candidate_limit: UNLIMITED_CANDIDATES, max_distance }
    }

    /// Other predicates already produced the candidate set held by the sink.
    pub fn filtering(candidate_limit: i64, max_distance: Option<DistanceType>) -> Self {
        SimilarityClause { check_row_id: true, candidate_limit, max_distance }
    }

    /// `None` when unlimited. Any negative limit is treated as unlimited.
    pub fn limit(&self) -> Option<usize> {
        usize::try_from(self.candidate_limit).ok()
    }
}
