use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::common::errors::ExecutorError;
use crate::common::{AccessMethodId, DistanceType};
use crate::core::{RowSetBitmap, SimilarityClause};
use crate::RowId;

#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Default, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    L2,
    Cosine,
    InnerProduct,
}

impl DistanceMetric {
    /// Smaller is closer for every metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> DistanceType {
        match self {
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt(),
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (norm_a * norm_b)
                }
            }
            DistanceMetric::InnerProduct => -a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
        }
    }
}

/// Flat nearest-neighbor index over dense vectors.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    name: String,
    dim: usize,
    metric: DistanceMetric,
    access_method: AccessMethodId,
    vectors: BTreeMap<RowId, Vec<f32>>,
}

impl VectorIndex {
    pub fn new(name: impl Into<String>, dim: usize, metric: DistanceMetric) -> Self {
        VectorIndex {
            name: name.into(),
            dim,
            metric,
            access_method: AccessMethodId::VECTOR,
            vectors: BTreeMap::new(),
        }
    }

    /// Serve the index through another access method, e.g. an exact-match fallback.
    pub fn with_access_method(mut self, access_method: AccessMethodId) -> Self {
        self.access_method = access_method;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn access_method(&self) -> AccessMethodId {
        self.access_method
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn insert(&mut self, row_id: RowId, vector: Vec<f32>) -> Result<(), ExecutorError> {
        if vector.len() != self.dim {
            return Err(ExecutorError::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        self.vectors.insert(row_id, vector);
        Ok(())
    }

    /// Fill `sink` with the nearest rows to `query`.
    ///
    /// With `check_row_id` only rows already in the sink are candidates. The sink comes back
    /// holding exactly the surviving rows.
    pub fn search(
        &self,
        query: &[f32],
        clause: &SimilarityClause,
        mut sink: RowSetBitmap,
    ) -> Result<RowSetBitmap, ExecutorError> {
        if query.len() != self.dim {
            return Err(ExecutorError::DimensionMismatch { expected: self.dim, actual: query.len() });
        }

        let candidates = self
            .vectors
            .iter()
            .filter(|(row_id, _)| !clause.check_row_id || sink.contains(**row_id))
            .map(|(row_id, vector)| (OrderedFloat(self.metric.distance(query, vector)), *row_id))
            .filter(|(distance, _)| clause.max_distance.map_or(true, |max| distance.0 <= max));

        let nearest: Vec<RowId> = match clause.limit() {
            Some(limit) => candidates.k_smallest(limit).map(|(_, row_id)| row_id).collect(),
            None => candidates.map(|(_, row_id)| row_id).collect(),
        };

        debug!(
            "[search] index:{}, check_row_id:{}, candidate_limit:{}, sink rows:{}, matched rows:{}",
            self.name,
            clause.check_row_id,
            clause.candidate_limit,
            sink.len(),
            nearest.len()
        );

        sink.clear();
        for row_id in nearest {
            sink.insert(row_id);
        }
        Ok(sink)
    }
}
