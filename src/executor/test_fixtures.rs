//! Catalog and plan builders shared by executor tests.

use std::sync::Arc;

use crate::common::{AccessMethodId, ParamId, ParamValue};
use crate::config::ExecutorConfig;
use crate::core::{DistanceMetric, IndexCatalog, KeyIndex, VectorIndex};
use crate::RowId;

use super::{ExecContext, IndexScanPlan, PlanNode, ScanArgument, SimilarityScanPlan};

pub const MATCH_KEY: ParamValue = 1;
pub const VECTOR_INDEX: &str = "embedding_idx";
pub const EXACT_VECTOR_INDEX: &str = "embedding_exact_idx";

pub fn get_logger() -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter(None, log::LevelFilter::Trace).is_test(true);
    builder
}

/// One key index per `(name, rows)`, every row stored under `MATCH_KEY`. With `vector_rows`
/// set, adds a 1-dim vector index holding row `i` at `[i]` for `i` in `1..=vector_rows`.
pub fn catalog_of(key_indexes: &[(&str, &[RowId])], vector_rows: Option<u32>) -> IndexCatalog {
    let _ = get_logger().try_init();
    let mut catalog = IndexCatalog::default();
    for (name, rows) in key_indexes {
        let mut index = KeyIndex::new(*name);
        for row_id in rows.iter() {
            index.insert(MATCH_KEY, *row_id);
        }
        catalog.register_key_index(index).unwrap();
    }
    if let Some(vector_rows) = vector_rows {
        catalog.register_vector_index(line_vector_index(VECTOR_INDEX, vector_rows)).unwrap();
    }
    catalog
}

pub fn catalog_with_exact_vector_index() -> IndexCatalog {
    let mut catalog = IndexCatalog::default();
    let index = line_vector_index(EXACT_VECTOR_INDEX, 3).with_access_method(AccessMethodId::BTREE);
    catalog.register_vector_index(index).unwrap();
    catalog
}

fn line_vector_index(name: &str, rows: u32) -> VectorIndex {
    let mut index = VectorIndex::new(name, 1, DistanceMetric::L2);
    for row_id in 1..=rows {
        index.insert(row_id, vec![row_id as f32]).unwrap();
    }
    index
}

pub fn context(catalog: IndexCatalog, enable_instrumentation: bool) -> Arc<ExecContext> {
    ExecContext::new(ExecutorConfig::new(64, enable_instrumentation), catalog)
}

pub fn key_scan_plan(index_name: &str) -> IndexScanPlan {
    IndexScanPlan::builder().index_name(index_name).arg(ScanArgument::Const(MATCH_KEY)).build()
}

pub fn param_scan_plan(index_name: &str, param_id: ParamId) -> IndexScanPlan {
    IndexScanPlan::builder().index_name(index_name).arg(ScanArgument::Param(param_id)).build()
}

pub fn similarity_scan_plan(index_name: &str) -> SimilarityScanPlan {
    SimilarityScanPlan::builder().index_name(index_name).query(vec![0.0]).build()
}

pub fn key_scan(index_name: &str) -> PlanNode {
    key_scan_plan(index_name).into()
}

pub fn param_scan(index_name: &str, param_id: ParamId) -> PlanNode {
    param_scan_plan(index_name, param_id).into()
}

pub fn similarity_scan(index_name: &str) -> PlanNode {
    similarity_scan_plan(index_name).into()
}
