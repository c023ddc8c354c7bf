use std::collections::BTreeMap;
use std::ops::Bound;

use log::trace;

use crate::common::{AccessMethodId, ParamValue};
use crate::core::RowSetBitmap;
use crate::RowId;

/// Comparison applied between the indexed key and the scan argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Ordered key index answering exact and range predicates with row bitmaps.
#[derive(Debug, Clone)]
pub struct KeyIndex {
    name: String,
    entries: BTreeMap<ParamValue, RowSetBitmap>,
}

impl KeyIndex {
    pub fn new(name: impl Into<String>) -> Self {
        KeyIndex { name: name.into(), entries: BTreeMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access_method(&self) -> AccessMethodId {
        AccessMethodId::BTREE
    }

    pub fn insert(&mut self, key: ParamValue, row_id: RowId) {
        self.entries.entry(key).or_default().insert(row_id);
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn scan(&self, op: ScanOp, key: ParamValue, memory_budget: u64) -> RowSetBitmap {
        let range = match op {
            ScanOp::Eq => (Bound::Included(key), Bound::Included(key)),
            ScanOp::Lt => (Bound::Unbounded, Bound::Excluded(key)),
            ScanOp::Le => (Bound::Unbounded, Bound::Included(key)),
            ScanOp::Gt => (Bound::Excluded(key), Bound::Unbounded),
            ScanOp::Ge => (Bound::Included(key), Bound::Unbounded),
        };
        let mut result = RowSetBitmap::with_memory_budget(memory_budget);
        for (_, rows) in self.entries.range(range) {
            result.merge_from(rows);
        }
        trace!("[scan] index:{}, op:{:?}, key:{}, matched rows:{}", self.name, op, key, result.len());
        result
    }
}
