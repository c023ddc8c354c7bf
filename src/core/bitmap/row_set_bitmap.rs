use roaring::RoaringBitmap;

use crate::common::constants::{DEFAULT_WORK_MEM_KB, KILOBYTE};
use crate::RowId;

/// Candidate row-id set produced by bitmap index scans.
///
/// The memory budget is advisory: it comes from `work_mem` and is reported through
/// [`RowSetBitmap::exceeds_budget`], the set itself stays exact.
#[derive(Debug, Clone)]
pub struct RowSetBitmap {
    rows: RoaringBitmap,
    memory_budget: u64,
}

impl Default for RowSetBitmap {
    fn default() -> Self {
        Self::with_memory_budget(DEFAULT_WORK_MEM_KB * KILOBYTE)
    }
}

impl PartialEq for RowSetBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl Eq for RowSetBitmap {}

impl RowSetBitmap {
    pub fn with_memory_budget(memory_budget: u64) -> Self {
        Self { rows: RoaringBitmap::new(), memory_budget }
    }

    pub fn memory_budget(&self) -> u64 {
        self.memory_budget
    }

    pub fn insert(&mut self, row_id: RowId) -> bool {
        self.rows.insert(row_id)
    }

    pub fn contains(&self, row_id: RowId) -> bool {
        self.rows.contains(row_id)
    }

    pub fn len(&self) -> u64 {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = RowId> + '_ {
        self.rows.iter()
    }

    pub fn exceeds_budget(&self) -> bool {
        self.rows.serialized_size() as u64 > self.memory_budget
    }

    /// OR `other` into `self` without consuming it.
    pub fn merge_from(&mut self, other: &RowSetBitmap) {
        self.rows |= &other.rows;
    }

    /// AND two bitmaps. Both inputs are consumed, the merged set keeps `self`'s budget.
    pub fn intersect(mut self, other: RowSetBitmap) -> RowSetBitmap {
        self.rows &= &other.rows;
        self
    }

    /// OR two bitmaps. Both inputs are consumed, the merged set keeps `self`'s budget.
    pub fn union(mut self, other: RowSetBitmap) -> RowSetBitmap {
        self.rows |= &other.rows;
        self
    }
}

impl FromIterator<RowId> for RowSetBitmap {
    fn from_iter<I: IntoIterator<Item = RowId>>(iter: I) -> Self {
        let mut bitmap = Self::default();
        bitmap.rows.extend(iter);
        bitmap
    }
}

impl From<Vec<RowId>> for RowSetBitmap {
    fn from(value: Vec<RowId>) -> Self {
        value.into_iter().collect()
    }
}

impl From<RowSetBitmap> for Vec<RowId> {
    fn from(value: RowSetBitmap) -> Self {
        value.rows.iter().collect()
    }
}
