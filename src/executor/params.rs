use std::collections::BTreeSet;

use fnv::FnvHashMap;
use parking_lot::RwLock;

use crate::common::errors::ExecutorError;
use crate::common::{ParamId, ParamValue};

/// Ids of runtime parameters whose values changed since a node last ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedParamSet(BTreeSet<ParamId>);

impl ChangedParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, param_id: ParamId) -> bool {
        self.0.insert(param_id)
    }

    pub fn contains(&self, param_id: ParamId) -> bool {
        self.0.contains(&param_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ParamId> + '_ {
        self.0.iter().copied()
    }

    /// Params of `self` that `relevant` mentions, `None` when there are none.
    pub fn restricted_to(&self, relevant: &BTreeSet<ParamId>) -> Option<ChangedParamSet> {
        let common: BTreeSet<ParamId> = self.0.intersection(relevant).copied().collect();
        (!common.is_empty()).then_some(ChangedParamSet(common))
    }

    pub fn merge(&mut self, other: ChangedParamSet) {
        self.0.extend(other.0);
    }
}

impl FromIterator<ParamId> for ChangedParamSet {
    fn from_iter<I: IntoIterator<Item = ParamId>>(iter: I) -> Self {
        ChangedParamSet(iter.into_iter().collect())
    }
}

/// Values bound to runtime parameters, shared by every node of one query.
#[derive(Debug, Default)]
pub struct ParamValues {
    values: RwLock<FnvHashMap<ParamId, ParamValue>>,
}

impl ParamValues {
    /// Bind a value and report whether it differs from the previous binding.
    pub fn set(&self, param_id: ParamId, value: ParamValue) -> bool {
        self.values.write().insert(param_id, value) != Some(value)
    }

    pub fn get(&self, param_id: ParamId) -> Result<ParamValue, ExecutorError> {
        self.values.read().get(&param_id).copied().ok_or(ExecutorError::ParamNotBound(param_id))
    }
}
