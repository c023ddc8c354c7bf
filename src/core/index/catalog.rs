use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use crate::common::errors::ExecutorError;
use crate::common::AccessMethodId;

use super::{KeyIndex, VectorIndex};

#[derive(Debug, Clone)]
pub enum IndexHandle {
    Key(Arc<KeyIndex>),
    Vector(Arc<VectorIndex>),
}

impl IndexHandle {
    pub fn name(&self) -> &str {
        match self {
            IndexHandle::Key(index) => index.name(),
            IndexHandle::Vector(index) => index.name(),
        }
    }

    pub fn access_method(&self) -> AccessMethodId {
        match self {
            IndexHandle::Key(index) => index.access_method(),
            IndexHandle::Vector(index) => index.access_method(),
        }
    }
}

/// Indexes visible to the executor, looked up by name at node init.
#[derive(Debug, Clone, Default)]
pub struct IndexCatalog {
    indexes: HashMap<String, IndexHandle>,
}

impl IndexCatalog {
    pub fn register(&mut self, handle: IndexHandle) -> Result<(), ExecutorError> {
        let name = handle.name().to_string();
        if self.indexes.contains_key(&name) {
            return Err(ExecutorError::DuplicateIndex(name));
        }
        info!("[register] index:{}, access_method:{}", name, handle.access_method());
        self.indexes.insert(name, handle);
        Ok(())
    }

    pub fn register_key_index(&mut self, index: KeyIndex) -> Result<(), ExecutorError> {
        self.register(IndexHandle::Key(Arc::new(index)))
    }

    pub fn register_vector_index(&mut self, index: VectorIndex) -> Result<(), ExecutorError> {
        self.register(IndexHandle::Vector(Arc::new(index)))
    }

    pub fn get(&self, name: &str) -> Result<&IndexHandle, ExecutorError> {
        self.indexes.get(name).ok_or_else(|| ExecutorError::IndexNotFound(name.to_string()))
    }

    pub fn key_index(&self, name: &str) -> Result<Arc<KeyIndex>, ExecutorError> {
        match self.get(name)? {
            IndexHandle::Key(index) => Ok(Arc::clone(index)),
            other => Err(ExecutorError::IndexKindMismatch {
                index: name.to_string(),
                access_method: other.access_method(),
                expected: "key",
            }),
        }
    }

    pub fn vector_index(&self, name: &str) -> Result<Arc<VectorIndex>, ExecutorError> {
        match self.get(name)? {
            IndexHandle::Vector(index) => Ok(Arc::clone(index)),
            other => Err(ExecutorError::IndexKindMismatch {
                index: name.to_string(),
                access_method: other.access_method(),
                expected: "similarity",
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
