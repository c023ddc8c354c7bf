use std::sync::Arc;

use crate::common::errors::ExecutorError;
use crate::common::{ParamId, ParamValue};
use crate::config::ExecutorConfig;
use crate::core::IndexCatalog;

use super::ParamValues;

/// Per-query executor state shared by every node of a plan tree.
#[derive(Debug)]
pub struct ExecContext {
    config: ExecutorConfig,
    catalog: IndexCatalog,
    params: ParamValues,
}

impl ExecContext {
    pub fn new(config: ExecutorConfig, catalog: IndexCatalog) -> Arc<Self> {
        Arc::new(ExecContext { config, catalog, params: ParamValues::default() })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &IndexCatalog {
        &self.catalog
    }

    pub fn work_mem_bytes(&self) -> u64 {
        self.config.work_mem_bytes()
    }

    pub fn set_param(&self, param_id: ParamId, value: ParamValue) -> bool {
        self.params.set(param_id, value)
    }

    pub fn param(&self, param_id: ParamId) -> Result<ParamValue, ExecutorError> {
        self.params.get(param_id)
    }
}
