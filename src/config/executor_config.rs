use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::constants::{DEFAULT_WORK_MEM_KB, EXECUTOR_CONFIG_FILE, KILOBYTE};
use crate::common::file_operations::{atomic_save_json, read_json, FileOperationError};

fn default_work_mem_kb() -> u64 {
    DEFAULT_WORK_MEM_KB
}

#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Per-operation memory allowance, in kilobytes.
    #[serde(default = "default_work_mem_kb")]
    pub work_mem_kb: u64,

    /// Record start/stop markers around node evaluation.
    #[serde(default)]
    pub enable_instrumentation: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig { work_mem_kb: DEFAULT_WORK_MEM_KB, enable_instrumentation: false }
    }
}

impl ExecutorConfig {
    pub fn new(work_mem_kb: u64, enable_instrumentation: bool) -> Self {
        ExecutorConfig { work_mem_kb, enable_instrumentation }
    }

    /// Memory budget handed to a freshly created bitmap.
    pub fn work_mem_bytes(&self) -> u64 {
        self.work_mem_kb.saturating_mul(KILOBYTE)
    }

    pub fn load(config_dir: &Path) -> Result<Self, FileOperationError> {
        let file_path = config_dir.join(EXECUTOR_CONFIG_FILE);
        read_json(&file_path)
    }

    pub fn save(&self, config_dir: &Path) -> Result<(), FileOperationError> {
        let file_path = config_dir.join(EXECUTOR_CONFIG_FILE);
        if !config_dir.exists() {
            std::fs::create_dir_all(config_dir).map_err(FileOperationError::IoError)?;
        }
        atomic_save_json(&file_path, self)
    }
}
