/// Access method identifiers, matching the catalog oids of the host engine.
pub const BTREE_ACCESS_METHOD_OID: u32 = 403;
pub const HASH_ACCESS_METHOD_OID: u32 = 405;
pub const VECTOR_ACCESS_METHOD_OID: u32 = 8123;

/// `work_mem` is configured in kilobytes.
pub const KILOBYTE: u64 = 1024;
pub const DEFAULT_WORK_MEM_KB: u64 = 4096;

/// `candidate_limit` value asking a similarity scan for every match.
pub const UNLIMITED_CANDIDATES: i64 = -1;

pub const EXECUTOR_CONFIG_FILE: &str = "executor_config.json";

/// Log target used by `LoggerConfig::only_record_crate`.
pub const LOG_TARGET: &str = "bitmap_intersection";
pub const LOG_FILE_NAME: &str = "bitmap_intersection.log";
pub const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l} [{T}] {t} - {m}{n}";
