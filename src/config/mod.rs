mod executor_config;

pub use executor_config::ExecutorConfig;
