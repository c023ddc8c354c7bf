use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::common::constants::{LOG_FILE_NAME, LOG_PATTERN, LOG_TARGET};
use crate::common::errors::ExecutorError;

/// Handle of the installed log4rs logger, replaced on re-initialization.
pub static LOG4RS_HANDLE: Lazy<Mutex<Option<Handle>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub log_directory: PathBuf,
    pub log_level: String,
    pub log_in_file: bool,
    pub console_display: bool,
    /// Only record `target=bitmap_intersection` log content.
    pub only_record_crate: bool,
}

impl LoggerConfig {
    pub fn new(
        log_directory: impl Into<PathBuf>,
        log_level: impl Into<String>,
        log_in_file: bool,
        console_display: bool,
        only_record_crate: bool,
    ) -> Self {
        LoggerConfig {
            log_directory: log_directory.into(),
            log_level: log_level.into(),
            log_in_file,
            console_display,
            only_record_crate,
        }
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ExecutorError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ExecutorError::LoggerError(format!("invalid log level `{}`", self.log_level)))
    }

    pub fn build_logger_config(&self) -> Result<Config, ExecutorError> {
        let level = self.level_filter()?;
        let mut builder = Config::builder();
        let mut appenders: Vec<&str> = Vec::new();

        if self.console_display {
            let stdout = ConsoleAppender::builder()
                .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
                .build();
            builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
            appenders.push("stdout");
        }
        if self.log_in_file {
            let file = FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
                .build(self.log_directory.join(LOG_FILE_NAME))
                .map_err(|e| ExecutorError::LoggerError(e.to_string()))?;
            builder = builder.appender(Appender::builder().build("file", Box::new(file)));
            appenders.push("file");
        }

        let config = if self.only_record_crate {
            builder
                .logger(
                    Logger::builder()
                        .appenders(appenders.iter().copied())
                        .additive(false)
                        .build(LOG_TARGET, level),
                )
                .build(Root::builder().build(LevelFilter::Off))?
        } else {
            builder.build(Root::builder().appenders(appenders.iter().copied()).build(level))?
        };
        Ok(config)
    }
}

/// Install the logger on first call, swap its config afterwards.
pub fn initialize_logger(logger_config: &LoggerConfig) -> Result<(), ExecutorError> {
    let config = logger_config.build_logger_config()?;
    let mut handle = LOG4RS_HANDLE.lock();
    match handle.as_ref() {
        Some(installed) => installed.set_config(config),
        None => *handle = Some(log4rs::init_config(config)?),
    }
    Ok(())
}
