//! Bitmap index executor nodes: intersection and union of the row sets produced by index scans,
//! with a similarity scan over a vector index running last as a filter on the collected rows.

#[macro_use]
mod macros;

pub mod common;
pub mod config;
pub mod core;
pub mod executor;

pub use crate::common::errors::ExecutorError;
pub use crate::common::RowId;
pub use crate::config::ExecutorConfig;
pub use crate::core::RowSetBitmap;
pub use crate::executor::{exec_init_node, BitmapAndState, BitmapExec, ExecContext, ExecFlags, ExecNode, PlanNode};

pub type Result<T> = std::result::Result<T, ExecutorError>;
