mod bitmap_and;
mod bitmap_or;
mod context;
mod exec_flags;
mod exec_node;
mod index_scan;
mod instrument;
mod params;
mod plan;
mod similarity_scan;

#[cfg(test)]
mod test_fixtures;

pub use bitmap_and::BitmapAndState;
pub use bitmap_or::BitmapOrState;
pub use context::ExecContext;
pub use exec_flags::ExecFlags;
pub use exec_node::{exec_init_node, BitmapExec, ExecNode, NodeState, ScanStats};
pub use index_scan::IndexScanState;
pub use instrument::Instrumentation;
pub use params::{ChangedParamSet, ParamValues};
pub use plan::{
    BitmapAndPlan, BitmapOrPlan, IndexScanPlan, PlanNode, ScanArgument, SimilarityClauseTemplate, SimilarityScanPlan,
};
pub use similarity_scan::SimilarityScanState;
