mod catalog;
mod key_index;
mod similarity_clause;
mod vector_index;

pub use catalog::{IndexCatalog, IndexHandle};
pub use key_index::{KeyIndex, ScanOp};
pub use similarity_clause::SimilarityClause;
pub use vector_index::{DistanceMetric, VectorIndex};
