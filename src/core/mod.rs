mod bitmap;
mod index;

pub use bitmap::RowSetBitmap;
pub use index::*;
