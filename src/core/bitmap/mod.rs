mod row_set_bitmap;

pub use row_set_bitmap::RowSetBitmap;
