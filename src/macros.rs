#[macro_export]
macro_rules! row_set(
    () => {
        {
            $crate::core::RowSetBitmap::default()
        }
    };
    ($($row_id:expr),+ $(,)?) => {
        {
            let mut bitmap = $crate::core::RowSetBitmap::default();
            $(
                bitmap.insert($row_id);
            )+
            bitmap
        }
    };
);
