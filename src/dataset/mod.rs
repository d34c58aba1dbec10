mod row;
mod writer;

pub use row::{format_row, COLUMN_COUNT, HEADER};
pub use writer::LogWriter;
