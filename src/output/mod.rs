// Output module
pub mod table;

pub use table::{CheckConfigRow, CheckResultRow, OutputFormat};
