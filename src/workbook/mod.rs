pub mod address;
pub mod reader;

pub use reader::{Sheet, Workbook, is_blank};
