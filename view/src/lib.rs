pub mod bar;
pub mod list;
pub mod status_line;
pub mod title_bar;

pub use bar::Bar;
pub use list::{Row, RowList, RowValue};
pub use status_line::StatusLine;
pub use title_bar::TitleBar;
