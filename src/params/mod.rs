pub mod param;
pub mod tree;

pub use param::Parameter;
pub use tree::{Item, ParamTree};
