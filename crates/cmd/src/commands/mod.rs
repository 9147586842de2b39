pub mod generate;
pub mod glob;
pub mod ls;
pub mod resolve;
pub mod tree;

pub use generate::{Layer, generate_command};
pub use glob::match_command;
pub use ls::ls_command;
pub use resolve::resolve_command;
pub use tree::tree_command;
