pub mod host;
mod interface;

pub use interface::*;
