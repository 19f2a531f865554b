pub mod backing;
pub mod batch;
pub mod context;
pub mod platform;
pub mod slot;

pub use slot_table_types as types;
