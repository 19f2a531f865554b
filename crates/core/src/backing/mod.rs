//! Backing data structures for handing out slots of the table and deferring their reuse until the consumer has
//! finished reading them.

pub mod allocator;
pub mod pending;
pub mod range_set;
pub mod slot_array;
