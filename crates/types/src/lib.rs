//! Plain data shared between the slot table and whatever consumes it. Everything in here is `Pod` so it may be
//! copied verbatim into consumer-visible storage.

#![no_std]

pub mod completion;
pub mod instance;
pub mod slot;

pub use completion::*;
pub use instance::*;
pub use slot::*;
