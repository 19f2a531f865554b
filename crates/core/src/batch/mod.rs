mod growth;
mod instance;
mod instance_batch;

pub use growth::*;
pub use instance::*;
pub use instance_batch::*;
