pub mod client;
pub mod executor;
pub mod memory;
pub mod query;

pub use client::*;
pub use executor::*;
pub use memory::*;
pub use query::*;
