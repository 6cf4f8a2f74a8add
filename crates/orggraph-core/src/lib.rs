pub mod config;
pub mod error;
pub mod request;
pub mod schema;
pub mod types;

pub use config::*;
pub use error::*;
pub use request::*;
pub use schema::*;
pub use types::*;
