pub mod fingerprint;
pub mod result_cache;

pub use fingerprint::*;
pub use result_cache::*;
