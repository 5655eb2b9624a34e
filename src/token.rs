//! Bearer-token acquisition and caching.

pub mod cache;
pub mod cached;
pub mod response;
pub mod secret;

pub use cache::*;
pub use cached::*;
pub use response::*;
pub use secret::*;
