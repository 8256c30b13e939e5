//! cuba-adapter-redis - Redis 适配器

mod attempt_store;
mod connection;

pub use attempt_store::*;
pub use connection::*;
