//! cuba-adapter-postgres - PostgreSQL 适配器

mod attempt_store;
mod connection;
mod schema;

pub use attempt_store::*;
pub use connection::*;
pub use schema::*;
