//! 基础设施层

mod cleanup;
mod memory_store;
pub mod metrics;
mod store_factory;

pub use cleanup::CleanupTask;
pub use memory_store::MemoryAttemptStore;
pub use store_factory::build_store;
