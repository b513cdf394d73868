//! Background Tasks Module
//!
//! Optional tokio tasks that drive maintenance on a shared cache.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at a fixed interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
