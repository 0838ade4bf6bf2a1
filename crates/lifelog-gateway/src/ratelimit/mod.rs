//! Sliding-window admission control.
//!
//! Per-key request timestamps are kept in a window store and pruned lazily on
//! every check; there is no background sweep. The store is injectable so a
//! networked backend can replace the in-memory map for multi-replica
//! deployments without touching call sites.

pub mod key;
pub mod limiter;
pub mod store;

pub use key::{build_rate_limit_key, KeyPart};
pub use limiter::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use store::{MemoryWindowStore, WindowStore};
