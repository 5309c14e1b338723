//! Recency store backends.
//!
//! Both implement [`billboard_core::RecencyStore`]; which one a process uses
//! is decided once at startup.

pub mod moka;
pub mod redis;

pub use self::moka::MokaRecencyStore;
pub use self::redis::RedisRecencyStore;
