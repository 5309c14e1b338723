//! Cache tiers and recency stores shared by the Billboard services.
//!
//! Two families live here:
//!
//! - [`shortlink`]: positive/negative caches in front of the shortlink
//!   repository, with Moka, Redis and layered implementations.
//! - [`recency`]: per-user windows of recently delivered ad codes, backed
//!   by a Redis list or a bounded in-process Moka cache.

pub mod error;
pub mod recency;
pub mod shortlink;

pub use error::{CacheError, Result};
pub use recency::{MokaRecencyStore, RedisRecencyStore};
pub use shortlink::{
    LayeredShortlinkCache, MokaShortlinkCache, RedisShortlinkCache, ShortlinkCache, ShortlinkKey,
    ShortlinkTtl,
};
