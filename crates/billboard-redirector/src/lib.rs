//! Shortlink resolution and click redirects.
//!
//! [`ShortlinkResolver`] puts a negative and a positive cache tier in front
//! of a [`ShortlinkRepository`](billboard_core::ShortlinkRepository).
//! [`RedirectService`] turns a resolution into a redirect target and records
//! the click.
//!
//! # Example
//!
//! ```rust
//! use billboard_cache::{MokaShortlinkCache, ShortlinkTtl};
//! use billboard_core::{ShortCode, TenantId};
//! use billboard_redirector::{Resolution, ShortlinkResolver};
//! use billboard_storage::InMemoryRepository;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ShortlinkResolver::new(
//!     Arc::new(InMemoryRepository::new()),
//!     Arc::new(MokaShortlinkCache::new(ShortlinkTtl::default())),
//! );
//!
//! let code = ShortCode::new("summer")?;
//! match resolver.resolve(TenantId::new(1), &code).await? {
//!     Resolution::Found(target) => println!("redirect to {}", target.url),
//!     Resolution::NotFound => println!("no such code"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod resolver;
pub mod service;

pub use error::{RedirectorError, Result};
pub use resolver::{Resolution, ShortlinkResolver};
pub use service::{fallback_url, ClickRequest, Redirect, RedirectService};
