//! Core types and traits for the Billboard ad server.
//!
//! This crate provides the domain model and the contracts shared by the
//! delivery engine, the shortlink redirector and the storage backends.

pub mod ad;
pub mod error;
pub mod event;
pub mod recency;
pub mod repository;
pub mod shortcode;
pub mod tenant;

pub use ad::{Ad, AdCode, AdTypeId, TypeVariant};
pub use error::{CacheError, CoreError, StorageError};
pub use event::{AdEvent, ClientIdentity, EventKind, EventLog};
pub use recency::{RecencyStore, UserKey};
pub use repository::{AdRepository, ShortlinkRepository, ShortlinkTarget};
pub use shortcode::ShortCode;
pub use tenant::TenantId;
