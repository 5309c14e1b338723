//! Ad delivery engine.
//!
//! A request flows through [`TenantAdCache`] (kept fresh by
//! [`CacheRefresher`]), the tenant's recency window, and the pure
//! [`selection`] pipeline. [`DeliveryService`] wires those steps together and
//! records the resulting views.

pub mod cache;
pub mod error;
pub mod refresher;
pub mod rules;
pub mod selection;
pub mod service;

pub use cache::{TenantAdCache, TenantSnapshot};
pub use error::{DeliveryError, Result};
pub use refresher::{CacheRefresher, RefreshReport};
pub use rules::{PlacementRules, Quota, QuotaRules};
pub use selection::{select, SelectedAd};
pub use service::{Delivery, DeliveryRequest, DeliveryService, DeliverySettings};
