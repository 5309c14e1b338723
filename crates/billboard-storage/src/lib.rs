//! Repository and event-log implementations.
//!
//! [`MySqlRepository`] is the production backend; [`InMemoryRepository`]
//! backs tests and local runs seeded from a JSON file.

pub mod memory;
pub mod mysql;

pub use billboard_core::error::{Result, StorageError};
pub use memory::{InMemoryRepository, Seed, SeedAd, StoredAd};
pub use mysql::MySqlRepository;
