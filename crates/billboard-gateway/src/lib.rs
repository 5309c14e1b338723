//! HTTP boundary of the Billboard ad server.
//!
//! Serves ad delivery on `GET /`, shortlink redirects on `GET /{short}` and
//! a liveness check on `GET /-/health`.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;
pub mod tenant;

pub use app::App;
pub use config::Config;
pub use state::AppState;
pub use tenant::{TenantDirectory, TenantSite};
