mod ads;
mod health;

pub use ads::{AdItem, AdsQuery, AdsResponse};
pub use health::HealthResponse;
