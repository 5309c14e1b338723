mod ads;
mod health;
mod short;

pub use ads::ads_handler;
pub use health::health_handler;
pub use short::short_handler;
