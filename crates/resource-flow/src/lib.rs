pub mod config;
pub mod error;
pub mod planning;
pub mod store;
pub mod telemetry;
