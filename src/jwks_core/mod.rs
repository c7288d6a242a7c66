pub mod config;
pub mod decoder;
pub mod error;
pub mod http_client;
pub mod rotator;
pub mod stats;
pub mod types;
