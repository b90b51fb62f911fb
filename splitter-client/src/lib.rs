//! Splitter client library exports.

pub mod api_client;
pub mod cache;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod notifications;
pub mod persistence;
pub mod realtime;
pub mod session;
pub mod socket;
pub mod telemetry;
pub mod transport;
