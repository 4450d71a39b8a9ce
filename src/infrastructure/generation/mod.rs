//! Generation client infrastructure

mod resilient_client;

pub use resilient_client::ResilientGenerationClient;
