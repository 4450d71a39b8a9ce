//! Delivery sinks for terminal snapshots

mod fanout;
mod request_store;
mod webhook;

pub use fanout::FanoutDeliverySink;
pub use request_store::{InMemoryRequestStore, RequestStatus};
pub use webhook::WebhookDeliverySink;
