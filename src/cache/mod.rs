//! In-memory, keyed, subscribable cache of the invoice collection

pub mod events;
pub mod store;

pub use events::{CacheEvent, EventEnvelope};
pub use store::{CacheSnapshot, CacheStore};
