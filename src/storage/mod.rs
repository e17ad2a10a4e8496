//! Gateway implementations for the remote invoice store

pub mod http;
pub mod in_memory;

pub use http::HttpInvoiceGateway;
pub use in_memory::InMemoryInvoiceGateway;
