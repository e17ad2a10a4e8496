//! Mutation serialization, the optimistic update engine and the upload flow

pub mod engine;
pub mod serializer;
pub mod upload;

pub use engine::OptimisticUpdateEngine;
pub use serializer::{MutationSerializer, MutationToken};
pub use upload::{UploadFlow, UploadTicket};
