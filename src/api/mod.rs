//! Transport-facing envelopes and the error taxonomy.

pub mod error;
pub mod request;

pub use error::{ErrorKind, ErrorRecord};
pub use request::{
    CreateRequest, DeleteRequest, Payload, PatchRequest, ReadRequest, SearchRequest, UpdateRequest,
};
