//! Outbound HTTP contract and per-kind protocol handlers.
//!
//! A [`handlers::PostHandler`], [`handlers::TermHandler`], or
//! [`handlers::AttachmentHandler`] turns a local entity into signed
//! create/update/delete requests against one destination and applies the
//! confirmed response to the Identity Map. Create-vs-update is decided
//! solely by descriptor presence; a failed request leaves the
//! (entity, destination) pair in its prior state.

pub mod context;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod prepare;
pub mod response;
pub mod scripted;
pub mod transport;

pub use context::HandlerContext;
pub use endpoint::{headers, resources};
pub use error::{ProtocolError, ProtocolResult};
pub use handler::EntityHandler;
pub use handlers::{handler_for, AttachmentHandler, PostHandler, TermHandler};
pub use response::{DeleteOutcome, RemoteEntity, SaveResult};
pub use scripted::ScriptedTransport;
pub use transport::{
    HttpTransport, Method, OutboundRequest, RequestBody, Transport, TransportResponse,
};
