//! Client protocol layer for NotebookLM's batched RPC transport.
//!
//! Calls are encoded as form-urlencoded envelopes, responses are framed
//! chunk streams, and every domain record comes back as positional nested
//! arrays. [`NotebookClient`] ties the pieces together; the lower layers
//! ([`rpc`], [`chat`], [`artifacts`]) are usable on their own against
//! captured bodies.

pub mod artifacts;
pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod conversation;
pub mod download;
pub mod error;
pub mod logging;
pub mod nav;
pub mod retry;
pub mod rpc;
pub mod transport;
pub mod types;

pub use artifacts::{ArtifactKind, ArtifactRecord, ArtifactStatus, StudioArtifact};
pub use auth::{CredentialSource, Credentials, FileUploader, StaticCredentials};
pub use client::{NotebookClient, QueryOptions, StudioRequest, select_completed};
pub use config::{ClientConfig, TimeoutConfig};
pub use conversation::ConversationCache;
pub use error::{Error, Result};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
