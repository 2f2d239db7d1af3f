//! `heritage-client`
//!
//! **Responsibility:** every outbound call to the heritage backend.
//!
//! This crate provides:
//! - identity propagation (`X-User-Id`) from an injected [`IdentityProvider`]
//! - GET/POST/PUT/DELETE and multipart upload over a pluggable [`Transport`]
//! - normalization of the `{success, message, data}` envelope into
//!   `Result<Envelope, ApiError>`
//!
//! [`IdentityProvider`]: heritage_auth::IdentityProvider

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod multipart;
pub mod query;
pub mod transport;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use envelope::{interpret, Envelope, FailureMessages};
pub use error::{ApiError, TransportError};
pub use multipart::{MultipartPayload, Part};
pub use query::QueryParams;
pub use transport::{Method, RequestBody, ReqwestTransport, Transport, TransportRequest, TransportResponse};
