//! `heritage-core`: shared primitives for the heritage client.
//!
//! This crate holds **pure** building blocks (no storage, no transport).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
