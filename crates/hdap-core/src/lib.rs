//! # hdap-core
//!
//! Core types and utilities for HDAP directory clients.
//!
//! This crate provides the foundational pieces shared by HDAP client
//! crates: the error taxonomy with HTTP status mapping, credential
//! resolution, client configuration, query-parameter assembly, and the
//! shared notification slot.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`credentials`] - Credential values and Authorization resolution
//! - [`config`] - Configuration structures for directory clients
//! - [`query`] - Query-parameter pair builder
//! - [`notify`] - Shared notification slot for user-facing messages

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod notify;
pub mod query;

// Re-export commonly used types
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use notify::MessageSink;
