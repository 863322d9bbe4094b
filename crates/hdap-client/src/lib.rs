//! # hdap-client
//!
//! Asynchronous client and session management for HDAP directory
//! services: a resource-oriented REST interface over a hierarchical
//! identity store, with entries addressed by path-like identifiers such
//! as `dc=com/dc=example/ou=People/uid=bjensen`.
//!
//! The [`client::DirectoryClient`] shapes and executes one HTTP request
//! per directory operation; the [`session::SessionManager`] owns an
//! authenticated identity and its bearer token, including scheduled and
//! lazy expiry.

#![deny(missing_docs)]

pub mod client;
pub mod models;
pub mod session;

pub use client::{DirectoryClient, DirectoryClientBuilder};
pub use models::{
    CountPolicy, PasswordParams, PatchKind, PatchOperation, QueryOptions, QueryPage, ReadParams,
    RemoveParams, RenameParams, Resource, SchemaParams, Scope, TokenGrant, WriteParams,
};
pub use session::{SessionManager, SessionSnapshot};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = hdap_core::Result<T>;
