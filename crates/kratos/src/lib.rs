//! Identity provider (Ory Kratos) public API client
//!
//! Only the self-service login operations the login UI drives are covered:
//! session lookup, browser login flow creation, flow fetch and update, and
//! flow error lookup. Every call forwards the browser's cookies so Kratos
//! sees the same CSRF and session state the browser holds.

pub mod client;
pub mod types;

pub use client::KratosClient;
pub use types::{BrowserLoginFlowParams, Identity, Session, UpdateLoginFlowWithOidcMethod};
pub use upstream::{Result, UpstreamError, UpstreamResponse};
