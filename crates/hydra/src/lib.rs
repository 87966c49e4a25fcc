//! Authorization server (Ory Hydra) admin API client
//!
//! Covers the login and consent challenge operations the login UI resolves
//! on the user's behalf.

pub mod client;
pub mod types;

pub use client::HydraClient;
pub use types::{
    AcceptOAuth2ConsentRequest, AcceptOAuth2ConsentRequestSession, AcceptOAuth2LoginRequest,
    OAuth2ConsentRequest, OAuth2RedirectTo,
};
pub use upstream::{Result, UpstreamError, UpstreamResponse};
