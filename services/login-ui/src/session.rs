//! Session resolution against the identity provider

use kratos::{Identity, KratosClient};
use tracing::{debug, instrument};
use upstream::{Classification, UpstreamError};

/// Outcome of a session check.
#[derive(Debug, Clone)]
pub enum SessionCheck {
    Authenticated(Identity),
    Unauthenticated,
}

/// Ask Kratos who owns the session in `cookie`.
///
/// A 401 is the normal "no session" answer and maps to `Unauthenticated`.
/// Any other failure is returned for the caller to decide on.
#[instrument(skip_all)]
pub async fn resolve(
    kratos: &KratosClient,
    cookie: Option<&str>,
) -> Result<SessionCheck, UpstreamError> {
    match kratos.to_session(cookie).await {
        Ok(session) => {
            debug!(identity_id = %session.identity.id, "session resolved");
            Ok(SessionCheck::Authenticated(session.identity))
        }
        Err(e) if e.classification() == Some(Classification::Unauthorized) => {
            debug!("no active session");
            Ok(SessionCheck::Unauthenticated)
        }
        Err(e) => Err(e),
    }
}
