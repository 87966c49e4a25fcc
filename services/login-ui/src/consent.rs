//! Consent orchestration
//!
//! ```text
//! ChallengeReceived -> SessionValidated -> ConsentFetched -> ClaimsBuilt -> ConsentAccepted
//! ```
//!
//! The login UI grants every requested scope and audience; what the relying
//! party actually learns about the user is limited by the claims mapping.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use hydra::{
    AcceptOAuth2ConsentRequest, AcceptOAuth2ConsentRequestSession, HydraClient,
    OAuth2ConsentRequest,
};
use kratos::{Identity, KratosClient};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::claims;
use crate::error::{Error, Result};
use crate::login::cookie_header;
use crate::session::{self, SessionCheck};

/// Query of `GET /api/consent`
#[derive(Debug, Default, Deserialize)]
pub struct ConsentQuery {
    pub consent_challenge: Option<String>,
}

/// Accept-consent payload: grant exactly what was requested and attach the
/// scope-filtered identity claims to the ID token.
pub fn build_accept_request(
    identity: &Identity,
    consent: &OAuth2ConsentRequest,
) -> AcceptOAuth2ConsentRequest {
    AcceptOAuth2ConsentRequest {
        grant_scope: consent.requested_scope.clone(),
        grant_access_token_audience: consent.requested_access_token_audience.clone(),
        session: AcceptOAuth2ConsentRequestSession {
            id_token: claims::map_claims(&identity.traits, &consent.requested_scope),
            access_token: None,
        },
        remember: None,
    }
}

/// Accept the consent challenge for the session's identity and return
/// Hydra's redirect as JSON.
#[instrument(skip_all)]
pub async fn accept(
    kratos: &KratosClient,
    hydra: &HydraClient,
    consent_challenge: &str,
    jar: &CookieJar,
) -> Result<Response> {
    let cookie = cookie_header(jar);
    let identity = match session::resolve(kratos, cookie.as_deref()).await {
        Ok(SessionCheck::Authenticated(identity)) => identity,
        Ok(SessionCheck::Unauthenticated) => {
            warn!("consent requested without an authenticated session");
            return Err(Error::AuthenticationRequired);
        }
        Err(e) => {
            error!(error = %e, "session check failed");
            return Err(e.into());
        }
    };

    let consent = hydra
        .get_consent_request(consent_challenge)
        .await
        .inspect_err(|e| error!(error = %e, "fetching consent request failed"))?;

    let body = build_accept_request(&identity, &consent);
    info!(
        identity_id = %identity.id,
        scopes = ?body.grant_scope,
        claims = body.session.id_token.len(),
        "accepting consent"
    );

    let accepted = hydra
        .accept_consent_request(consent_challenge, &body)
        .await
        .inspect_err(|e| error!(error = %e, "accepting consent request failed"))?;

    let json = serde_json::to_vec(&accepted).map_err(|e| Error::Serialization {
        what: "accept consent response",
        message: e.to_string(),
    })?;

    Ok((StatusCode::OK, [(CONTENT_TYPE, "application/json")], json).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(traits: serde_json::Value) -> Identity {
        Identity {
            id: "u1".into(),
            schema_id: Some("default".into()),
            traits,
        }
    }

    fn consent(scopes: &[&str], audience: &[&str]) -> OAuth2ConsentRequest {
        serde_json::from_value(json!({
            "challenge": "cc1",
            "requested_scope": scopes,
            "requested_access_token_audience": audience,
        }))
        .unwrap()
    }

    #[test]
    fn payload_grants_request_unchanged_and_filters_claims() {
        let body = build_accept_request(
            &identity(json!({"sub": "u1", "email": "e@x.com", "phone_number": "+1"})),
            &consent(&["openid", "email"], &["api", "billing"]),
        );

        assert_eq!(body.grant_scope, vec!["openid", "email"]);
        assert_eq!(body.grant_access_token_audience, vec!["api", "billing"]);
        assert_eq!(
            serde_json::Value::Object(body.session.id_token),
            json!({"sub": "u1", "email": "e@x.com"})
        );
    }

    #[test]
    fn payload_with_unshaped_traits_has_empty_id_token() {
        let body = build_accept_request(
            &identity(json!("not-an-object")),
            &consent(&["openid", "email"], &[]),
        );
        assert_eq!(body.grant_scope, vec!["openid", "email"]);
        assert!(body.session.id_token.is_empty());
    }
}
