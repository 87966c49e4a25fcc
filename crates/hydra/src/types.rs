//! Hydra wire types

use serde::{Deserialize, Serialize};

/// Body of `PUT /admin/oauth2/auth/requests/login/accept`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AcceptOAuth2LoginRequest {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_for: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acr: Option<String>,
}

impl AcceptOAuth2LoginRequest {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            remember: None,
            remember_for: None,
            acr: None,
        }
    }
}

/// Response of `GET /admin/oauth2/auth/requests/consent`.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2ConsentRequest {
    pub challenge: String,
    #[serde(default)]
    pub requested_scope: Vec<String>,
    #[serde(default)]
    pub requested_access_token_audience: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub skip: Option<bool>,
    #[serde(default)]
    pub login_challenge: Option<String>,
    #[serde(default)]
    pub client: Option<serde_json::Value>,
}

/// Session data attached to an accepted consent; `id_token` claims end up
/// in the ID token Hydra issues.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AcceptOAuth2ConsentRequestSession {
    pub id_token: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<serde_json::Value>,
}

/// Body of `PUT /admin/oauth2/auth/requests/consent/accept`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AcceptOAuth2ConsentRequest {
    pub grant_scope: Vec<String>,
    pub grant_access_token_audience: Vec<String>,
    pub session: AcceptOAuth2ConsentRequestSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember: Option<bool>,
}

/// Redirect returned by both accept operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OAuth2RedirectTo {
    pub redirect_to: String,
}
