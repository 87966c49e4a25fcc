//! Kratos wire types

use serde::{Deserialize, Serialize};

/// Response of `GET /sessions/whoami`.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub authenticator_assurance_level: Option<String>,
    pub identity: Identity,
}

/// Identity attached to a session.
///
/// Traits are schema-defined by the identity provider and kept untyped here;
/// the consent path expects a string-keyed object but must cope with
/// anything.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub traits: serde_json::Value,
}

/// Query parameters for `GET /self-service/login/browser`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserLoginFlowParams {
    pub aal: Option<String>,
    pub refresh: bool,
    pub return_to: Option<String>,
    pub login_challenge: Option<String>,
}

impl BrowserLoginFlowParams {
    /// Query pairs in wire order. Empty optional values are omitted.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(4);
        if let Some(aal) = self.aal.as_deref().filter(|v| !v.is_empty()) {
            query.push(("aal", aal.to_string()));
        }
        query.push(("refresh", self.refresh.to_string()));
        if let Some(return_to) = self.return_to.as_deref().filter(|v| !v.is_empty()) {
            query.push(("return_to", return_to.to_string()));
        }
        if let Some(challenge) = self.login_challenge.as_deref().filter(|v| !v.is_empty()) {
            query.push(("login_challenge", challenge.to_string()));
        }
        query
    }
}

/// Body of `POST /self-service/login` for the `oidc` method.
///
/// Unknown fields in the browser's submission are dropped on decode.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct UpdateLoginFlowWithOidcMethod {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_parameters: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transient_payload: Option<serde_json::Value>,
}
