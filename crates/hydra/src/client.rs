//! Hydra OAuth2 admin API calls

use reqwest::header::ACCEPT;
use tracing::instrument;
use upstream::{Result, UpstreamResponse, execute};

use crate::types::{
    AcceptOAuth2ConsentRequest, AcceptOAuth2LoginRequest, OAuth2ConsentRequest, OAuth2RedirectTo,
};

const ACCEPT_LOGIN_REQUEST: &str = "OAuth2Api.AcceptOAuth2LoginRequest";
const GET_CONSENT_REQUEST: &str = "OAuth2Api.GetOAuth2ConsentRequest";
const ACCEPT_CONSENT_REQUEST: &str = "OAuth2Api.AcceptOAuth2ConsentRequest";

/// Client for the Hydra admin API.
#[derive(Debug, Clone)]
pub struct HydraClient {
    http: reqwest::Client,
    admin_url: String,
}

impl HydraClient {
    pub fn new(http: reqwest::Client, admin_url: impl Into<String>) -> Self {
        Self {
            http,
            admin_url: admin_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.admin_url.trim_end_matches('/'), path)
    }

    /// Accept a login challenge for `body.subject`. The raw response is
    /// returned so the redirect can be forwarded to the browser as-is.
    #[instrument(skip_all, fields(subject = %body.subject))]
    pub async fn accept_login_request(
        &self,
        login_challenge: &str,
        body: &AcceptOAuth2LoginRequest,
    ) -> Result<UpstreamResponse> {
        let request = self
            .http
            .put(self.url("/admin/oauth2/auth/requests/login/accept"))
            .header(ACCEPT, "application/json")
            .query(&[("login_challenge", login_challenge)])
            .json(body);
        execute(ACCEPT_LOGIN_REQUEST, request).await
    }

    #[instrument(skip_all)]
    pub async fn get_consent_request(
        &self,
        consent_challenge: &str,
    ) -> Result<OAuth2ConsentRequest> {
        let request = self
            .http
            .get(self.url("/admin/oauth2/auth/requests/consent"))
            .header(ACCEPT, "application/json")
            .query(&[("consent_challenge", consent_challenge)]);
        execute(GET_CONSENT_REQUEST, request)
            .await?
            .json(GET_CONSENT_REQUEST)
    }

    #[instrument(skip_all, fields(scopes = body.grant_scope.len()))]
    pub async fn accept_consent_request(
        &self,
        consent_challenge: &str,
        body: &AcceptOAuth2ConsentRequest,
    ) -> Result<OAuth2RedirectTo> {
        let request = self
            .http
            .put(self.url("/admin/oauth2/auth/requests/consent/accept"))
            .header(ACCEPT, "application/json")
            .query(&[("consent_challenge", consent_challenge)])
            .json(body);
        execute(ACCEPT_CONSENT_REQUEST, request)
            .await?
            .json(ACCEPT_CONSENT_REQUEST)
    }
}
