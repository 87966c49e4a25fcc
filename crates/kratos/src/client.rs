//! Kratos frontend API calls

use reqwest::header::{ACCEPT, COOKIE};
use tracing::instrument;
use upstream::{Result, UpstreamResponse, execute};

use crate::types::{BrowserLoginFlowParams, Session, UpdateLoginFlowWithOidcMethod};

const TO_SESSION: &str = "FrontendApi.ToSession";
const CREATE_BROWSER_LOGIN_FLOW: &str = "FrontendApi.CreateBrowserLoginFlow";
const GET_LOGIN_FLOW: &str = "FrontendApi.GetLoginFlow";
const UPDATE_LOGIN_FLOW: &str = "FrontendApi.UpdateLoginFlow";
const GET_FLOW_ERROR: &str = "FrontendApi.GetFlowError";

/// Client for the Kratos public API.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections and
/// is shared by every request the service handles.
#[derive(Debug, Clone)]
pub struct KratosClient {
    http: reqwest::Client,
    public_url: String,
}

impl KratosClient {
    pub fn new(http: reqwest::Client, public_url: impl Into<String>) -> Self {
        Self {
            http,
            public_url: public_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), path)
    }

    fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::RequestBuilder {
        with_cookie(self.http.get(self.url(path)), cookie).header(ACCEPT, "application/json")
    }

    /// `GET /sessions/whoami`. A missing or invalid session surfaces as a
    /// 401 status error; interpreting that is the caller's job.
    #[instrument(skip_all)]
    pub async fn to_session(&self, cookie: Option<&str>) -> Result<Session> {
        let response = execute(TO_SESSION, self.get("/sessions/whoami", cookie)).await?;
        response.json(TO_SESSION)
    }

    /// `GET /self-service/login/browser`, asking for the JSON flow document
    /// instead of a redirect.
    #[instrument(skip_all, fields(refresh = params.refresh))]
    pub async fn create_browser_login_flow(
        &self,
        params: &BrowserLoginFlowParams,
        cookie: Option<&str>,
    ) -> Result<UpstreamResponse> {
        let request = self
            .get("/self-service/login/browser", cookie)
            .query(&params.to_query());
        execute(CREATE_BROWSER_LOGIN_FLOW, request).await
    }

    /// `GET /self-service/login/flows?id=`
    #[instrument(skip_all, fields(flow_id = id))]
    pub async fn get_login_flow(&self, id: &str, cookie: Option<&str>) -> Result<UpstreamResponse> {
        let request = self
            .get("/self-service/login/flows", cookie)
            .query(&[("id", id)]);
        execute(GET_LOGIN_FLOW, request).await
    }

    /// `POST /self-service/login?flow=`
    #[instrument(skip_all, fields(flow_id = flow, method = %body.method))]
    pub async fn update_login_flow(
        &self,
        flow: &str,
        body: &UpdateLoginFlowWithOidcMethod,
        cookie: Option<&str>,
    ) -> Result<UpstreamResponse> {
        let request = with_cookie(self.http.post(self.url("/self-service/login")), cookie)
            .header(ACCEPT, "application/json")
            .query(&[("flow", flow)])
            .json(body);
        execute(UPDATE_LOGIN_FLOW, request).await
    }

    /// `GET /self-service/errors?id=`
    #[instrument(skip_all, fields(error_id = id))]
    pub async fn get_flow_error(&self, id: &str) -> Result<UpstreamResponse> {
        let request = self.get("/self-service/errors", None).query(&[("id", id)]);
        execute(GET_FLOW_ERROR, request).await
    }
}

fn with_cookie(request: reqwest::RequestBuilder, cookie: Option<&str>) -> reqwest::RequestBuilder {
    match cookie.filter(|c| !c.is_empty()) {
        Some(cookie) => request.header(COOKIE, cookie),
        None => request,
    }
}
