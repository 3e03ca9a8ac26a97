//! API client for the notekeep REST API.
//!
//! Every request carries the bearer token of the current session, read from
//! the session watch channel at call time.

use std::time::Duration;

use reqwest::{header, Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::auth::Session;
use crate::models::AuthPayload;

use super::{ApiError, Envelope};

// ============================================================================
// Constants
// ============================================================================

/// Default API origin
pub const DEFAULT_BASE_URL: &str = "https://keep.kevindupas.com/api";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Endpoint for email/password login
const LOGIN_ENDPOINT: &str = "login";

/// API client for notekeep.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: watch::Receiver<Session>,
}

impl ApiClient {
    /// Create a new API client reading its token from `session`
    pub fn new(base_url: &str, session: watch::Receiver<Session>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_client(client, base_url, session))
    }

    /// Create a client sharing an existing connection pool
    pub fn with_client(client: Client, base_url: &str, session: watch::Receiver<Session>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, for requests outside the API origin
    pub fn http(&self) -> &Client {
        &self.client
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let token = self.session.borrow().token().unwrap_or_default().to_string();

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        Ok(headers)
    }

    /// Issue a request and return the JSON payload, unwrapped from its `data`
    /// envelope when present.
    ///
    /// A body is only sent for POST, PUT and PATCH. Non-success statuses fail
    /// with `ApiError::Rejected`; an empty success body yields `Value::Null`.
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(endpoint);
        let sends_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(self.auth_headers()?);

        if let (true, Some(body)) = (sends_body, body) {
            // .json() sets Content-Type: application/json
            request = request.json(body);
        }

        debug!(%method, endpoint, has_body = sends_body && body.is_some(), "API request");

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!(%method, endpoint, status = status.as_u16(), "API response");

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::parse(endpoint, e))?;

        let envelope = Envelope::from_value(parsed);
        debug!(endpoint, wrapped = envelope.is_wrapped(), "Decoded response body");
        Ok(envelope.into_inner())
    }

    /// Like `request`, deserializing the unwrapped payload into `T`
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let value = self.request(endpoint, method, body).await?;
        serde_json::from_value(value).map_err(|e| ApiError::parse(endpoint, e))
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(endpoint, Method::GET, None).await
    }

    /// Exchange email and password for an access token and user
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });
        self.request_as(LOGIN_ENDPOINT, Method::POST, Some(&body))
            .await
    }
}
