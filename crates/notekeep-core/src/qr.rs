//! Scan-to-authenticate: a scanned login URL is fetched and its token and
//! user are handed to the session manager.
//!
//! At most one scan is processed at a time; scans arriving while another is
//! in flight are ignored.

use std::sync::Arc;

use reqwest::{header, Client, Url};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::auth::{AuthError, SessionManager};
use crate::models::{AuthPayload, User};

/// Path marker every QR login URL carries
pub const QR_LOGIN_MARKER: &str = "/auth/qr-login";

const DEFAULT_REJECTION: &str = "Authentication failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrState {
    Idle,
    Scanned,
    Validating,
    Authenticating,
    Done,
}

impl QrState {
    fn accepts_scan(self) -> bool {
        matches!(self, QrState::Idle | QrState::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Another scan was still being processed
    Ignored,
    SignedIn(User),
}

#[derive(Error, Debug)]
pub enum QrError {
    #[error("Invalid QR code")]
    InvalidCode,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    SignIn(#[from] AuthError),

    #[error("Sign-in task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl QrError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            QrError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub struct QrLogin {
    client: Client,
    session: Arc<SessionManager>,
    state: watch::Sender<QrState>,
}

impl QrLogin {
    pub fn new(client: Client, session: Arc<SessionManager>) -> Self {
        let (state, _) = watch::channel(QrState::Idle);
        Self {
            client,
            session,
            state,
        }
    }

    pub fn state(&self) -> QrState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<QrState> {
        self.state.subscribe()
    }

    /// Process one scanned text.
    ///
    /// On any failure, or if this future is dropped before finishing, the flow
    /// returns to `Idle` so scanning is re-enabled.
    pub async fn handle_scan(&self, text: &str) -> Result<ScanOutcome, QrError> {
        let claimed = self.state.send_if_modified(|state| {
            if state.accepts_scan() {
                *state = QrState::Scanned;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug!("Scan ignored, another scan is in progress");
            return Ok(ScanOutcome::Ignored);
        }
        let claim = ScanClaim::new(&self.state);

        match self.authenticate(text).await {
            Ok(user) => {
                claim.finish();
                info!(user_id = user.id, "QR login succeeded");
                Ok(ScanOutcome::SignedIn(user))
            }
            Err(e) => {
                drop(claim);
                warn!(error = %e, "QR login rejected");
                Err(e)
            }
        }
    }

    async fn authenticate(&self, text: &str) -> Result<User, QrError> {
        let url = parse_login_url(text)?;

        self.state.send_replace(QrState::Validating);
        let payload = self.fetch_login(url).await?;

        self.state.send_replace(QrState::Authenticating);
        let token = payload.access_token.unwrap_or_default();
        let user = payload.user.unwrap_or_default();

        // Credential writes may hit the filesystem
        let session = Arc::clone(&self.session);
        let user = tokio::task::spawn_blocking(move || session.sign_in(&token, user)).await??;
        Ok(user)
    }

    /// GET the login URL. The body is parsed before the status is checked.
    async fn fetch_login(&self, url: Url) -> Result<AuthPayload, QrError> {
        let endpoint = url.path().to_string();
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;
        debug!(status = status.as_u16(), "QR login response");

        let payload: AuthPayload =
            serde_json::from_str(&text).map_err(|e| ApiError::parse(&endpoint, e))?;

        if !status.is_success() {
            let message = payload
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
            return Err(ApiError::Rejected { status, message }.into());
        }

        Ok(payload)
    }
}

/// Held while a scan is in flight. Unless finished, dropping it puts the
/// flow back to `Idle`, which also covers a cancelled scan future.
struct ScanClaim<'a> {
    state: &'a watch::Sender<QrState>,
    finished: bool,
}

impl<'a> ScanClaim<'a> {
    fn new(state: &'a watch::Sender<QrState>) -> Self {
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.state.send_replace(QrState::Done);
        self.finished = true;
    }
}

impl Drop for ScanClaim<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.state.send_if_modified(|state| {
            if *state == QrState::Idle {
                false
            } else {
                *state = QrState::Idle;
                true
            }
        });
    }
}

/// Accept only http(s) URLs whose path carries the login marker
fn parse_login_url(text: &str) -> Result<Url, QrError> {
    let url = Url::parse(text.trim()).map_err(|_| QrError::InvalidCode)?;
    let is_http = matches!(url.scheme(), "http" | "https");
    if !is_http || !url.path().contains(QR_LOGIN_MARKER) {
        return Err(QrError::InvalidCode);
    }
    Ok(url)
}
