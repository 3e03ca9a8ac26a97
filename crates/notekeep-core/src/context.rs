//! Explicitly owned application context.
//!
//! The session manager lives in an `Arc` shared by the API client, the QR
//! flow and the route guard; nothing is global.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::auth::{AuthState, CredentialStore, SecretStore, SessionManager};
use crate::config::Config;
use crate::qr::QrLogin;
use crate::route::{Location, RouteGuard};

pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
}

impl AppContext {
    /// Build the context and restore the session from `store`
    pub fn start(
        config: Config,
        base_url: &str,
        store: Box<dyn SecretStore>,
    ) -> Result<Self, ApiError> {
        let session = Arc::new(SessionManager::new(CredentialStore::from_boxed(store)));
        let api = ApiClient::new(base_url, session.subscribe())?;

        let state = session.restore();
        debug!(?state, base_url = api.base_url(), "Application context started");

        Ok(Self {
            config,
            session,
            api,
        })
    }

    pub fn state(&self) -> AuthState {
        self.session.state()
    }

    /// A QR login flow sharing this context's connection pool and session
    pub fn qr_login(&self) -> QrLogin {
        QrLogin::new(self.api.http().clone(), Arc::clone(&self.session))
    }

    pub fn route_guard(&self, location: watch::Receiver<Location>) -> RouteGuard {
        RouteGuard::new(self.session.subscribe(), location)
    }

    /// Redirect the guard would issue for `location` right now
    pub fn redirect_for(&self, location: &Location) -> Option<Location> {
        crate::route::decide(&self.session.snapshot(), location)
    }
}
