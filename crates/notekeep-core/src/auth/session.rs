use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::{User, UserPayload};

use super::{AuthError, CredentialStore, StoredCredentials};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Restoring,
    Unauthenticated,
    Authenticated,
}

/// Snapshot of the current session. Token and user are always set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user: Option<User>,
    is_loading: bool,
}

impl Session {
    /// Initial state before storage has been read
    pub fn restoring() -> Self {
        Self {
            token: None,
            user: None,
            is_loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            token: None,
            user: None,
            is_loading: false,
        }
    }

    pub fn signed_in(token: String, user: User) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            is_loading: false,
        }
    }

    /// Get the bearer token if signed in
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn state(&self) -> AuthState {
        if self.is_loading {
            AuthState::Restoring
        } else if self.token.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }
}

/// Owns the session and its persisted mirror. Every change is published to
/// subscribers through a watch channel.
pub struct SessionManager {
    store: CredentialStore,
    state: watch::Sender<Session>,
}

impl SessionManager {
    pub fn new(store: CredentialStore) -> Self {
        let (state, _) = watch::channel(Session::restoring());
        Self { store, state }
    }

    /// Derive the session from storage. Leaves the restoring state in every outcome.
    pub fn restore(&self) -> AuthState {
        let session = match self.store.load() {
            Ok(StoredCredentials {
                token: Some(token),
                user: Some(user),
            }) => {
                debug!(user_id = user.id, "Restored session from storage");
                Session::signed_in(token, user)
            }
            Ok(StoredCredentials {
                token: None,
                user: None,
            }) => {
                debug!("No stored session");
                Session::signed_out()
            }
            Ok(stored) => {
                warn!(
                    has_token = stored.token.is_some(),
                    has_user = stored.user.is_some(),
                    "Stored session is incomplete, signing out"
                );
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear incomplete session");
                }
                Session::signed_out()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                Session::signed_out()
            }
        };

        let state = session.state();
        self.state.send_replace(session);
        state
    }

    /// Sign in with a token and the user payload returned by the server.
    ///
    /// Input is validated before anything is written; a rejected call leaves
    /// both storage and the session untouched.
    pub fn sign_in(&self, token: &str, user: UserPayload) -> Result<User, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidCredential("token is missing".to_string()));
        }
        let user = User::try_from(user)?;

        self.commit(token, user.clone())?;
        Ok(user)
    }

    /// Sign in with an already validated user
    pub fn sign_in_user(&self, token: &str, user: User) -> Result<(), AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidCredential("token is missing".to_string()));
        }
        self.commit(token, user)
    }

    fn commit(&self, token: &str, user: User) -> Result<(), AuthError> {
        self.store.save(token, &user)?;
        info!(user_id = user.id, "Signed in");
        self.state
            .send_replace(Session::signed_in(token.to_string(), user));
        Ok(())
    }

    /// Sign out. The in-memory session is cleared even when storage fails;
    /// the storage error is still returned.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.store.clear();
        let was_signed_in = self.state.borrow().is_authenticated();
        self.state.send_replace(Session::signed_out());

        match result {
            Ok(()) => {
                if was_signed_in {
                    info!("Signed out");
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear stored credentials during sign-out");
                Err(e.into())
            }
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().state()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    /// Receive every future session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }
}
