//! Route guard: keeps the user in the auth area while signed out and out of
//! it while signed in.
//!
//! `decide` is the pure rule. `RouteGuard` re-runs it whenever the session or
//! the navigation location changes and hands any redirect to a `Navigator`.

use std::fmt;

use tokio::sync::watch;
use tracing::debug;

use crate::auth::Session;

/// First path segment of every location in the auth area
pub const AUTH_GROUP: &str = "(auth)";

const LOGIN_PATH: &str = "/(auth)/login";
const HOME_PATH: &str = "/";

/// A navigation location such as `/(auth)/login` or `/notes/3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(String);

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        if path.starts_with('/') {
            Self(path)
        } else {
            Self(format!("/{}", path))
        }
    }

    pub fn login() -> Self {
        Self(LOGIN_PATH.to_string())
    }

    pub fn home() -> Self {
        Self(HOME_PATH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn in_auth_area(&self) -> bool {
        self.segments().next() == Some(AUTH_GROUP)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where to send the user, if anywhere.
///
/// Nothing happens while the session is still restoring. Never returns the
/// current location.
pub fn decide(session: &Session, location: &Location) -> Option<Location> {
    if session.is_loading() {
        return None;
    }

    let target = match (session.token().is_some(), location.in_auth_area()) {
        (false, false) => Location::login(),
        (true, true) => Location::home(),
        _ => return None,
    };

    (target != *location).then_some(target)
}

/// Something that can replace the current location
pub trait Navigator {
    fn replace(&mut self, target: &Location);
}

/// Replacing publishes the new location to everyone watching it
impl Navigator for watch::Sender<Location> {
    fn replace(&mut self, target: &Location) {
        self.send_if_modified(|current| {
            if current == target {
                false
            } else {
                *current = target.clone();
                true
            }
        });
    }
}

pub struct RouteGuard {
    session: watch::Receiver<Session>,
    location: watch::Receiver<Location>,
}

impl RouteGuard {
    pub fn new(session: watch::Receiver<Session>, location: watch::Receiver<Location>) -> Self {
        Self { session, location }
    }

    /// Apply the rule to the latest session and location
    pub fn evaluate(&mut self) -> Option<Location> {
        let session = self.session.borrow_and_update().clone();
        let location = self.location.borrow_and_update().clone();
        decide(&session, &location)
    }

    /// Redirect on every session or location change until either side closes.
    pub async fn run<N: Navigator>(mut self, mut navigator: N) {
        loop {
            if let Some(target) = self.evaluate() {
                debug!(%target, "Route guard redirect");
                navigator.replace(&target);
            }

            tokio::select! {
                changed = self.session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = self.location.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Route guard stopped");
    }
}
