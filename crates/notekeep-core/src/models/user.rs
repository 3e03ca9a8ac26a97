use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A signed-in account as persisted in the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl User {
    /// Name for display, falling back to the email when the name is blank
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// User record as it arrives from the server or from storage, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidUser {
    #[error("user id is missing")]
    MissingId,

    #[error("user email is missing")]
    MissingEmail,
}

impl TryFrom<UserPayload> for User {
    type Error = InvalidUser;

    fn try_from(payload: UserPayload) -> Result<Self, Self::Error> {
        let id = payload.id.ok_or(InvalidUser::MissingId)?;
        let email = payload
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(InvalidUser::MissingEmail)?;

        Ok(User {
            id,
            name: payload.name.unwrap_or_default(),
            email,
        })
    }
}

impl From<User> for UserPayload {
    fn from(user: User) -> Self {
        Self {
            id: Some(user.id),
            name: Some(user.name),
            email: Some(user.email),
        }
    }
}

/// Body returned by the password and QR login endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_with_all_fields_converts() {
        let payload = UserPayload {
            id: Some(7),
            name: Some("A".to_string()),
            email: Some("a@x.com".to_string()),
        };
        let user = User::try_from(payload).expect("valid payload");
        assert_eq!(user.id, 7);
        assert_eq!(user.name, "A");
        assert_eq!(user.email, "a@x.com");
    }

    #[test]
    fn test_payload_missing_fields_rejected() {
        let no_id = UserPayload {
            id: None,
            name: Some("A".to_string()),
            email: Some("a@x.com".to_string()),
        };
        assert_eq!(User::try_from(no_id), Err(InvalidUser::MissingId));

        let blank_email = UserPayload {
            id: Some(1),
            name: None,
            email: Some("  ".to_string()),
        };
        assert_eq!(User::try_from(blank_email), Err(InvalidUser::MissingEmail));
    }

    #[test]
    fn test_missing_name_defaults_to_empty() {
        let payload: UserPayload = serde_json::from_str(r#"{"id": 3, "email": "c@x.com"}"#)
            .expect("Failed to parse user payload");
        let user = User::try_from(payload).expect("valid payload");
        assert_eq!(user.name, "");
        assert_eq!(user.display_name(), "c@x.com");
    }

    #[test]
    fn test_auth_payload_parses_login_response() {
        let json = r#"{"access_token":"tok1","user":{"id":7,"name":"A","email":"a@x.com"}}"#;
        let payload: AuthPayload = serde_json::from_str(json).expect("Failed to parse auth payload");
        assert_eq!(payload.access_token.as_deref(), Some("tok1"));
        assert_eq!(payload.user.and_then(|u| u.id), Some(7));
        assert!(payload.message.is_none());
    }
}
