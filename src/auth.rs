use log::info;

use crate::api::PitwallApi;
use crate::errors::PitwallError;
use crate::model::{AuthResponse, RegisterRequest, UserProfile};
use crate::storage::{KeyValueStore, TOKEN_KEY, USER_KEY, get_json, set_json};

const MIN_PASSWORD_LENGTH: usize = 8;

fn invalid(field: &str, reason: &str) -> PitwallError {
    PitwallError::InvalidUserInput {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl RegisterRequest {
    /// Same checks the registration form applies before anything is sent.
    pub fn validate(&self) -> Result<(), PitwallError> {
        if self.display_name.trim().is_empty() {
            return Err(invalid("display_name", "a display name is required"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(invalid("email", "a valid email address is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(invalid("password", "must be at least 8 characters"));
        }
        Ok(())
    }
}

/// A registered user as remembered on this device
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: Option<UserProfile>,
}

impl AuthSession {
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, PitwallError> {
        let Some(token) = store.get(TOKEN_KEY)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            token,
            user: get_json(store, USER_KEY)?,
        }))
    }
}

/// Create an account and remember the returned token and profile.
///
/// Nothing is stored unless the backend accepted the registration.
pub async fn register(
    api: &dyn PitwallApi,
    store: &mut dyn KeyValueStore,
    request: &RegisterRequest,
) -> Result<AuthResponse, PitwallError> {
    request.validate()?;
    let response = api.register(request).await?;

    store.set(TOKEN_KEY, &response.token)?;
    set_json(
        store,
        USER_KEY,
        &UserProfile {
            email: response.email.clone(),
            display_name: response.display_name.clone(),
        },
    )?;
    info!("Registered {} as {}", response.email, response.display_name);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, MockApi};
    use crate::storage::MemoryStore;

    fn request() -> RegisterRequest {
        RegisterRequest {
            email: "lando@example.com".to_string(),
            password: "papaya-2025".to_string(),
            display_name: "Lando".to_string(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(request().validate().is_ok());

        let short = RegisterRequest {
            password: "1234567".to_string(),
            ..request()
        };
        assert!(matches!(
            short.validate(),
            Err(PitwallError::InvalidUserInput { field, .. }) if field == "password"
        ));

        let no_email = RegisterRequest {
            email: "lando".to_string(),
            ..request()
        };
        assert!(no_email.validate().is_err());

        let no_name = RegisterRequest {
            display_name: "  ".to_string(),
            ..request()
        };
        assert!(no_name.validate().is_err());
    }

    #[tokio::test]
    async fn test_register_persists_token_and_profile() {
        let api = MockApi::new();
        let mut store = MemoryStore::new();

        let response = register(&api, &mut store, &request()).await.unwrap();
        assert_eq!(response.token, "mock-token-lando@example.com");

        let session = AuthSession::load(&store).unwrap().unwrap();
        assert_eq!(session.token, response.token);
        assert_eq!(
            session.user,
            Some(UserProfile {
                email: "lando@example.com".to_string(),
                display_name: "Lando".to_string(),
            })
        );
        let raw_user = store.get(USER_KEY).unwrap().unwrap();
        assert!(raw_user.contains("\"displayName\":\"Lando\""));
    }

    #[tokio::test]
    async fn test_rejected_registration_stores_nothing() {
        let api = MockApi::new();
        api.set_registration(Err("Email already registered".to_string()));
        let mut store = MemoryStore::new();

        let err = register(&api, &mut store, &request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(AuthSession::load(&store).unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let api = MockApi::new();
        api.fail(Endpoint::Register);
        let mut store = MemoryStore::new();

        let err = register(&api, &mut store, &request()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to connect to server. Please try again later."
        );
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_sent() {
        let api = MockApi::new();
        let mut store = MemoryStore::new();
        let bad = RegisterRequest {
            password: "short".to_string(),
            ..request()
        };
        assert!(register(&api, &mut store, &bad).await.is_err());
        assert_eq!(api.calls(Endpoint::Register), 0);
    }
}
