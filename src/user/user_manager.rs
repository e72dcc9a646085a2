//! Registration, login and session lifecycle over the platform store.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::auth::{random_token, PasswordCredentials, SessionToken, SessionTokenValue};
use super::user_models::{NewUser, User};
use crate::store::{PlatformStore, RecordId};

const REFRESH_TOKEN_LEN: usize = 64;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9_]{3,32}$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

/// Everything a successful login or refresh hands back to the transport
/// layer: the user plus the freshly issued token pair.
pub struct LoginOutcome {
    pub user: User,
    pub access_token: SessionTokenValue,
    pub refresh_token: String,
}

pub struct UserManager {
    store: Arc<dyn PlatformStore>,
}

impl UserManager {
    pub fn new(store: Arc<dyn PlatformStore>) -> Self {
        Self { store }
    }

    pub fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        let username = request.username.trim().to_lowercase();
        // Emails are stored lowercased so the case-folded login lookup
        // always agrees with what registration wrote.
        let email = request.email.trim().to_lowercase();
        let full_name = request.full_name.trim().to_string();

        if username.is_empty()
            || email.is_empty()
            || full_name.is_empty()
            || request.password.trim().is_empty()
        {
            return Err(AuthError::InvalidInput(
                "All fields must be provided".to_string(),
            ));
        }
        if !USERNAME_RE.is_match(&username) {
            return Err(AuthError::InvalidInput(format!(
                "Invalid username {:?}: use 3-32 lowercase letters, digits or underscores",
                username
            )));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(AuthError::InvalidInput(format!(
                "Invalid email address {:?}",
                email
            )));
        }

        if self
            .store
            .find_by_username_or_email(&username, &email)?
            .is_some()
        {
            return Err(AuthError::Conflict(
                "This username or email already exists".to_string(),
            ));
        }

        let user_id = RecordId::generate();
        let credentials = PasswordCredentials::from_plain(user_id.clone(), &request.password)
            .map_err(AuthError::Internal)?;

        let user = self.store.create_user(NewUser {
            id: user_id,
            username,
            email,
            full_name,
            avatar_url: request.avatar_url,
            cover_image_url: request.cover_image_url,
            credentials,
        })?;
        Ok(user)
    }

    /// Verifies credentials for a username-or-email identifier and issues a
    /// fresh access/refresh token pair.
    pub fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let identifier = identifier.trim().to_lowercase();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Username or email and password are required".to_string(),
            ));
        }

        let user = self
            .store
            .find_by_username_or_email(&identifier, &identifier)?
            .ok_or_else(|| AuthError::NotFound("User does not exist".to_string()))?;

        let credentials = self
            .store
            .get_credentials(&user.id)?
            .ok_or_else(|| AuthError::Unauthorized("Invalid credentials".to_string()))?;
        match credentials.verify(password) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Password verification failed for user {}", user.username);
                return Err(AuthError::Unauthorized("Invalid credentials".to_string()));
            }
            Err(err) => return Err(AuthError::Internal(err)),
        }

        self.issue_tokens(user)
    }

    /// Rotates the token pair for the bearer of a valid refresh token.
    pub fn refresh_session(&self, refresh_token: &str) -> Result<LoginOutcome, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput(
                "Refresh token is required".to_string(),
            ));
        }
        let user = self
            .store
            .find_user_by_refresh_token(refresh_token)?
            .ok_or_else(|| {
                AuthError::Unauthorized("Refresh token is expired or already used".to_string())
            })?;

        self.issue_tokens(user)
    }

    pub fn logout(
        &self,
        user_id: &RecordId,
        token_value: &SessionTokenValue,
    ) -> Result<(), AuthError> {
        self.store.delete_session_token(token_value)?;
        self.store.set_refresh_token(user_id, None)?;
        Ok(())
    }

    pub fn change_password(
        &self,
        user_id: &RecordId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if old_password.is_empty() || new_password.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "Old password and new password are required".to_string(),
            ));
        }

        let credentials = self
            .store
            .get_credentials(user_id)?
            .ok_or_else(|| AuthError::NotFound("User does not exist".to_string()))?;
        match credentials.verify(old_password) {
            Ok(true) => {}
            Ok(false) => {
                return Err(AuthError::Unauthorized("Password is not valid".to_string()))
            }
            Err(err) => return Err(AuthError::Internal(err)),
        }

        let new_credentials = PasswordCredentials::from_plain(user_id.clone(), new_password)
            .map_err(AuthError::Internal)?;
        self.store.set_password(&new_credentials)?;
        Ok(())
    }

    pub fn update_profile(
        &self,
        user_id: &RecordId,
        full_name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let full_name = full_name.trim();
        // Lowercased for the same reason as in register.
        let email = email.trim().to_lowercase();
        if full_name.is_empty() || email.is_empty() {
            return Err(AuthError::InvalidInput(
                "Full name and email are required".to_string(),
            ));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(AuthError::InvalidInput(format!(
                "Invalid email address {:?}",
                email
            )));
        }

        self.store
            .update_profile(user_id, full_name, &email)?
            .ok_or_else(|| AuthError::NotFound("User does not exist".to_string()))
    }

    /// Resolves an access-token value into the user it belongs to. Returns
    /// Ok(None) for unknown tokens; the transport layer turns that into a
    /// 401.
    pub fn session(&self, token_value: &SessionTokenValue) -> anyhow::Result<Option<(User, SessionToken)>> {
        let token = match self.store.get_session_token(token_value)? {
            Some(token) => token,
            None => return Ok(None),
        };

        // Not critical for authentication, so a failure only logs.
        if let Err(err) = self.store.touch_session_token(token_value) {
            debug!("Failed to update session token last_used: {}", err);
        }

        let user = self.store.get_user(&token.user_id)?;
        Ok(user.map(|user| (user, token)))
    }

    fn issue_tokens(&self, user: User) -> Result<LoginOutcome, AuthError> {
        let access_token = SessionTokenValue::generate();
        self.store.add_session_token(&user.id, &access_token)?;

        let refresh_token = random_token(REFRESH_TOKEN_LEN);
        self.store
            .set_refresh_token(&user.id, Some(&refresh_token))?;

        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
        })
    }
}
