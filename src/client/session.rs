use super::error::{ClientError, Result};
use super::storage::{SessionStorage, REMEMBER_EMAIL, USER_DATA, USER_TOKEN};
use crate::models::{Profile, RegisterRequest, User};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Session {
    pub fn authenticated(user: User, token: String) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            token: Some(token),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.user_id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
    pub profile: Option<Profile>,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() || self.name.trim().is_empty() {
            return Err(ClientError::Validation(
                "Email, password, and name are required".into(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ClientError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        Ok(())
    }

    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            name: self.name.trim().to_string(),
            profile: self.profile.clone(),
        }
    }
}

/// Reads and writes the persisted session keys.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub async fn save(&self, user: &User, token: &str) -> Result<()> {
        self.storage.set(USER_TOKEN, token.to_string()).await?;
        self.save_user(user).await
    }

    pub async fn save_user(&self, user: &User) -> Result<()> {
        let json = serde_json::to_string(user).map_err(|err| ClientError::Storage(err.to_string()))?;
        self.storage.set(USER_DATA, json).await?;
        Ok(())
    }

    /// Session from the stored token and user. Anything missing or
    /// unreadable yields an unauthenticated session.
    pub async fn load(&self) -> Result<Session> {
        let token = self.storage.get(USER_TOKEN).await?;
        let user = self.storage.get(USER_DATA).await?;
        let (Some(token), Some(user)) = (token, user) else {
            return Ok(Session::default());
        };

        match serde_json::from_str::<User>(&user) {
            Ok(user) => Ok(Session::authenticated(user, token)),
            Err(err) => {
                warn!("stored user is unreadable, ignoring saved session: {err}");
                Ok(Session::default())
            }
        }
    }

    /// Drops token and user together. The remembered email stays.
    pub async fn clear(&self) -> Result<()> {
        self.storage.remove(USER_TOKEN).await?;
        self.storage.remove(USER_DATA).await?;
        Ok(())
    }

    pub async fn remember_email(&self, email: Option<&str>) -> Result<()> {
        match email {
            Some(email) => self.storage.set(REMEMBER_EMAIL, email.to_string()).await?,
            None => self.storage.remove(REMEMBER_EMAIL).await?,
        }
        Ok(())
    }

    pub async fn remembered_email(&self) -> Result<Option<String>> {
        Ok(self.storage.get(REMEMBER_EMAIL).await?)
    }
}
