//! Password sign-in and bearer sessions for the admin screens.

use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("admin sign-in is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub email: String,
}

/// Who is making the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub authenticated: bool,
    pub user: Option<AuthUser>,
}

impl AuthState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    fn signed_in(user: AuthUser) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub access_token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

/// In-memory token table. Tokens live until sign-out or restart.
#[derive(Clone)]
pub struct SessionStore {
    credentials: Option<Arc<AdminCredentials>>,
    sessions: Arc<RwLock<HashMap<String, AuthUser>>>,
}

impl SessionStore {
    pub fn new(credentials: Option<AdminCredentials>) -> Self {
        Self {
            credentials: credentials.map(Arc::new),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(SessionError::NotConfigured)?;
        if !credentials.email.eq_ignore_ascii_case(email.trim()) || credentials.password != password
        {
            return Err(SessionError::InvalidCredentials);
        }

        let user = AuthUser {
            email: credentials.email.clone(),
        };
        let access_token = Uuid::new_v4().simple().to_string();
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(access_token.clone(), user.clone());
        tracing::info!("admin {} signed in", user.email);

        Ok(Session { access_token, user })
    }

    /// Revoke `token`. Returns whether it was an active session.
    pub fn sign_out(&self, token: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(token)
            .is_some()
    }

    pub fn resolve(&self, token: Option<&str>) -> AuthState {
        let Some(token) = token else {
            return AuthState::anonymous();
        };
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(token)
            .cloned()
            .map(AuthState::signed_in)
            .unwrap_or_default()
    }
}
