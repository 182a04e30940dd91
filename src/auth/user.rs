use std::sync::Arc;

use async_session::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Deserialize;
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use super::password::verify_password;
use crate::entities::{prelude::*, user};

impl AuthUser for user::Model {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }

    // Changing the password invalidates every other session.
    fn session_auth_hash(&self) -> &[u8] {
        self.password_hash.as_bytes()
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("next", &self.next)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Seaorm(sea_orm::DbErr),

    #[error(transparent)]
    TaskJoin(#[from] task::JoinError),
}

#[derive(Debug, Clone)]
pub struct Backend {
    db: Arc<DatabaseConnection>,
}

impl Backend {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

/// Emails are matched case-insensitively and stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = user::Model;
    type Credentials = Credentials;
    type Error = BackendError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let user = User::find()
            .filter(user::Column::Email.eq(normalize_email(&creds.email)))
            .one(self.db.as_ref())
            .await
            .map_err(Self::Error::Seaorm)?;

        let Some(user) = user else {
            debug!("login attempt for unknown email");
            return Ok(None);
        };

        // Argon2 verification blocks for tens of milliseconds.
        task::spawn_blocking(move || {
            if verify_password(&creds.password, &user.password_hash) {
                Ok(Some(user))
            } else {
                Ok(None)
            }
        })
        .await?
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        User::find_by_id(*user_id)
            .one(self.db.as_ref())
            .await
            .map_err(Self::Error::Seaorm)
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;
