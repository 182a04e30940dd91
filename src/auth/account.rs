//! Account lifecycle outside of the login itself: sign-up and password reset.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tokio::task;
use tracing::{info, warn};
use uuid::Uuid;

use super::password::{check_new_password, hash_password, reset_token, token_digest};
use super::user::normalize_email;
use crate::entities::{
    password_reset, prelude::*, restaurant, restaurant::PricingTier, user, user::UserRole,
};
use crate::error::{AppError, AppResult};
use crate::mail::MailClient;

const RESET_TOKEN_TTL_MINUTES: i64 = 60;

fn reset_token_ttl() -> Duration {
    Duration::minutes(RESET_TOKEN_TTL_MINUTES)
}

#[derive(Clone, Deserialize)]
pub struct Registration {
    pub restaurant_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    fn validate(&self) -> AppResult<()> {
        if self.restaurant_name.trim().is_empty() {
            return Err(AppError::validation("Restaurant name is required"));
        }
        if !self.email.contains('@') {
            return Err(AppError::validation("Please enter a valid email address"));
        }
        check_new_password(&self.password, &self.confirm_password).map_err(AppError::validation)
    }
}

async fn hash_off_thread(password: String) -> AppResult<String> {
    task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|_| AppError::Password)?
        .map_err(|_| AppError::Password)
}

/// Creates the restaurant and its admin account together.
pub async fn register(db: &DatabaseConnection, form: &Registration) -> AppResult<user::Model> {
    form.validate()?;
    let email = normalize_email(&form.email);

    let taken = User::find()
        .filter(user::Column::Email.eq(email.clone()))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(AppError::validation("An account with this email already exists"));
    }

    let password_hash = hash_off_thread(form.password.clone()).await?;
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;
    let restaurant = restaurant::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(form.restaurant_name.trim().to_string()),
        address: Set(None),
        pricing_tier: Set(PricingTier::Basic),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        restaurant_id: Set(restaurant.id),
        role: Set(UserRole::Admin),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(restaurant_id = %restaurant.id, user_id = %user.id, "restaurant registered");
    Ok(user)
}

pub fn reset_link(app_base_url: &str, token: &str) -> String {
    format!(
        "{}/auth/reset-password?token={}",
        app_base_url.trim_end_matches('/'),
        token
    )
}

/// Stores a reset token for `email` and mails the link. Unknown addresses are
/// a silent no-op so the caller answers the same either way.
pub async fn request_reset(
    db: &DatabaseConnection,
    mail: &MailClient,
    app_base_url: &str,
    email: &str,
) -> AppResult<()> {
    let Some(user) = User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?
    else {
        info!("password reset requested for unknown email");
        return Ok(());
    };

    let token = reset_token();
    let now = Utc::now().naive_utc();
    // Only the newest link stays usable.
    let txn = db.begin().await?;
    PasswordReset::delete_many()
        .filter(password_reset::Column::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    password_reset::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        token_hash: Set(token_digest(&token)),
        expires_at: Set(now + reset_token_ttl()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    if let Err(e) = mail
        .send_password_reset(&user.email, &reset_link(app_base_url, &token))
        .await
    {
        warn!(user_id = %user.id, error = %e, "password reset email not sent");
    }
    Ok(())
}

#[derive(Clone, Deserialize)]
pub struct PasswordResetForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Sets a new password from a valid, unexpired token and consumes the token.
pub async fn reset_password(db: &DatabaseConnection, form: &PasswordResetForm) -> AppResult<()> {
    check_new_password(&form.password, &form.confirm_password).map_err(AppError::validation)?;

    let reset = PasswordReset::find()
        .filter(password_reset::Column::TokenHash.eq(token_digest(&form.token)))
        .one(db)
        .await?
        .ok_or_else(|| AppError::validation("This reset link is invalid"))?;
    if reset.expires_at < Utc::now().naive_utc() {
        return Err(AppError::validation("This reset link has expired"));
    }

    let user = User::find_by_id(reset.user_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let password_hash = hash_off_thread(form.password.clone()).await?;

    let txn = db.begin().await?;
    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now().naive_utc());
    let user = active.update(&txn).await?;
    PasswordReset::delete_many()
        .filter(password_reset::Column::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(user_id = %user.id, "password reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::statement_log;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn registration(password: &str, confirm: &str) -> Registration {
        Registration {
            restaurant_name: "Chez Test".into(),
            email: "owner@chez.test".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[tokio::test]
    async fn mismatched_passwords_stop_registration_early() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = register(&db, &registration("abcdefgh", "abcdefgx"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn failed_user_insert_aborts_registration() {
        let now = Utc::now().naive_utc();
        let restaurant = restaurant::Model {
            id: Uuid::new_v4(),
            name: "Chez Test".into(),
            address: None,
            pricing_tier: PricingTier::Basic,
            created_at: now,
            updated_at: now,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![restaurant]])
            .append_query_errors([sea_orm::DbErr::Custom("unique violation".into())])
            .into_connection();

        let result = register(&db, &registration("abcdefgh", "abcdefgh")).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let now = Utc::now().naive_utc();
        let stale = password_reset::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: token_digest("tok"),
            expires_at: now - Duration::minutes(5),
            created_at: now - reset_token_ttl(),
            updated_at: now - reset_token_ttl(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stale]])
            .into_connection();

        let err = reset_password(
            &db,
            &PasswordResetForm {
                token: "tok".into(),
                password: "newpassword".into(),
                confirm_password: "newpassword".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "This reset link has expired");
    }

    #[tokio::test]
    async fn unknown_email_reset_is_silent() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let mail = MailClient::new(None);

        request_reset(&db, &mail, "http://localhost:3000", "nobody@x.test")
            .await
            .unwrap();
        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("INSERT"));
    }

    #[tokio::test]
    async fn new_reset_request_replaces_earlier_tokens() {
        let now = Utc::now().naive_utc();
        let owner = user::Model {
            id: Uuid::new_v4(),
            email: "owner@chez.test".into(),
            password_hash: "unused".into(),
            restaurant_id: Uuid::new_v4(),
            role: UserRole::Admin,
            created_at: now,
            updated_at: now,
        };
        let stored = password_reset::Model {
            id: Uuid::new_v4(),
            user_id: owner.id,
            token_hash: token_digest("fresh"),
            expires_at: now + reset_token_ttl(),
            created_at: now,
            updated_at: now,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![owner]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .append_query_results([vec![stored]])
            .into_connection();

        request_reset(&db, &MailClient::new(None), "http://localhost:3000", "Owner@Chez.test")
            .await
            .unwrap();

        assert_eq!(
            statement_log(db),
            vec!["SELECT", "BEGIN", "DELETE password_resets", "INSERT password_resets", "COMMIT"]
        );
    }

    #[test]
    fn reset_links_point_at_the_app() {
        assert_eq!(
            reset_link("http://localhost:3000/", "abc"),
            "http://localhost:3000/auth/reset-password?token=abc"
        );
    }
}
