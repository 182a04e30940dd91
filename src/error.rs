use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sea_orm::{DbErr, RuntimeErr, sqlx};

use crate::auth::user::Backend;
use crate::mail::MailError;

/// Error type shared by every handler and service function.
///
/// Database and rendering failures are logged here, once, when they turn
/// into a response; business-rule errors pass through with their message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    QrCode(#[from] qrcode::types::QrError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("you do not have access to this restaurant")]
    Forbidden,

    #[error("login required")]
    Unauthorized { next: Option<String> },

    #[error("password hashing failed")]
    Password,

    #[error("session store failed: {0}")]
    Session(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// A unique-index refusal becomes `message` for the form; anything else
    /// stays a database error.
    pub fn unique_or(err: DbErr, message: impl Into<String>) -> Self {
        if is_unique_violation(&err) {
            AppError::validation(message)
        } else {
            AppError::Database(err)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Mail(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => e.is_unique_violation(),
        _ => false,
    }
}

impl From<axum_login::Error<Backend>> for AppError {
    fn from(e: axum_login::Error<Backend>) -> Self {
        AppError::Session(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Unauthorized { next } = &self {
            let target = match next {
                Some(next) => format!("/login?next={}", utf8_percent_encode(next, NON_ALPHANUMERIC)),
                None => "/login".to_string(),
            };
            return Redirect::to(&target).into_response();
        }

        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            (status, "Something went wrong, please try again.").into_response()
        } else {
            tracing::debug!(error = %self, "request rejected");
            (status, self.to_string()).into_response()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;

    use super::*;
    use sea_orm::sqlx::error::{DatabaseError, ErrorKind};

    /// Stands in for the driver's duplicate-key error.
    #[derive(Debug)]
    struct DuplicateKey;

    impl std::fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl StdError for DuplicateKey {}

    impl DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    pub(crate) fn duplicate_key() -> DbErr {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(Box::new(DuplicateKey))))
    }

    #[test]
    fn unique_violations_become_form_messages() {
        let err = AppError::unique_or(duplicate_key(), "Table 4 already exists");
        assert!(matches!(&err, AppError::Validation(m) if m == "Table 4 already exists"));

        let err = AppError::unique_or(DbErr::Custom("connection reset".into()), "unused");
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn unauthorized_redirects_to_login_with_next() {
        let response = AppError::Unauthorized {
            next: Some("/restaurants/abc/menus".into()),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()["location"].to_str().unwrap();
        assert_eq!(location, "/login?next=%2Frestaurants%2Fabc%2Fmenus");
    }

    #[test]
    fn database_errors_are_internal() {
        let err = AppError::from(sea_orm::DbErr::Custom("boom".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::NotFound("menu").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotFound("menu").to_string(), "menu not found");
    }
}
