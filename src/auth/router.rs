use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use serde::Deserialize;

use super::account::{self, PasswordResetForm, Registration};
use super::user::{AuthSession, Credentials};
use crate::error::{AppError, AppResult};
use crate::router::AppState;
use crate::routes::render;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(self::get::login).post(self::post::login))
        .route("/logout", get(self::get::logout))
        .route("/register", get(self::get::register).post(self::post::register))
        .route(
            "/auth/forgot-password",
            get(self::get::forgot_password).post(self::post::forgot_password),
        )
        .route(
            "/auth/reset-password",
            get(self::get::reset_password).post(self::post::reset_password),
        )
}

pub fn dashboard_path(restaurant_id: uuid::Uuid) -> String {
    format!("/restaurants/{restaurant_id}/dashboard")
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

mod post {
    use super::*;

    pub async fn login(
        State(state): State<AppState>,
        mut auth_session: AuthSession,
        Form(creds): Form<Credentials>,
    ) -> AppResult<Response> {
        let email = creds.email.clone();
        let next = creds.next.clone();

        let user = match auth_session.authenticate(creds).await? {
            Some(user) => user,
            None => {
                let page = render(
                    &state,
                    "login.html",
                    context! {
                        error => "Invalid email or password",
                        email => email,
                        next => next,
                    },
                )?;
                return Ok(page.into_response());
            }
        };
        auth_session.login(&user).await?;
        tracing::info!(user_id = %user.id, "logged in");

        let target = safe_next(next.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| dashboard_path(user.restaurant_id));
        Ok(Redirect::to(&target).into_response())
    }

    pub async fn register(
        State(state): State<AppState>,
        mut auth_session: AuthSession,
        Form(form): Form<Registration>,
    ) -> AppResult<Response> {
        match account::register(&state.db, &form).await {
            Ok(user) => {
                auth_session.login(&user).await?;
                Ok(Redirect::to(&dashboard_path(user.restaurant_id)).into_response())
            }
            Err(AppError::Validation(message)) => {
                let page = render(
                    &state,
                    "register.html",
                    context! {
                        error => message,
                        restaurant_name => form.restaurant_name,
                        email => form.email,
                    },
                )?;
                Ok(page.into_response())
            }
            Err(e) => Err(e),
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct ForgotForm {
        email: String,
    }

    pub async fn forgot_password(
        State(state): State<AppState>,
        Form(form): Form<ForgotForm>,
    ) -> AppResult<impl IntoResponse> {
        account::request_reset(&state.db, &state.mail, &state.config.app_base_url, &form.email)
            .await?;
        render(
            &state,
            "forgot_password.html",
            context! {
                notice => "If an account exists for that email, a reset link is on its way.",
            },
        )
    }

    pub async fn reset_password(
        State(state): State<AppState>,
        Form(form): Form<PasswordResetForm>,
    ) -> AppResult<Response> {
        match account::reset_password(&state.db, &form).await {
            Ok(()) => Ok(Redirect::to("/login?reset=1").into_response()),
            Err(AppError::Validation(message)) => {
                let page = render(
                    &state,
                    "reset_password.html",
                    context! { error => message, token => form.token },
                )?;
                Ok(page.into_response())
            }
            Err(e) => Err(e),
        }
    }
}

mod get {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct LoginQuery {
        next: Option<String>,
        reset: Option<String>,
    }

    pub async fn login(
        State(state): State<AppState>,
        auth_session: AuthSession,
        Query(LoginQuery { next, reset }): Query<LoginQuery>,
    ) -> AppResult<Response> {
        if let Some(user) = auth_session.user {
            return Ok(Redirect::to(&dashboard_path(user.restaurant_id)).into_response());
        }
        let notice = reset.map(|_| "Your password has been updated, please log in.");
        Ok(render(&state, "login.html", context! { next => next, notice => notice })?.into_response())
    }

    pub async fn logout(mut auth_session: AuthSession) -> AppResult<Redirect> {
        auth_session.logout().await?;
        Ok(Redirect::to("/login"))
    }

    pub async fn register(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
        render(&state, "register.html", context! {})
    }

    pub async fn forgot_password(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
        render(&state, "forgot_password.html", context! {})
    }

    #[derive(Debug, Deserialize)]
    pub struct TokenQuery {
        token: Option<String>,
    }

    pub async fn reset_password(
        State(state): State<AppState>,
        Query(TokenQuery { token }): Query<TokenQuery>,
    ) -> AppResult<impl IntoResponse> {
        let error = token
            .is_none()
            .then_some("This reset link is invalid");
        render(
            &state,
            "reset_password.html",
            context! { token => token, error => error },
        )
    }
}

/// `/` sends signed-in users to their dashboard and everyone else to login.
pub async fn index(auth_session: AuthSession) -> Redirect {
    match auth_session.user {
        Some(user) => Redirect::to(&dashboard_path(user.restaurant_id)),
        None => Redirect::to("/login"),
    }
}
