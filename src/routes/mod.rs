pub mod api;
pub mod contact;
pub mod dashboard;
pub mod feedback;
pub mod floor;
pub mod live;
pub mod menus;
pub mod orders;
pub mod reports;
pub mod staff;

use axum::response::{Html, Redirect};
use minijinja::{Value, context};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

use crate::context::RestaurantContext;
use crate::error::{AppError, AppResult};
use crate::router::AppState;

pub fn render(state: &AppState, name: &str, ctx: Value) -> AppResult<Html<String>> {
    let tmpl = state.templates.get_template(name)?;
    Ok(Html(tmpl.render(ctx)?))
}

/// Values every restaurant page needs for the layout and sidebar.
pub fn page(ctx: &RestaurantContext, active: &str) -> Value {
    context! {
        restaurant => &ctx.restaurant,
        user => &ctx.user,
        base => ctx.base(),
        active => active,
    }
}

/// Inline messages carried across a post-redirect-get.
#[derive(Debug, Default, Deserialize)]
pub struct Flash {
    pub error: Option<String>,
    pub notice: Option<String>,
}

fn with_param(to: &str, key: &str, message: &str) -> String {
    let separator = if to.contains('?') { '&' } else { '?' };
    format!(
        "{to}{separator}{key}={}",
        utf8_percent_encode(message, NON_ALPHANUMERIC)
    )
}

/// Finishes a form post: success goes to `to`, a validation failure goes to
/// `to` with the message for the page to show. Anything else is a real error.
pub fn after_post<T>(to: &str, result: AppResult<T>) -> AppResult<Redirect> {
    match result {
        Ok(_) => Ok(Redirect::to(to)),
        Err(AppError::Validation(message)) => Ok(Redirect::to(&with_param(to, "error", &message))),
        Err(e) => Err(e),
    }
}

pub fn with_notice(to: &str, message: &str) -> Redirect {
    Redirect::to(&with_param(to, "notice", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    fn location(redirect: Redirect) -> String {
        let response = redirect.into_response();
        response.headers()["location"].to_str().unwrap().to_string()
    }

    #[test]
    fn validation_failures_come_back_as_messages() {
        let ok = after_post("/restaurants/x/staff", Ok(())).unwrap();
        assert_eq!(location(ok), "/restaurants/x/staff");

        let failed = after_post::<()>(
            "/restaurants/x/menus?menu_id=1",
            Err(AppError::validation("Item name is required")),
        )
        .unwrap();
        assert_eq!(
            location(failed),
            "/restaurants/x/menus?menu_id=1&error=Item%20name%20is%20required"
        );
    }

    #[test]
    fn other_errors_propagate() {
        let result = after_post::<()>("/x", Err(AppError::NotFound("menu")));
        assert!(matches!(result, Err(AppError::NotFound("menu"))));
    }
}
