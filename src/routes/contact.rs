use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use minijinja::context;
use serde::Deserialize;

use super::{Flash, after_post, page, render, with_notice};
use crate::context::RestaurantContext;
use crate::error::{AppError, AppResult};
use crate::mail::ContactMessage;
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    name: String,
    email: String,
    #[serde(default)]
    message: String,
}

impl ContactForm {
    fn into_message(self, restaurant_name: &str) -> AppResult<ContactMessage> {
        let name = self.name.trim();
        let email = self.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(AppError::validation("Name and email are required"));
        }
        if !email.contains('@') {
            return Err(AppError::validation("Please enter a valid email address"));
        }
        Ok(ContactMessage {
            restaurant_name: restaurant_name.to_string(),
            from_name: name.to_string(),
            from_email: email.to_string(),
            message: self.message.trim().to_string(),
        })
    }
}

pub async fn contact_page(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Query(flash): Query<Flash>,
) -> AppResult<impl IntoResponse> {
    render(
        &state,
        "contact.html",
        context! {
            error => flash.error,
            notice => flash.notice,
            ..page(&ctx, "contact")
        },
    )
}

pub async fn send_contact(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Form(form): Form<ContactForm>,
) -> AppResult<Redirect> {
    let back = format!("{}/contact", ctx.base());
    let message = match form.into_message(&ctx.restaurant.name) {
        Ok(message) => message,
        Err(e) => return after_post(&back, Err::<(), _>(e)),
    };

    match state.mail.send_contact(&message).await {
        Ok(()) => Ok(with_notice(&back, "Message sent successfully!")),
        Err(e) => {
            tracing::error!(error = %e, restaurant_id = %ctx.id(), "contact message failed");
            after_post(
                &back,
                Err::<(), _>(AppError::validation("Failed to send message, please try again.")),
            )
        }
    }
}
