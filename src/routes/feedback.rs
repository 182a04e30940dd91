use axum::{extract::State, response::IntoResponse};
use minijinja::context;

use super::{page, render};
use crate::context::RestaurantContext;
use crate::error::AppResult;
use crate::feedback;
use crate::router::AppState;

pub async fn feedbacks_page(
    State(state): State<AppState>,
    ctx: RestaurantContext,
) -> AppResult<impl IntoResponse> {
    let rows = feedback::list_feedback(&state.db, ctx.id()).await?;
    render(
        &state,
        "feedbacks.html",
        context! { feedbacks => rows, ..page(&ctx, "feedbacks") },
    )
}

pub async fn promotions_page(
    State(state): State<AppState>,
    ctx: RestaurantContext,
) -> AppResult<impl IntoResponse> {
    let rows = feedback::list_promotions(&state.db, ctx.id()).await?;
    render(
        &state,
        "promotions.html",
        context! { promotions => rows, ..page(&ctx, "promotions") },
    )
}
