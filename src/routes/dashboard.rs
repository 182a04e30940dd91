use axum::{extract::State, response::IntoResponse};
use minijinja::context;

use super::{page, render};
use crate::context::RestaurantContext;
use crate::error::AppResult;
use crate::router::AppState;
use crate::{floor, reports, staff};

pub async fn dashboard(
    State(state): State<AppState>,
    ctx: RestaurantContext,
) -> AppResult<impl IntoResponse> {
    let orders = reports::fetch_orders(&state.db, ctx.id()).await?;
    let tables = floor::list_tables(&state.db, ctx.id()).await?;
    let members = staff::list_staff(&state.db, ctx.id()).await?;
    let stats = reports::DashboardStats::compute(ctx.restaurant.pricing_tier, orders, &tables, &members);

    render(
        &state,
        "dashboard.html",
        context! {
            stats => stats,
            ..page(&ctx, "dashboard")
        },
    )
}
