use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use super::orders::{ViewQuery, order_rows};
use crate::context::RestaurantContext;
use crate::error::AppResult;
use crate::floor::{self, Position};
use crate::orders::{self, NewOrder, live::LiveEvent};
use crate::reports::{self, SalesReport, TurnoverReport};
use crate::router::AppState;

#[derive(Deserialize)]
pub struct TablePath {
    table_id: Uuid,
}

pub async fn api_orders(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Query(ViewQuery { view }): Query<ViewQuery>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(order_rows(&state, ctx.id(), view).await?))
}

pub async fn api_create_order(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Json(new): Json<NewOrder>,
) -> AppResult<impl IntoResponse> {
    let order = orders::create_order(&state.db, ctx.id(), new).await?;
    state
        .live
        .publish(ctx.id(), LiveEvent::OrderCreated { order_id: order.id });
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn api_sales(
    State(state): State<AppState>,
    ctx: RestaurantContext,
) -> AppResult<impl IntoResponse> {
    let orders = reports::fetch_orders(&state.db, ctx.id()).await?;
    Ok(Json(SalesReport::compute(&orders)))
}

pub async fn api_turnover(
    State(state): State<AppState>,
    ctx: RestaurantContext,
) -> AppResult<impl IntoResponse> {
    let tables = floor::list_tables(&state.db, ctx.id()).await?;
    Ok(Json(TurnoverReport::compute(&tables)))
}

/// Final position of a dragged table, sent once on drop.
pub async fn api_move_table(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(TablePath { table_id }): Path<TablePath>,
    Json(position): Json<Position>,
) -> AppResult<impl IntoResponse> {
    let table = floor::move_table(&state.db, ctx.id(), table_id, position).await?;
    state.live.publish(
        ctx.id(),
        LiveEvent::TableMoved {
            table_id: table.id,
            x: table.pos_x,
            y: table.pos_y,
        },
    );
    Ok(Json(table))
}
