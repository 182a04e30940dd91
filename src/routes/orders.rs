use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use minijinja::context;
use serde::Deserialize;
use uuid::Uuid;

use super::{page, render};
use crate::context::RestaurantContext;
use crate::entities::order::OrderStatus;
use crate::error::AppResult;
use crate::orders::{self, OrderRow, OrderView, live::LiveEvent};
use crate::router::AppState;
use crate::{floor, staff};

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub view: OrderView,
}

#[derive(Deserialize)]
pub struct OrderPath {
    order_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    status: OrderStatus,
    #[serde(default)]
    view: OrderView,
}

/// Orders of one view joined with their table and waiter labels.
pub async fn order_rows(state: &AppState, restaurant_id: Uuid, view: OrderView) -> AppResult<Vec<OrderRow>> {
    let all = orders::list_orders(&state.db, restaurant_id).await?;
    let tables = floor::list_tables(&state.db, restaurant_id).await?;
    let members = staff::list_staff(&state.db, restaurant_id).await?;
    Ok(orders::describe_orders(
        orders::filter_orders(all, view),
        &tables,
        &members,
    ))
}

pub async fn orders_page(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Query(ViewQuery { view }): Query<ViewQuery>,
) -> AppResult<impl IntoResponse> {
    let rows = order_rows(&state, ctx.id(), view).await?;
    render(
        &state,
        "orders.html",
        context! {
            orders => rows,
            view => view,
            statuses => OrderStatus::ALL,
            ..page(&ctx, "orders")
        },
    )
}

/// The list alone, re-fetched by the page when the live feed reports a change.
pub async fn orders_fragment(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Query(ViewQuery { view }): Query<ViewQuery>,
) -> AppResult<impl IntoResponse> {
    let rows = order_rows(&state, ctx.id(), view).await?;
    render(
        &state,
        "orders_list.html",
        context! {
            orders => rows,
            view => view,
            statuses => OrderStatus::ALL,
            base => ctx.base(),
        },
    )
}

pub async fn set_status(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(OrderPath { order_id }): Path<OrderPath>,
    Form(form): Form<StatusForm>,
) -> AppResult<Redirect> {
    let order = orders::set_status(&state.db, ctx.id(), order_id, form.status).await?;
    state.live.publish(
        ctx.id(),
        LiveEvent::OrderChanged {
            order_id: order.id,
            status: order.status,
        },
    );
    let view = match form.view {
        OrderView::Live => "live",
        OrderView::Past => "past",
    };
    Ok(Redirect::to(&format!("{}/orders?view={}", ctx.base(), view)))
}
