use axum::{
    Form,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
};
use minijinja::context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Flash, after_post, page, render};
use crate::context::RestaurantContext;
use crate::entities::dining_table::{self, TableShape};
use crate::error::AppResult;
use crate::floor::{self, NewTable, TableUpdate, qr};
use crate::orders::live::LiveEvent;
use crate::router::AppState;

const QR_SIZE: u32 = 256;
const PRINT_QR_SIZE: u32 = 512;

#[derive(Debug, Default, Deserialize)]
pub struct FloorQuery {
    edit_table: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct TablePath {
    table_id: Uuid,
}

/// A table as the floor page draws it.
#[derive(Debug, Serialize)]
struct TableTile {
    #[serde(flatten)]
    table: dining_table::Model,
    menu_url: String,
    qr_svg: String,
}

pub async fn floor_page(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Query(query): Query<FloorQuery>,
    Query(flash): Query<Flash>,
) -> AppResult<impl IntoResponse> {
    let tables = floor::list_tables(&state.db, ctx.id()).await?;
    let tiles = tables
        .into_iter()
        .map(|table| -> AppResult<TableTile> {
            let menu_url = qr::table_menu_url(&state.config.public_menu_base_url, ctx.id(), table.id);
            let qr_svg = qr::render_svg(&menu_url, QR_SIZE)?;
            Ok(TableTile {
                table,
                menu_url,
                qr_svg,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    render(
        &state,
        "floor.html",
        context! {
            tables => tiles,
            shapes => [TableShape::Square, TableShape::Rectangle, TableShape::Circle],
            floor_size => floor::FLOOR_SIZE,
            edit_table => query.edit_table,
            error => flash.error,
            ..page(&ctx, "floor")
        },
    )
}

fn floor_url(ctx: &RestaurantContext) -> String {
    format!("{}/floor", ctx.base())
}

pub async fn create_table(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Form(new): Form<NewTable>,
) -> AppResult<Redirect> {
    let result = floor::create_table(&state.db, ctx.id(), &new).await;
    if let Ok(table) = &result {
        state
            .live
            .publish(ctx.id(), LiveEvent::LayoutChanged { table_id: table.id });
    }
    after_post(&floor_url(&ctx), result)
}

pub async fn update_table(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(TablePath { table_id }): Path<TablePath>,
    Form(update): Form<TableUpdate>,
) -> AppResult<Redirect> {
    let result = floor::update_table(&state.db, ctx.id(), table_id, &update).await;
    if result.is_ok() {
        state.live.publish(ctx.id(), LiveEvent::LayoutChanged { table_id });
    }
    after_post(&floor_url(&ctx), result)
}

pub async fn toggle_table(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(TablePath { table_id }): Path<TablePath>,
) -> AppResult<Redirect> {
    let table = floor::toggle_occupancy(&state.db, ctx.id(), table_id).await?;
    state.live.publish(
        ctx.id(),
        LiveEvent::TableChanged {
            table_id: table.id,
            occupied: table.occupied,
        },
    );
    Ok(Redirect::to(&floor_url(&ctx)))
}

pub async fn delete_table(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(TablePath { table_id }): Path<TablePath>,
) -> AppResult<Redirect> {
    floor::delete_table(&state.db, ctx.id(), table_id).await?;
    state.live.publish(ctx.id(), LiveEvent::LayoutChanged { table_id });
    Ok(Redirect::to(&floor_url(&ctx)))
}

pub async fn table_qr_svg(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(TablePath { table_id }): Path<TablePath>,
) -> AppResult<impl IntoResponse> {
    let table = floor::find_table(&state.db, ctx.id(), table_id).await?;
    let url = qr::table_menu_url(&state.config.public_menu_base_url, ctx.id(), table.id);
    let svg = qr::render_svg(&url, QR_SIZE)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

pub async fn table_qr_png(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(TablePath { table_id }): Path<TablePath>,
) -> AppResult<impl IntoResponse> {
    let table = floor::find_table(&state.db, ctx.id(), table_id).await?;
    let url = qr::table_menu_url(&state.config.public_menu_base_url, ctx.id(), table.id);
    let png = qr::render_png(&url, PRINT_QR_SIZE)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        qr::png_file_name(table.table_number)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        png,
    ))
}

pub async fn table_print(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(TablePath { table_id }): Path<TablePath>,
) -> AppResult<impl IntoResponse> {
    let table = floor::find_table(&state.db, ctx.id(), table_id).await?;
    let url = qr::table_menu_url(&state.config.public_menu_base_url, ctx.id(), table.id);
    let qr_svg = qr::render_svg(&url, PRINT_QR_SIZE)?;
    render(
        &state,
        "table_print.html",
        context! {
            restaurant => &ctx.restaurant,
            table => table,
            qr_svg => qr_svg,
            menu_url => url,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        restaurant::{self, PricingTier},
        user::{self, UserRole},
    };
    use crate::router::testing::app_state;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn context() -> RestaurantContext {
        let now = Utc::now().naive_utc();
        let restaurant = restaurant::Model {
            id: Uuid::new_v4(),
            name: "Chez Test".into(),
            address: None,
            pricing_tier: PricingTier::Standard,
            created_at: now,
            updated_at: now,
        };
        let user = user::Model {
            id: Uuid::new_v4(),
            email: "owner@chez.test".into(),
            password_hash: String::new(),
            restaurant_id: restaurant.id,
            role: UserRole::Admin,
            created_at: now,
            updated_at: now,
        };
        RestaurantContext { restaurant, user }
    }

    #[tokio::test]
    async fn table_edits_reach_open_floor_pages() {
        let ctx = context();
        let now = Utc::now().naive_utc();
        let table = dining_table::Model {
            id: Uuid::new_v4(),
            restaurant_id: ctx.id(),
            table_number: 3,
            seats: 2,
            shape: TableShape::Square,
            pos_x: 40.0,
            pos_y: 40.0,
            occupied: false,
            occupied_since: None,
            order_end_time: None,
            created_at: now,
            updated_at: now,
        };
        let mut wider = table.clone();
        wider.seats = 6;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![table.clone()], vec![wider]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let state = app_state(db);
        let mut events = state.live.subscribe(ctx.id());

        update_table(
            State(state.clone()),
            ctx.clone(),
            Path(TablePath { table_id: table.id }),
            Form(TableUpdate {
                seats: 6,
                shape: TableShape::Square,
            }),
        )
        .await
        .unwrap();
        delete_table(State(state.clone()), ctx.clone(), Path(TablePath { table_id: table.id }))
            .await
            .unwrap();

        let expected = LiveEvent::LayoutChanged { table_id: table.id };
        assert_eq!(events.try_recv().unwrap(), expected);
        assert_eq!(events.try_recv().unwrap(), expected);
    }

    #[tokio::test]
    async fn rejected_edit_publishes_nothing() {
        let ctx = context();
        let state = app_state(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let mut events = state.live.subscribe(ctx.id());

        update_table(
            State(state.clone()),
            ctx,
            Path(TablePath {
                table_id: Uuid::new_v4(),
            }),
            Form(TableUpdate {
                seats: 0,
                shape: TableShape::Circle,
            }),
        )
        .await
        .unwrap();

        assert!(events.try_recv().is_err());
    }
}
