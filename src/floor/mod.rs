//! Floor plan: table layout, shape/seat editing and the occupancy toggle.

pub mod qr;

use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::entities::{dining_table, dining_table::TableShape, prelude::*};
use crate::error::{AppError, AppResult};

/// Edge length of the square floor canvas, in layout units.
pub const FLOOR_SIZE: f64 = 2000.0;

const GRID_COLUMNS: u64 = 6;
const GRID_SPACING: f64 = 140.0;
const GRID_MARGIN: f64 = 40.0;

#[derive(Debug, Clone, Deserialize)]
pub struct NewTable {
    pub table_number: i32,
    pub seats: i32,
    pub shape: TableShape,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableUpdate {
    pub seats: i32,
    pub shape: TableShape,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Occupancy columns of a table, always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub occupied: bool,
    pub occupied_since: Option<NaiveDateTime>,
    pub order_end_time: Option<NaiveDateTime>,
}

impl Occupancy {
    pub fn of(table: &dining_table::Model) -> Self {
        Self {
            occupied: table.occupied,
            occupied_since: table.occupied_since,
            order_end_time: table.order_end_time,
        }
    }

    /// Free tables become occupied from `now`; occupied tables are freed at
    /// `now`. The other end of the interval is left untouched.
    pub fn toggled(self, now: NaiveDateTime) -> Self {
        if self.occupied {
            Self {
                occupied: false,
                order_end_time: Some(now),
                ..self
            }
        } else {
            Self {
                occupied: true,
                occupied_since: Some(now),
                ..self
            }
        }
    }
}

impl Position {
    pub fn clamped(self) -> Self {
        let clamp = |v: f64| {
            if v.is_finite() {
                v.clamp(0.0, FLOOR_SIZE)
            } else {
                0.0
            }
        };
        Self {
            x: clamp(self.x),
            y: clamp(self.y),
        }
    }

    /// Default spot for the `index`-th table of a restaurant.
    pub fn grid_slot(index: u64) -> Self {
        let column = (index % GRID_COLUMNS) as f64;
        let row = (index / GRID_COLUMNS) as f64;
        Self {
            x: GRID_MARGIN + column * GRID_SPACING,
            y: GRID_MARGIN + row * GRID_SPACING,
        }
        .clamped()
    }
}

fn validate_seats(seats: i32) -> AppResult<()> {
    if seats < 1 {
        return Err(AppError::validation("A table needs at least one seat"));
    }
    Ok(())
}

pub async fn list_tables(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
) -> AppResult<Vec<dining_table::Model>> {
    let tables = DiningTable::find()
        .filter(dining_table::Column::RestaurantId.eq(restaurant_id))
        .order_by_asc(dining_table::Column::TableNumber)
        .all(db)
        .await?;
    Ok(tables)
}

pub async fn find_table(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    table_id: Uuid,
) -> AppResult<dining_table::Model> {
    DiningTable::find_by_id(table_id)
        .filter(dining_table::Column::RestaurantId.eq(restaurant_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("table"))
}

pub async fn create_table(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    new: &NewTable,
) -> AppResult<dining_table::Model> {
    if new.table_number < 1 {
        return Err(AppError::validation("Table number must be positive"));
    }
    validate_seats(new.seats)?;

    let duplicate = format!("Table {} already exists", new.table_number);
    let taken = DiningTable::find()
        .filter(dining_table::Column::RestaurantId.eq(restaurant_id))
        .filter(dining_table::Column::TableNumber.eq(new.table_number))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(AppError::validation(duplicate));
    }

    let existing = DiningTable::find()
        .filter(dining_table::Column::RestaurantId.eq(restaurant_id))
        .count(db)
        .await?;
    let slot = Position::grid_slot(existing);
    let now = Utc::now().naive_utc();

    let table = dining_table::ActiveModel {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant_id),
        table_number: Set(new.table_number),
        seats: Set(new.seats),
        shape: Set(new.shape),
        pos_x: Set(slot.x),
        pos_y: Set(slot.y),
        occupied: Set(false),
        occupied_since: Set(None),
        order_end_time: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    // A concurrent create can still win the unique index after the check above.
    .map_err(|e| AppError::unique_or(e, duplicate))?;
    info!(table_id = %table.id, number = table.table_number, "table created");
    Ok(table)
}

pub async fn update_table(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    table_id: Uuid,
    update: &TableUpdate,
) -> AppResult<dining_table::Model> {
    validate_seats(update.seats)?;
    let table = find_table(db, restaurant_id, table_id).await?;
    let mut active: dining_table::ActiveModel = table.into();
    active.seats = Set(update.seats);
    active.shape = Set(update.shape);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

/// Persists the final position of a drag.
pub async fn move_table(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    table_id: Uuid,
    position: Position,
) -> AppResult<dining_table::Model> {
    let position = position.clamped();
    let table = find_table(db, restaurant_id, table_id).await?;
    let mut active: dining_table::ActiveModel = table.into();
    active.pos_x = Set(position.x);
    active.pos_y = Set(position.y);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

/// Flips a table between free and occupied, stamping the interval edge.
pub async fn toggle_occupancy(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    table_id: Uuid,
) -> AppResult<dining_table::Model> {
    let table = find_table(db, restaurant_id, table_id).await?;
    let next = Occupancy::of(&table).toggled(Utc::now().naive_utc());

    let mut active: dining_table::ActiveModel = table.into();
    active.occupied = Set(next.occupied);
    active.occupied_since = Set(next.occupied_since);
    active.order_end_time = Set(next.order_end_time);
    active.updated_at = Set(Utc::now().naive_utc());
    let table = active.update(db).await?;

    info!(table_id = %table.id, occupied = table.occupied, "table toggled");
    Ok(table)
}

pub async fn delete_table(db: &DatabaseConnection, restaurant_id: Uuid, table_id: Uuid) -> AppResult<()> {
    let result = DiningTable::delete_many()
        .filter(dining_table::Column::Id.eq(table_id))
        .filter(dining_table::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("table"));
    }
    info!(table_id = %table_id, "table deleted");
    Ok(())
}
