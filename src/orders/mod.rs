pub mod live;

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{
    dining_table,
    order::{self, OrderLine, OrderLines, OrderStatus},
    prelude::*,
    staff,
};
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::util::format::{max_amount, money};

/// Which slice of the order list a page shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderView {
    #[default]
    Live,
    Past,
}

/// Selects the orders of `view` and puts them in display order.
///
/// Live: pending and ready orders, ready ones pinned to the bottom, each
/// group newest number first. Past: paid orders, newest number first.
/// Archived orders never appear.
pub fn filter_orders(orders: Vec<order::Model>, view: OrderView) -> Vec<order::Model> {
    let mut selected: Vec<order::Model> = orders
        .into_iter()
        .filter(|o| match view {
            OrderView::Live => o.status.is_live(),
            OrderView::Past => o.status == OrderStatus::Paid,
        })
        .collect();

    selected.sort_by(|a, b| {
        let a_ready = a.status == OrderStatus::Ready;
        let b_ready = b.status == OrderStatus::Ready;
        a_ready
            .cmp(&b_ready)
            .then_with(|| b.order_number.cmp(&a.order_number))
    });
    selected
}

/// An order joined with the labels the tables show for it.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRow {
    #[serde(flatten)]
    pub order: order::Model,
    pub table_label: String,
    pub waiter: String,
}

pub fn describe_orders(
    orders: Vec<order::Model>,
    tables: &[dining_table::Model],
    staff: &[staff::Model],
) -> Vec<OrderRow> {
    let table_numbers: HashMap<Uuid, i32> =
        tables.iter().map(|t| (t.id, t.table_number)).collect();
    let waiters: HashMap<Uuid, &str> = staff.iter().map(|s| (s.id, s.name.as_str())).collect();

    orders
        .into_iter()
        .map(|order| {
            let table_label = order
                .table_id
                .and_then(|id| table_numbers.get(&id))
                .map(|n| n.to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            let waiter = order
                .staff_id
                .and_then(|id| waiters.get(&id))
                .map(|name| name.to_string())
                .unwrap_or_default();
            OrderRow {
                order,
                table_label,
                waiter,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub table_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub items: Vec<OrderLine>,
    pub total_price: Decimal,
    #[serde(default)]
    pub tip_amount: Decimal,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
}

impl NewOrder {
    fn validate(&self) -> AppResult<()> {
        if self.items.is_empty() || self.items.iter().any(|l| l.quantity == 0 || l.name.trim().is_empty()) {
            return Err(AppError::validation("An order needs at least one named line with a quantity"));
        }
        if self.total_price.is_sign_negative() || self.tip_amount.is_sign_negative() {
            return Err(AppError::validation("Amounts cannot be negative"));
        }
        if self.total_price.round_dp(2) > max_amount() || self.tip_amount.round_dp(2) > max_amount() {
            return Err(AppError::validation(format!(
                "Amounts must be at most {}",
                money(max_amount())
            )));
        }
        Ok(())
    }
}

pub async fn list_orders(db: &DatabaseConnection, restaurant_id: Uuid) -> AppResult<Vec<order::Model>> {
    let orders = Order::find()
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(orders)
}

pub async fn create_order(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    new: NewOrder,
) -> AppResult<order::Model> {
    new.validate()?;
    if let Some(table_id) = new.table_id {
        crate::floor::find_table(db, restaurant_id, table_id).await?;
    }
    if let Some(staff_id) = new.staff_id {
        crate::staff::find_member(db, restaurant_id, staff_id).await?;
    }

    // Two concurrent creates can read the same max; the unique index on
    // (restaurant_id, order_number) turns the loser away and it takes the next one.
    let order = match insert_numbered(db, restaurant_id, &new).await {
        Err(e) if is_unique_violation(&e) => {
            warn!(%restaurant_id, "order number taken, retrying");
            insert_numbered(db, restaurant_id, &new)
                .await
                .map_err(|e| AppError::unique_or(e, "The order could not be numbered, please try again"))?
        }
        result => result?,
    };

    info!(order_id = %order.id, number = order.order_number, "order created");
    Ok(order)
}

async fn insert_numbered(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    new: &NewOrder,
) -> Result<order::Model, DbErr> {
    let txn = db.begin().await?;
    let last_number: Option<Option<i32>> = Order::find()
        .select_only()
        .column_as(order::Column::OrderNumber.max(), "max_number")
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .into_tuple()
        .one(&txn)
        .await?;
    let order_number = last_number.flatten().unwrap_or(0) + 1;

    let now = Utc::now().naive_utc();
    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant_id),
        table_id: Set(new.table_id),
        staff_id: Set(new.staff_id),
        order_number: Set(order_number),
        status: Set(OrderStatus::Pending),
        total_price: Set(new.total_price.round_dp(2)),
        tip_amount: Set(new.tip_amount.round_dp(2)),
        items: Set(OrderLines(new.items.clone())),
        customer_id: Set(new.customer_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    Ok(order)
}

/// Single-row status change driven by the select on each order row.
pub async fn set_status(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    order_id: Uuid,
    status: OrderStatus,
) -> AppResult<order::Model> {
    let order = Order::find_by_id(order_id)
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("order"))?;

    let previous = order.status;
    let mut active: order::ActiveModel = order.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().naive_utc());
    let order = active.update(db).await?;

    info!(order_id = %order.id, from = previous.as_str(), to = status.as_str(), "order status changed");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::database::testing::statement_log;
    use crate::error::tests::duplicate_key;
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn order(number: i32, status: OrderStatus) -> order::Model {
        let created = NaiveDate::from_ymd_opt(2024, 8, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        order::Model {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            table_id: None,
            staff_id: None,
            order_number: number,
            status,
            total_price: Decimal::new(2000, 2),
            tip_amount: Decimal::ZERO,
            items: OrderLines(vec![OrderLine {
                name: "Soup".into(),
                quantity: 1,
            }]),
            customer_id: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn numbers(orders: &[order::Model]) -> Vec<i32> {
        orders.iter().map(|o| o.order_number).collect()
    }

    #[test]
    fn live_view_pins_ready_orders_to_the_bottom() {
        let orders = vec![
            order(1, OrderStatus::Ready),
            order(2, OrderStatus::Pending),
            order(3, OrderStatus::Paid),
            order(4, OrderStatus::Ready),
            order(5, OrderStatus::Pending),
            order(6, OrderStatus::Archive),
        ];

        let live = filter_orders(orders, OrderView::Live);

        assert_eq!(numbers(&live), vec![5, 2, 4, 1]);
        assert!(live.iter().all(|o| o.status.is_live()));
    }

    #[test]
    fn past_view_lists_paid_orders_only() {
        let orders = vec![
            order(7, OrderStatus::Paid),
            order(8, OrderStatus::Archive),
            order(9, OrderStatus::Paid),
            order(10, OrderStatus::Pending),
        ];

        let past = filter_orders(orders, OrderView::Past);

        assert_eq!(numbers(&past), vec![9, 7]);
    }

    #[test]
    fn rows_fall_back_to_unknown_table() {
        let table_id = Uuid::new_v4();
        let staff_id = Uuid::new_v4();
        let mut seated = order(1, OrderStatus::Pending);
        seated.table_id = Some(table_id);
        seated.staff_id = Some(staff_id);
        let walk_in = order(2, OrderStatus::Pending);

        let now = seated.created_at;
        let tables = vec![dining_table::Model {
            id: table_id,
            restaurant_id: Uuid::nil(),
            table_number: 12,
            seats: 4,
            shape: dining_table::TableShape::Square,
            pos_x: 0.0,
            pos_y: 0.0,
            occupied: true,
            occupied_since: Some(now),
            order_end_time: None,
            created_at: now,
            updated_at: now,
        }];
        let staff = vec![staff::Model {
            id: staff_id,
            restaurant_id: Uuid::nil(),
            name: "Maya".into(),
            role: staff::StaffRole::Waiter,
            table_id: None,
            created_at: now,
            updated_at: now,
        }];

        let rows = describe_orders(vec![seated, walk_in], &tables, &staff);

        assert_eq!(rows[0].table_label, "12");
        assert_eq!(rows[0].waiter, "Maya");
        assert_eq!(rows[1].table_label, "Unknown");
        assert_eq!(rows[1].waiter, "");
    }

    #[test]
    fn orders_need_lines() {
        let empty = NewOrder {
            table_id: None,
            staff_id: None,
            items: vec![],
            total_price: Decimal::ONE,
            tip_amount: Decimal::ZERO,
            customer_id: None,
        };
        assert!(empty.validate().is_err());
    }

    fn soup_order(staff_id: Option<Uuid>) -> NewOrder {
        NewOrder {
            table_id: None,
            staff_id,
            items: vec![OrderLine {
                name: "Soup".into(),
                quantity: 2,
            }],
            total_price: Decimal::new(1800, 2),
            tip_amount: Decimal::new(200, 2),
            customer_id: None,
        }
    }

    fn max_number(n: i32) -> Vec<BTreeMap<&'static str, Value>> {
        vec![BTreeMap::from([("max_number", Value::from(n))])]
    }

    #[test]
    fn amounts_must_fit_the_money_column() {
        let mut huge = soup_order(None);
        huge.total_price = Decimal::new(123_456_789_012, 0);
        assert!(matches!(huge.validate(), Err(AppError::Validation(_))));

        let mut generous = soup_order(None);
        generous.tip_amount = Decimal::new(10_000_000_000, 2);
        assert!(generous.validate().is_err());

        assert!(soup_order(None).validate().is_ok());
    }

    #[tokio::test]
    async fn waiter_from_another_restaurant_is_rejected_before_insert() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<staff::Model>::new()])
            .into_connection();

        let result = create_order(&db, Uuid::new_v4(), soup_order(Some(Uuid::new_v4()))).await;

        assert!(matches!(result, Err(AppError::NotFound("staff member"))));
        assert_eq!(statement_log(db), vec!["SELECT"]);
    }

    #[tokio::test]
    async fn taken_order_number_is_retried_once() {
        let mut placed = order(5, OrderStatus::Pending);
        placed.restaurant_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([max_number(3)])
            .append_query_errors([duplicate_key()])
            .append_query_results([max_number(4)])
            .append_query_results([vec![placed.clone()]])
            .into_connection();

        let created = create_order(&db, placed.restaurant_id, soup_order(None)).await.unwrap();

        assert_eq!(created.order_number, 5);
        assert_eq!(
            statement_log(db),
            vec![
                "BEGIN", "SELECT", "INSERT orders", "ROLLBACK",
                "BEGIN", "SELECT", "INSERT orders", "COMMIT",
            ]
        );
    }

    #[test]
    fn views_parse_from_query_strings() {
        let view: OrderView = serde_json::from_str("\"past\"").unwrap();
        assert_eq!(view, OrderView::Past);
        assert_eq!(OrderView::default(), OrderView::Live);
    }
}
