//! Read-only aggregation over a restaurant's orders and tables.
//!
//! Everything here is a pure function of already-fetched rows so the same
//! figures feed the HTML report pages and the JSON endpoints.

use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, Timelike};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{
    dining_table,
    order,
    prelude::*,
    restaurant::PricingTier,
    staff,
};
use crate::error::AppResult;
use crate::orders::{OrderRow, describe_orders};

const RECENT_ORDERS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub revenue: Decimal,
    pub order_count: usize,
    pub average_order: Decimal,
    pub tips: Decimal,
    /// Distinct diners among orders that carry one.
    pub customers: usize,
    pub locked: bool,
    pub recent: Vec<OrderRow>,
}

impl DashboardStats {
    pub fn compute(
        tier: PricingTier,
        orders: Vec<order::Model>,
        tables: &[dining_table::Model],
        staff: &[staff::Model],
    ) -> Self {
        let order_count = orders.len();
        let revenue: Decimal = orders.iter().map(|o| o.total_price).sum();
        let tips: Decimal = orders.iter().map(|o| o.tip_amount).sum();
        let customers = orders
            .iter()
            .filter_map(|o| o.customer_id)
            .collect::<HashSet<_>>()
            .len();
        let average_order = if order_count == 0 {
            Decimal::ZERO
        } else {
            (revenue / Decimal::from(order_count)).round_dp(2)
        };

        let mut recent = orders;
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(RECENT_ORDERS);
        let recent = describe_orders(recent, tables, staff);

        if tier.has_live_stats() {
            Self {
                revenue,
                order_count,
                average_order,
                tips,
                customers,
                locked: false,
                recent,
            }
        } else {
            Self {
                revenue: Decimal::ZERO,
                order_count: 0,
                average_order: Decimal::ZERO,
                tips: Decimal::ZERO,
                customers: 0,
                locked: true,
                recent,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub orders: usize,
}

pub fn sales_by_day(orders: &[order::Model]) -> Vec<DailySales> {
    let mut days: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();
    for order in orders {
        let entry = days.entry(order.created_at.date()).or_default();
        entry.0 += order.total_price;
        entry.1 += 1;
    }
    days.into_iter()
        .map(|(date, (revenue, orders))| DailySales {
            date,
            revenue,
            orders,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySales {
    pub hour: u32,
    pub revenue: Decimal,
    pub orders: usize,
}

/// Always 24 buckets, hour 0 first.
pub fn sales_by_hour(orders: &[order::Model]) -> Vec<HourlySales> {
    let mut hours: Vec<HourlySales> = (0..24)
        .map(|hour| HourlySales {
            hour,
            revenue: Decimal::ZERO,
            orders: 0,
        })
        .collect();
    for order in orders {
        let bucket = &mut hours[order.created_at.hour() as usize];
        bucket.revenue += order.total_price;
        bucket.orders += 1;
    }
    hours
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueSplit {
    pub net: Decimal,
    pub tips: Decimal,
}

pub fn revenue_split(orders: &[order::Model]) -> RevenueSplit {
    RevenueSplit {
        net: orders.iter().map(|o| o.total_price).sum(),
        tips: orders.iter().map(|o| o.tip_amount).sum(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRatio {
    pub checked_out: usize,
    pub open: usize,
}

impl CheckoutRatio {
    /// Share of checked-out orders as a whole percentage.
    pub fn percent(&self) -> u32 {
        let total = self.checked_out + self.open;
        if total == 0 {
            return 0;
        }
        ((self.checked_out * 100 + total / 2) / total) as u32
    }
}

pub fn checkout_ratio(orders: &[order::Model]) -> CheckoutRatio {
    let open = orders.iter().filter(|o| o.status.is_live()).count();
    CheckoutRatio {
        checked_out: orders.len() - open,
        open,
    }
}

/// Mean length of the closed occupancy intervals, in minutes.
pub fn average_occupancy_minutes(tables: &[dining_table::Model]) -> Option<f64> {
    let durations: Vec<i64> = tables
        .iter()
        .filter_map(|t| match (t.occupied_since, t.order_end_time) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_seconds()),
            _ => None,
        })
        .collect();

    if durations.is_empty() {
        return None;
    }
    let total: i64 = durations.iter().sum();
    Some(total as f64 / durations.len() as f64 / 60.0)
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub daily: Vec<DailySales>,
    pub hourly: Vec<HourlySales>,
    pub split: RevenueSplit,
    pub checkout: CheckoutRatio,
    pub checkout_percent: u32,
}

impl SalesReport {
    pub fn compute(orders: &[order::Model]) -> Self {
        let checkout = checkout_ratio(orders);
        Self {
            daily: sales_by_day(orders),
            hourly: sales_by_hour(orders),
            split: revenue_split(orders),
            checkout_percent: checkout.percent(),
            checkout,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnoverReport {
    pub tables: usize,
    pub occupied: usize,
    pub average_minutes: Option<f64>,
}

impl TurnoverReport {
    pub fn compute(tables: &[dining_table::Model]) -> Self {
        Self {
            tables: tables.len(),
            occupied: tables.iter().filter(|t| t.occupied).count(),
            average_minutes: average_occupancy_minutes(tables),
        }
    }
}

/// Every order of the restaurant, oldest first, for the aggregations above.
pub async fn fetch_orders(db: &DatabaseConnection, restaurant_id: Uuid) -> AppResult<Vec<order::Model>> {
    let orders = Order::find()
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .order_by_asc(order::Column::CreatedAt)
        .all(db)
        .await?;
    tracing::debug!(%restaurant_id, count = orders.len(), "orders fetched for reports");
    Ok(orders)
}
