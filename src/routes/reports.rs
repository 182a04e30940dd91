use axum::{extract::State, response::IntoResponse};
use minijinja::context;
use rust_decimal::Decimal;

use super::{page, render};
use crate::context::RestaurantContext;
use crate::error::AppResult;
use crate::floor;
use crate::reports::{self, SalesReport, TurnoverReport};
use crate::router::AppState;

pub async fn reports_index(
    State(state): State<AppState>,
    ctx: RestaurantContext,
) -> AppResult<impl IntoResponse> {
    render(&state, "reports.html", page(&ctx, "reports"))
}

/// Bar widths as percentages of the largest bucket.
fn scale(values: impl Iterator<Item = Decimal>) -> Vec<u32> {
    let values: Vec<Decimal> = values.collect();
    let max = values.iter().copied().max().unwrap_or(Decimal::ZERO);
    values
        .into_iter()
        .map(|v| {
            if max.is_zero() {
                0
            } else {
                (v * Decimal::from(100) / max)
                    .round()
                    .try_into()
                    .unwrap_or(0)
            }
        })
        .collect()
}

pub async fn sales_report(
    State(state): State<AppState>,
    ctx: RestaurantContext,
) -> AppResult<impl IntoResponse> {
    let orders = reports::fetch_orders(&state.db, ctx.id()).await?;
    let report = SalesReport::compute(&orders);
    let daily_bars = scale(report.daily.iter().map(|d| d.revenue));
    let hourly_bars = scale(report.hourly.iter().map(|h| h.revenue));

    render(
        &state,
        "reports_sales.html",
        context! {
            report => report,
            daily_bars => daily_bars,
            hourly_bars => hourly_bars,
            ..page(&ctx, "reports")
        },
    )
}

pub async fn turnover_report(
    State(state): State<AppState>,
    ctx: RestaurantContext,
) -> AppResult<impl IntoResponse> {
    let tables = floor::list_tables(&state.db, ctx.id()).await?;
    let report = TurnoverReport::compute(&tables);
    let average_minutes = report.average_minutes.map(|m| m.round() as i64);
    render(
        &state,
        "reports_turnover.html",
        context! {
            report => report,
            average_minutes => average_minutes,
            tables => tables,
            ..page(&ctx, "reports")
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scale_to_the_largest_value() {
        let bars = scale([Decimal::new(50, 0), Decimal::new(100, 0), Decimal::ZERO].into_iter());
        assert_eq!(bars, vec![50, 100, 0]);
        assert_eq!(scale([Decimal::ZERO].into_iter()), vec![0]);
    }
}
