use chrono::{Datelike, NaiveDate, NaiveDateTime};
use minijinja::Environment;
use rust_decimal::Decimal;

fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// `16th August, 2024`
pub fn long_date(date: NaiveDate) -> String {
    format!(
        "{}{} {}, {}",
        date.day(),
        ordinal_suffix(date.day()),
        date.format("%B"),
        date.year()
    )
}

/// `14:05`
pub fn clock_time(at: NaiveDateTime) -> String {
    at.format("%H:%M").to_string()
}

pub fn money(amount: Decimal) -> String {
    format!("CA${:.2}", amount.round_dp(2))
}

/// Largest amount the `numeric(10, 2)` money columns hold.
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

// Templates receive dates and decimals as their serde strings.
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn register(env: &mut Environment<'_>) {
    env.add_filter("long_date", |value: String| {
        parse_datetime(&value)
            .map(|at| long_date(at.date()))
            .unwrap_or(value)
    });
    env.add_filter("clock", |value: String| {
        parse_datetime(&value).map(clock_time).unwrap_or(value)
    });
    env.add_filter("money", |value: String| {
        value
            .parse::<Decimal>()
            .map(money)
            .unwrap_or(value)
    });
}
