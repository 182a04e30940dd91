//! Guest feedback and promotions. Both are written elsewhere and only read here.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{feedback, prelude::*, promotion};
use crate::error::AppResult;
use crate::util::format::{clock_time, long_date};

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRow {
    #[serde(flatten)]
    pub feedback: feedback::Model,
    pub stars: String,
    pub date: String,
    pub time: String,
}

impl From<feedback::Model> for FeedbackRow {
    fn from(feedback: feedback::Model) -> Self {
        let filled = feedback.rating.clamp(0, 5) as usize;
        Self {
            stars: format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled)),
            date: long_date(feedback.created_at.date()),
            time: clock_time(feedback.created_at),
            feedback,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PromotionRow {
    #[serde(flatten)]
    pub promotion: promotion::Model,
    pub period: String,
}

impl From<promotion::Model> for PromotionRow {
    fn from(promotion: promotion::Model) -> Self {
        Self {
            period: format!(
                "{} – {}",
                long_date(promotion.start_date),
                long_date(promotion.end_date)
            ),
            promotion,
        }
    }
}

pub async fn list_feedback(db: &DatabaseConnection, restaurant_id: Uuid) -> AppResult<Vec<FeedbackRow>> {
    let rows = Feedback::find()
        .filter(feedback::Column::RestaurantId.eq(restaurant_id))
        .order_by_desc(feedback::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(FeedbackRow::from).collect())
}

pub async fn list_promotions(db: &DatabaseConnection, restaurant_id: Uuid) -> AppResult<Vec<PromotionRow>> {
    let rows = Promotion::find()
        .filter(promotion::Column::RestaurantId.eq(restaurant_id))
        .order_by_desc(promotion::Column::StartDate)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(PromotionRow::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn feedback_rows_carry_formatted_dates() {
        let created = NaiveDate::from_ymd_opt(2024, 8, 16)
            .unwrap()
            .and_hms_opt(19, 45, 0)
            .unwrap();
        let five_stars = feedback::Model {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            rating: 5,
            comment: "Lovely evening".into(),
            created_at: created,
            updated_at: created,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![five_stars]])
            .into_connection();

        let rows = list_feedback(&db, Uuid::nil()).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stars, "★★★★★");
        assert_eq!(rows[0].date, "16th August, 2024");
        assert_eq!(rows[0].time, "19:45");
    }

    #[test]
    fn promotion_period_spans_both_dates() {
        let now = NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let row = PromotionRow::from(promotion::Model {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            title: "Happy hour".into(),
            description: "Half-price drinks".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 8, 3).unwrap(),
            created_at: now,
            updated_at: now,
        });
        assert_eq!(row.period, "1st August, 2024 – 3rd August, 2024");
    }
}
