use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::entities::{
    dining_table,
    prelude::*,
    staff::{self, StaffRole},
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub name: String,
    pub role: StaffRole,
}

/// A staff member with the label of the table they cover.
#[derive(Debug, Clone, Serialize)]
pub struct StaffRow {
    #[serde(flatten)]
    pub member: staff::Model,
    pub assignment: String,
}

pub fn describe_staff(staff: Vec<staff::Model>, tables: &[dining_table::Model]) -> Vec<StaffRow> {
    let numbers: HashMap<Uuid, i32> = tables.iter().map(|t| (t.id, t.table_number)).collect();
    staff
        .into_iter()
        .map(|member| {
            let assignment = member
                .table_id
                .and_then(|id| numbers.get(&id))
                .map(|n| format!("Table {n}"))
                .unwrap_or_else(|| "Not Assigned".to_string());
            StaffRow { member, assignment }
        })
        .collect()
}

pub async fn list_staff(db: &DatabaseConnection, restaurant_id: Uuid) -> AppResult<Vec<staff::Model>> {
    let staff = Staff::find()
        .filter(staff::Column::RestaurantId.eq(restaurant_id))
        .order_by_asc(staff::Column::Name)
        .all(db)
        .await?;
    Ok(staff)
}

pub async fn add_staff(db: &DatabaseConnection, restaurant_id: Uuid, new: &NewStaff) -> AppResult<staff::Model> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Staff name is required"));
    }

    let now = Utc::now().naive_utc();
    let member = staff::ActiveModel {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant_id),
        name: Set(name.to_string()),
        role: Set(new.role),
        table_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(staff_id = %member.id, "staff member added");
    Ok(member)
}

pub async fn find_member(db: &DatabaseConnection, restaurant_id: Uuid, staff_id: Uuid) -> AppResult<staff::Model> {
    Staff::find_by_id(staff_id)
        .filter(staff::Column::RestaurantId.eq(restaurant_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("staff member"))
}

/// Points a staff member at one of the restaurant's tables, or clears it.
pub async fn assign_table(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    staff_id: Uuid,
    table_id: Option<Uuid>,
) -> AppResult<staff::Model> {
    let member = find_member(db, restaurant_id, staff_id).await?;
    if let Some(table_id) = table_id {
        crate::floor::find_table(db, restaurant_id, table_id).await?;
    }

    let mut active: staff::ActiveModel = member.into();
    active.table_id = Set(table_id);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

pub async fn delete_staff(db: &DatabaseConnection, restaurant_id: Uuid, staff_id: Uuid) -> AppResult<()> {
    let result = Staff::delete_many()
        .filter(staff::Column::Id.eq(staff_id))
        .filter(staff::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("staff member"));
    }
    info!(%staff_id, "staff member removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn member(table_id: Option<Uuid>) -> staff::Model {
        let now = NaiveDate::from_ymd_opt(2024, 8, 16)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        staff::Model {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            name: "Jon".into(),
            role: StaffRole::Waiter,
            table_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn blank_names_never_reach_the_database() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let new = NewStaff {
            name: "   ".into(),
            role: StaffRole::Chef,
        };

        let err = add_staff(&db, Uuid::nil(), &new).await.unwrap_err();
        assert_eq!(err.to_string(), "Staff name is required");
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn assigning_a_foreign_table_is_not_found() {
        let unassigned = member(None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![unassigned.clone()]])
            .append_query_results([Vec::<dining_table::Model>::new()])
            .into_connection();

        let result = assign_table(&db, Uuid::nil(), unassigned.id, Some(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::NotFound("table"))));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("UPDATE"));
    }

    #[test]
    fn unassigned_staff_are_labelled() {
        let rows = describe_staff(vec![member(None), member(Some(Uuid::new_v4()))], &[]);
        assert_eq!(rows[0].assignment, "Not Assigned");
        assert_eq!(rows[1].assignment, "Not Assigned");
    }
}
