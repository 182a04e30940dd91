use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use minijinja::context;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use super::{Flash, after_post, page, render};
use crate::context::RestaurantContext;
use crate::entities::staff::StaffRole;
use crate::error::AppResult;
use crate::floor;
use crate::router::AppState;
use crate::staff::{self, NewStaff};

#[derive(Deserialize)]
pub struct StaffPath {
    staff_id: Uuid,
}

/// The table select posts an empty string for "Not Assigned".
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => id.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignForm {
    #[serde(default, deserialize_with = "empty_as_none")]
    table_id: Option<Uuid>,
}

pub async fn staff_page(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Query(flash): Query<Flash>,
) -> AppResult<impl IntoResponse> {
    let members = staff::list_staff(&state.db, ctx.id()).await?;
    let tables = floor::list_tables(&state.db, ctx.id()).await?;
    let rows = staff::describe_staff(members, &tables);

    render(
        &state,
        "staff.html",
        context! {
            staff => rows,
            tables => tables,
            roles => [StaffRole::Waiter, StaffRole::Cashier, StaffRole::Chef, StaffRole::Manager],
            error => flash.error,
            ..page(&ctx, "staff")
        },
    )
}

fn staff_url(ctx: &RestaurantContext) -> String {
    format!("{}/staff", ctx.base())
}

pub async fn add_staff(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Form(new): Form<NewStaff>,
) -> AppResult<Redirect> {
    let result = staff::add_staff(&state.db, ctx.id(), &new).await;
    after_post(&staff_url(&ctx), result)
}

pub async fn assign_table(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(StaffPath { staff_id }): Path<StaffPath>,
    Form(form): Form<AssignForm>,
) -> AppResult<Redirect> {
    staff::assign_table(&state.db, ctx.id(), staff_id, form.table_id).await?;
    Ok(Redirect::to(&staff_url(&ctx)))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(StaffPath { staff_id }): Path<StaffPath>,
) -> AppResult<Redirect> {
    staff::delete_staff(&state.db, ctx.id(), staff_id).await?;
    Ok(Redirect::to(&staff_url(&ctx)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_table_choice_clears_the_assignment() {
        let form: AssignForm = serde_json::from_str(r#"{"table_id":""}"#).unwrap();
        assert_eq!(form.table_id, None);

        let id = Uuid::new_v4();
        let form: AssignForm = serde_json::from_str(&format!(r#"{{"table_id":"{id}"}}"#)).unwrap();
        assert_eq!(form.table_id, Some(id));
    }
}
