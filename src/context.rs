use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use sea_orm::EntityTrait;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::user::AuthSession;
use crate::entities::{prelude::*, restaurant, user};
use crate::error::{AppError, AppResult};
use crate::router::AppState;

/// The signed-in user and the restaurant named in the URL.
///
/// Every `/restaurants/{restaurant_id}/...` handler takes this instead of
/// reading the path itself, so access checks live in one place.
#[derive(Debug, Clone)]
pub struct RestaurantContext {
    pub restaurant: restaurant::Model,
    pub user: user::Model,
}

impl RestaurantContext {
    pub fn id(&self) -> Uuid {
        self.restaurant.id
    }

    /// Base path of this restaurant's pages.
    pub fn base(&self) -> String {
        format!("/restaurants/{}", self.restaurant.id)
    }
}

#[derive(Deserialize)]
struct RestaurantPath {
    restaurant_id: Uuid,
}

/// Users only ever see the restaurant their account belongs to.
pub fn authorize(user: &user::Model, restaurant_id: Uuid) -> AppResult<()> {
    if user.restaurant_id != restaurant_id {
        tracing::warn!(user_id = %user.id, %restaurant_id, "cross-restaurant access refused");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl FromRequestParts<AppState> for RestaurantContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string());

        let auth_session = AuthSession::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized { next: next.clone() })?;
        let Some(user) = auth_session.user else {
            return Err(AppError::Unauthorized { next });
        };

        let Path(RestaurantPath { restaurant_id }) =
            Path::<RestaurantPath>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::NotFound("restaurant"))?;
        authorize(&user, restaurant_id)?;

        let restaurant = Restaurant::find_by_id(restaurant_id)
            .one(state.db.as_ref())
            .await?
            .ok_or(AppError::NotFound("restaurant"))?;

        Ok(Self { restaurant, user })
    }
}
