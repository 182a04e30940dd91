//! Menu, category and item editing.
//!
//! Every write is confirmed by the database before the page reflects it;
//! the two multi-row operations (switching the enabled menu and removing a
//! category with its items) run inside a single transaction.

pub mod image;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::{menu, menu_category, menu_item, prelude::*};
use crate::error::{AppError, AppResult};
use crate::util::format::{max_amount, money};

/// A category together with its items, in insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithItems {
    #[serde(flatten)]
    pub category: menu_category::Model,
    pub items: Vec<menu_item::Model>,
}

/// Raw item fields as typed into the add/edit row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
}

/// An item that passed validation and may be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidItem {
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

/// What to do with the picture of an edited item.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageChange {
    Keep,
    Remove,
    Replace(String),
}

impl ItemInput {
    pub fn validate(&self) -> AppResult<ValidItem> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Item name is required"));
        }
        let price = self.price.trim();
        if price.is_empty() {
            return Err(AppError::validation("Item price is required"));
        }
        let price = Decimal::from_str(price)
            .map_err(|_| AppError::validation("Price must be a number"))?;
        if price.is_sign_negative() {
            return Err(AppError::validation("Price cannot be negative"));
        }
        let price = price.round_dp(2);
        if price > max_amount() {
            return Err(AppError::validation(format!(
                "Price must be at most {}",
                money(max_amount())
            )));
        }

        Ok(ValidItem {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            price,
        })
    }
}

fn required_name(name: &str, what: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

pub async fn list_menus(db: &DatabaseConnection, restaurant_id: Uuid) -> AppResult<Vec<menu::Model>> {
    let menus = Menu::find()
        .filter(menu::Column::RestaurantId.eq(restaurant_id))
        .order_by_asc(menu::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(menus)
}

pub async fn find_menu(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    menu_id: Uuid,
) -> AppResult<menu::Model> {
    Menu::find_by_id(menu_id)
        .filter(menu::Column::RestaurantId.eq(restaurant_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("menu"))
}

pub async fn create_menu(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    name: &str,
) -> AppResult<menu::Model> {
    let name = required_name(name, "Menu")?;
    let now = Utc::now().naive_utc();
    let menu = menu::ActiveModel {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant_id),
        name: Set(name),
        enabled: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(menu_id = %menu.id, "menu created");
    Ok(menu)
}

pub async fn delete_menu(db: &DatabaseConnection, restaurant_id: Uuid, menu_id: Uuid) -> AppResult<()> {
    let result = Menu::delete_many()
        .filter(menu::Column::Id.eq(menu_id))
        .filter(menu::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("menu"));
    }
    info!(menu_id = %menu_id, "menu deleted");
    Ok(())
}

/// Makes `menu_id` the only enabled menu of the restaurant.
///
/// Disabling the others and enabling the chosen one commit together, so a
/// failure leaves every flag as it was.
pub async fn enable_menu(db: &DatabaseConnection, restaurant_id: Uuid, menu_id: Uuid) -> AppResult<()> {
    let menu = find_menu(db, restaurant_id, menu_id).await?;
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;
    Menu::update_many()
        .col_expr(menu::Column::Enabled, Expr::value(false))
        .col_expr(menu::Column::UpdatedAt, Expr::value(now))
        .filter(menu::Column::RestaurantId.eq(restaurant_id))
        .exec(&txn)
        .await?;
    Menu::update_many()
        .col_expr(menu::Column::Enabled, Expr::value(true))
        .col_expr(menu::Column::UpdatedAt, Expr::value(now))
        .filter(menu::Column::Id.eq(menu.id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(menu_id = %menu.id, restaurant_id = %restaurant_id, "menu enabled");
    Ok(())
}

/// Groups items under their categories; items of unknown categories are dropped.
pub fn group_items(
    categories: Vec<menu_category::Model>,
    items: Vec<menu_item::Model>,
) -> Vec<CategoryWithItems> {
    let mut grouped: Vec<CategoryWithItems> = categories
        .into_iter()
        .map(|category| CategoryWithItems {
            category,
            items: Vec::new(),
        })
        .collect();

    for item in items {
        if let Some(group) = grouped.iter_mut().find(|g| g.category.id == item.category_id) {
            group.items.push(item);
        }
    }
    grouped
}

pub async fn menu_contents(db: &DatabaseConnection, menu_id: Uuid) -> AppResult<Vec<CategoryWithItems>> {
    let categories = MenuCategory::find()
        .filter(menu_category::Column::MenuId.eq(menu_id))
        .order_by_asc(menu_category::Column::CreatedAt)
        .all(db)
        .await?;
    let items = MenuItem::find()
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .order_by_asc(menu_item::Column::CreatedAt)
        .all(db)
        .await?;
    debug!(menu_id = %menu_id, categories = categories.len(), items = items.len(), "menu loaded");
    Ok(group_items(categories, items))
}

async fn find_category(
    db: &DatabaseConnection,
    menu_id: Uuid,
    category_id: Uuid,
) -> AppResult<menu_category::Model> {
    MenuCategory::find_by_id(category_id)
        .filter(menu_category::Column::MenuId.eq(menu_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("category"))
}

pub async fn add_category(
    db: &DatabaseConnection,
    menu_id: Uuid,
    name: &str,
) -> AppResult<menu_category::Model> {
    let name = required_name(name, "Category")?;
    let now = Utc::now().naive_utc();
    let category = menu_category::ActiveModel {
        id: Set(Uuid::new_v4()),
        menu_id: Set(menu_id),
        name: Set(name),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(category)
}

pub async fn rename_category(
    db: &DatabaseConnection,
    menu_id: Uuid,
    category_id: Uuid,
    name: &str,
) -> AppResult<menu_category::Model> {
    let name = required_name(name, "Category")?;
    let category = find_category(db, menu_id, category_id).await?;
    let mut active: menu_category::ActiveModel = category.into();
    active.name = Set(name);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

/// Removes a category and every item filed under it in one transaction.
pub async fn delete_category(db: &DatabaseConnection, menu_id: Uuid, category_id: Uuid) -> AppResult<()> {
    let txn = db.begin().await?;
    let items = MenuItem::delete_many()
        .filter(menu_item::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    let categories = MenuCategory::delete_many()
        .filter(menu_category::Column::Id.eq(category_id))
        .filter(menu_category::Column::MenuId.eq(menu_id))
        .exec(&txn)
        .await?;
    if categories.rows_affected == 0 {
        // Dropping the transaction rolls back the item deletion.
        return Err(AppError::NotFound("category"));
    }
    txn.commit().await?;

    info!(category_id = %category_id, items = items.rows_affected, "category deleted");
    Ok(())
}

pub async fn add_item(
    db: &DatabaseConnection,
    menu_id: Uuid,
    category_id: Uuid,
    input: &ItemInput,
    image: Option<String>,
) -> AppResult<menu_item::Model> {
    let valid = input.validate()?;
    find_category(db, menu_id, category_id).await?;

    let now = Utc::now().naive_utc();
    let item = menu_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        menu_id: Set(menu_id),
        category_id: Set(category_id),
        name: Set(valid.name),
        description: Set(valid.description),
        price: Set(valid.price),
        image: Set(image),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(item_id = %item.id, "menu item added");
    Ok(item)
}

pub async fn update_item(
    db: &DatabaseConnection,
    menu_id: Uuid,
    item_id: Uuid,
    input: &ItemInput,
    image: ImageChange,
) -> AppResult<menu_item::Model> {
    let valid = input.validate()?;
    let item = MenuItem::find_by_id(item_id)
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("item"))?;

    let mut active: menu_item::ActiveModel = item.into();
    active.name = Set(valid.name);
    active.description = Set(valid.description);
    active.price = Set(valid.price);
    match image {
        ImageChange::Keep => {}
        ImageChange::Remove => active.image = Set(None),
        ImageChange::Replace(data_url) => active.image = Set(Some(data_url)),
    }
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

pub async fn delete_item(db: &DatabaseConnection, menu_id: Uuid, item_id: Uuid) -> AppResult<()> {
    let result = MenuItem::delete_many()
        .filter(menu_item::Column::Id.eq(item_id))
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("item"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::statement_log;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    fn category(menu_id: Uuid, name: &str) -> menu_category::Model {
        let now = Utc::now().naive_utc();
        menu_category::Model {
            id: Uuid::new_v4(),
            menu_id,
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn item(category: &menu_category::Model, name: &str) -> menu_item::Model {
        let now = Utc::now().naive_utc();
        menu_item::Model {
            id: Uuid::new_v4(),
            menu_id: category.menu_id,
            category_id: category.id,
            name: name.into(),
            description: String::new(),
            price: Decimal::new(950, 2),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn menu_row(restaurant_id: Uuid, enabled: bool) -> menu::Model {
        let now = Utc::now().naive_utc();
        menu::Model {
            id: Uuid::new_v4(),
            restaurant_id,
            name: "Dinner".into(),
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[test]
    fn item_input_requires_name_and_price() {
        let missing_name = ItemInput {
            name: "   ".into(),
            description: String::new(),
            price: "4.50".into(),
        };
        assert!(matches!(missing_name.validate(), Err(AppError::Validation(_))));

        let missing_price = ItemInput {
            name: "Soup".into(),
            description: String::new(),
            price: "".into(),
        };
        assert!(matches!(missing_price.validate(), Err(AppError::Validation(_))));

        let negative = ItemInput {
            name: "Soup".into(),
            description: String::new(),
            price: "-1".into(),
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn item_input_trims_and_rounds() {
        let input = ItemInput {
            name: "  Soup ".into(),
            description: " hot ".into(),
            price: "4.505".into(),
        };
        let valid = input.validate().unwrap();
        assert_eq!(valid.name, "Soup");
        assert_eq!(valid.description, "hot");
        assert_eq!(valid.price, Decimal::new(450, 2));
    }

    #[test]
    fn groups_items_under_their_category_in_order() {
        let menu_id = Uuid::new_v4();
        let starters = category(menu_id, "Starters");
        let mains = category(menu_id, "Mains");
        let soup = item(&starters, "Soup");
        let steak = item(&mains, "Steak");
        let salad = item(&starters, "Salad");

        let grouped = group_items(
            vec![starters.clone(), mains.clone()],
            vec![soup.clone(), steak.clone(), salad.clone()],
        );

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].category.name, "Starters");
        assert_eq!(grouped[0].items, vec![soup, salad]);
        assert_eq!(grouped[1].items, vec![steak]);
    }

    #[test]
    fn deleted_category_takes_its_items_off_the_list() {
        let menu_id = Uuid::new_v4();
        let starters = category(menu_id, "Starters");
        let mains = category(menu_id, "Mains");
        let items = vec![item(&starters, "Soup"), item(&mains, "Steak")];

        let grouped = group_items(vec![mains.clone()], items);
        let names: Vec<_> = grouped
            .iter()
            .flat_map(|g| g.items.iter().map(|i| i.name.as_str()))
            .collect();
        assert_eq!(names, vec!["Steak"]);
    }

    #[tokio::test]
    async fn invalid_item_never_reaches_the_database() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let input = ItemInput {
            name: "".into(),
            description: "no name".into(),
            price: "3".into(),
        };

        let result = add_item(&db, Uuid::new_v4(), Uuid::new_v4(), &input, None).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn enabling_a_menu_disables_the_rest_in_one_transaction() {
        let restaurant_id = Uuid::new_v4();
        let target = menu_row(restaurant_id, false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![target.clone()]])
            .append_exec_results([exec(2), exec(1)])
            .into_connection();

        enable_menu(&db, restaurant_id, target.id).await.unwrap();

        assert_eq!(
            statement_log(db),
            vec!["SELECT", "BEGIN", "UPDATE menus", "UPDATE menus", "COMMIT"]
        );
    }

    #[tokio::test]
    async fn failed_disable_all_rolls_back_before_enabling() {
        let restaurant_id = Uuid::new_v4();
        let target = menu_row(restaurant_id, false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![target.clone()]])
            .append_exec_errors([DbErr::Custom("connection reset".into())])
            .into_connection();

        let result = enable_menu(&db, restaurant_id, target.id).await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(
            statement_log(db),
            vec!["SELECT", "BEGIN", "UPDATE menus", "ROLLBACK"]
        );
    }

    #[tokio::test]
    async fn enabling_a_foreign_menu_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<menu::Model>::new()])
            .into_connection();

        let result = enable_menu(&db, Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound("menu"))));
    }

    #[tokio::test]
    async fn deleting_a_category_removes_items_first() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(3), exec(1)])
            .into_connection();

        delete_category(&db, Uuid::new_v4(), Uuid::new_v4()).await.unwrap();

        assert_eq!(
            statement_log(db),
            vec!["BEGIN", "DELETE menu_items", "DELETE menu_categories", "COMMIT"]
        );
    }

    #[tokio::test]
    async fn missing_category_rolls_back_the_item_deletion() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(3), exec(0)])
            .into_connection();

        let result = delete_category(&db, Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::NotFound("category"))));
        assert_eq!(
            statement_log(db),
            vec!["BEGIN", "DELETE menu_items", "DELETE menu_categories", "ROLLBACK"]
        );
    }

    #[test]
    fn prices_must_fit_the_money_column() {
        let input = |price: &str| ItemInput {
            name: "Wagyu".into(),
            description: String::new(),
            price: price.into(),
        };

        assert!(input("99999999.99").validate().is_ok());
        assert!(matches!(
            input("123456789012").validate(),
            Err(AppError::Validation(m)) if m == "Price must be at most CA$99999999.99"
        ));
        // Rounds up past the limit.
        assert!(input("99999999.999").validate().is_err());
    }
}
