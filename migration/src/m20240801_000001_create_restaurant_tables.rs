use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;
// Named explicitly; the prelude glob also exports a sea-query `Order`.
use crate::iden::Order;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Restaurant::Table)
            .col(pk_uuid(Restaurant::Id))
            .col(string(Restaurant::Name))
            .col(string_null(Restaurant::Address))
            .col(string(Restaurant::PricingTier).default("basic"))
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(Menu::Table)
            .col(pk_uuid(Menu::Id))
            .col(uuid(Menu::RestaurantId))
            .col(string(Menu::Name))
            .col(boolean(Menu::Enabled).default(false))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_menu_restaurant")
                    .from(Menu::Table, Menu::RestaurantId)
                    .to(Restaurant::Table, Restaurant::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(MenuCategory::Table)
            .col(pk_uuid(MenuCategory::Id))
            .col(uuid(MenuCategory::MenuId))
            .col(string(MenuCategory::Name))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_category_menu")
                    .from(MenuCategory::Table, MenuCategory::MenuId)
                    .to(Menu::Table, Menu::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(MenuItem::Table)
            .col(pk_uuid(MenuItem::Id))
            .col(uuid(MenuItem::MenuId))
            .col(uuid(MenuItem::CategoryId))
            .col(string(MenuItem::Name))
            .col(text(MenuItem::Description).default(""))
            .col(decimal_len(MenuItem::Price, 10, 2))
            .col(text_null(MenuItem::Image))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_item_menu")
                    .from(MenuItem::Table, MenuItem::MenuId)
                    .to(Menu::Table, Menu::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_item_category")
                    .from(MenuItem::Table, MenuItem::CategoryId)
                    .to(MenuCategory::Table, MenuCategory::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(Expr::col(MenuItem::Price).gte(0))
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(DiningTable::Table)
            .col(pk_uuid(DiningTable::Id))
            .col(uuid(DiningTable::RestaurantId))
            .col(integer(DiningTable::TableNumber))
            .col(integer(DiningTable::Seats).default(4))
            .col(string(DiningTable::Shape).default("square"))
            .col(double(DiningTable::PosX).default(0.0))
            .col(double(DiningTable::PosY).default(0.0))
            .col(boolean(DiningTable::Occupied).default(false))
            .col(timestamp_null(DiningTable::OccupiedSince))
            .col(timestamp_null(DiningTable::OrderEndTime))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_table_restaurant")
                    .from(DiningTable::Table, DiningTable::RestaurantId)
                    .to(Restaurant::Table, Restaurant::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(Expr::col(DiningTable::Seats).gt(0))
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(Staff::Table)
            .col(pk_uuid(Staff::Id))
            .col(uuid(Staff::RestaurantId))
            .col(string(Staff::Name))
            .col(string(Staff::Role))
            .col(uuid_null(Staff::TableId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_staff_restaurant")
                    .from(Staff::Table, Staff::RestaurantId)
                    .to(Restaurant::Table, Restaurant::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_staff_table")
                    .from(Staff::Table, Staff::TableId)
                    .to(DiningTable::Table, DiningTable::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(Order::Table)
            .col(pk_uuid(Order::Id))
            .col(uuid(Order::RestaurantId))
            .col(uuid_null(Order::TableId))
            .col(uuid_null(Order::StaffId))
            .col(integer(Order::OrderNumber))
            .col(string(Order::Status).default("pending"))
            .col(decimal_len(Order::TotalPrice, 10, 2).default(0))
            .col(decimal_len(Order::TipAmount, 10, 2).default(0))
            .col(json_binary(Order::Items))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_order_restaurant")
                    .from(Order::Table, Order::RestaurantId)
                    .to(Restaurant::Table, Restaurant::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_order_table")
                    .from(Order::Table, Order::TableId)
                    .to(DiningTable::Table, DiningTable::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_order_staff")
                    .from(Order::Table, Order::StaffId)
                    .to(Staff::Table, Staff::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_menu_restaurant")
                    .table(Menu::Table)
                    .col(Menu::RestaurantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_item_category")
                    .table(MenuItem::Table)
                    .col(MenuItem::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_table_restaurant_number")
                    .table(DiningTable::Table)
                    .col(DiningTable::RestaurantId)
                    .col(DiningTable::TableNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_restaurant_number")
                    .table(Order::Table)
                    .col(Order::RestaurantId)
                    .col(Order::OrderNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Order::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Staff::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(DiningTable::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(MenuItem::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(MenuCategory::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Menu::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Restaurant::Table).to_owned())
            .await?;

        Ok(())
    }
}
