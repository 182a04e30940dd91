use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(User::Table)
            .col(pk_uuid(User::Id))
            .col(string_uniq(User::Email))
            .col(string(User::PasswordHash))
            .col(uuid(User::RestaurantId))
            .col(string(User::Role).default("admin"))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_user_restaurant")
                    .from(User::Table, User::RestaurantId)
                    .to(Restaurant::Table, Restaurant::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(PasswordReset::Table)
            .col(pk_uuid(PasswordReset::Id))
            .col(uuid(PasswordReset::UserId))
            .col(string_uniq(PasswordReset::TokenHash))
            .col(timestamp(PasswordReset::ExpiresAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_reset_user")
                    .from(PasswordReset::Table, PasswordReset::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PasswordReset::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}
