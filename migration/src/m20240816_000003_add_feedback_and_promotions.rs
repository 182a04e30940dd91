use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Feedback::Table)
            .col(pk_uuid(Feedback::Id))
            .col(uuid(Feedback::RestaurantId))
            .col(small_integer(Feedback::Rating))
            .col(text(Feedback::Comment).default(""))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_feedback_restaurant")
                    .from(Feedback::Table, Feedback::RestaurantId)
                    .to(Restaurant::Table, Restaurant::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(
                Expr::col(Feedback::Rating)
                    .gte(1)
                    .and(Expr::col(Feedback::Rating).lte(5)),
            )
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(Promotion::Table)
            .col(pk_uuid(Promotion::Id))
            .col(uuid(Promotion::RestaurantId))
            .col(string(Promotion::Title))
            .col(text(Promotion::Description).default(""))
            .col(date(Promotion::StartDate))
            .col(date(Promotion::EndDate))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_promotion_restaurant")
                    .from(Promotion::Table, Promotion::RestaurantId)
                    .to(Restaurant::Table, Restaurant::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(Expr::col(Promotion::EndDate).gte(Expr::col(Promotion::StartDate)))
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_feedback_restaurant")
                    .table(Feedback::Table)
                    .col(Feedback::RestaurantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Promotion::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Feedback::Table).to_owned())
            .await?;

        Ok(())
    }
}
