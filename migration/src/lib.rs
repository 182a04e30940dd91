pub use sea_orm_migration::prelude::*;

mod iden;
mod m20240801_000001_create_restaurant_tables;
mod m20240805_000002_user_table;
mod m20240816_000003_add_feedback_and_promotions;
mod m20240820_000004_add_order_customer;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240801_000001_create_restaurant_tables::Migration),
            Box::new(m20240805_000002_user_table::Migration),
            Box::new(m20240816_000003_add_feedback_and_promotions::Migration),
            Box::new(m20240820_000004_add_order_customer::Migration),
        ]
    }
}
