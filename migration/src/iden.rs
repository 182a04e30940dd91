use sea_orm_migration::prelude::*;

// Table names follow the plural convention of the hosted schema the
// dashboard was first written against.
#[derive(DeriveIden)]
pub enum Restaurant {
    #[sea_orm(iden = "restaurants")]
    Table,
    Id,
    Name,
    Address,
    PricingTier,
}

#[derive(DeriveIden)]
pub enum Menu {
    #[sea_orm(iden = "menus")]
    Table,
    Id,
    RestaurantId,
    Name,
    Enabled,
}

#[derive(DeriveIden)]
pub enum MenuCategory {
    #[sea_orm(iden = "menu_categories")]
    Table,
    Id,
    MenuId,
    Name,
}

#[derive(DeriveIden)]
pub enum MenuItem {
    #[sea_orm(iden = "menu_items")]
    Table,
    Id,
    MenuId,
    CategoryId,
    Name,
    Description,
    Price,
    Image,
}

#[derive(DeriveIden)]
pub enum DiningTable {
    #[sea_orm(iden = "tables")]
    Table,
    Id,
    RestaurantId,
    TableNumber,
    Seats,
    Shape,
    PosX,
    PosY,
    Occupied,
    OccupiedSince,
    OrderEndTime,
}

#[derive(DeriveIden)]
pub enum Staff {
    #[sea_orm(iden = "staff")]
    Table,
    Id,
    RestaurantId,
    Name,
    Role,
    TableId,
}

#[derive(DeriveIden)]
pub enum Order {
    #[sea_orm(iden = "orders")]
    Table,
    Id,
    RestaurantId,
    TableId,
    StaffId,
    OrderNumber,
    Status,
    TotalPrice,
    TipAmount,
    Items,
    CustomerId,
}

#[derive(DeriveIden)]
pub enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Email,
    PasswordHash,
    RestaurantId,
    Role,
}

#[derive(DeriveIden)]
pub enum PasswordReset {
    #[sea_orm(iden = "password_resets")]
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
}

#[derive(DeriveIden)]
pub enum Feedback {
    #[sea_orm(iden = "feedbacks")]
    Table,
    Id,
    RestaurantId,
    Rating,
    Comment,
}

#[derive(DeriveIden)]
pub enum Promotion {
    #[sea_orm(iden = "promotions")]
    Table,
    Id,
    RestaurantId,
    Title,
    Description,
    StartDate,
    EndDate,
}
