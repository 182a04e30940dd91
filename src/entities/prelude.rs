pub use super::dining_table::Entity as DiningTable;
pub use super::feedback::Entity as Feedback;
pub use super::menu::Entity as Menu;
pub use super::menu_category::Entity as MenuCategory;
pub use super::menu_item::Entity as MenuItem;
pub use super::order::Entity as Order;
pub use super::password_reset::Entity as PasswordReset;
pub use super::promotion::Entity as Promotion;
pub use super::restaurant::Entity as Restaurant;
pub use super::staff::Entity as Staff;
pub use super::user::Entity as User;
