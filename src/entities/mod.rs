pub mod prelude;

pub mod dining_table;
pub mod feedback;
pub mod menu;
pub mod menu_category;
pub mod menu_item;
pub mod order;
pub mod password_reset;
pub mod promotion;
pub mod restaurant;
pub mod staff;
pub mod user;
