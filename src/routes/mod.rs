pub mod catalog;
pub mod health;
pub mod menus;
pub mod reservations;
pub mod whitelist;
