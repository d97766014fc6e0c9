pub mod catalog;
pub mod day_close;
pub mod menus;
pub mod reservations;
pub mod whitelist;
