pub mod auth;
pub mod catalog;
pub mod menu;
pub mod reservation;
pub mod whitelist;
