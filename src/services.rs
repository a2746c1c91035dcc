pub mod auth;
pub mod inventory_service;
pub mod sale_service;
