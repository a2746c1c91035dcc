// src/handlers.rs

pub mod inventory;
pub mod sales;
