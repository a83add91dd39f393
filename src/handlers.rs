// src/handlers.rs

pub mod reports;
pub mod views;
