// src/services.rs

pub mod report_service;
pub mod view_service;
