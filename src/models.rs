// src/models.rs

pub mod crm;
pub mod de;
pub mod report;
