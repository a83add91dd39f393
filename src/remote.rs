// src/remote.rs
//
// Acesso ao backend do CRM: busca de página, dreno e o repositório por coleção.

pub mod crm_repo;
pub mod drain;
pub mod page_fetcher;
#[cfg(test)]
pub(crate) mod testing;

pub use crm_repo::{CrmEndpoints, CrmRepository};
