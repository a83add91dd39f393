// src/remote/crm_repo.rs

use serde::de::DeserializeOwned;

use crate::{
    common::error::FetchError,
    middleware::auth::UpstreamAuth,
    models::{
        crm::{Lead, Payment, Staff, Task},
        report::FilterParams,
    },
    remote::{
        drain::drain_all,
        page_fetcher::{EndpointContract, HttpPageFetcher},
    },
};

/// Contratos dos endpoints do backend do CRM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmEndpoints {
    pub leads: EndpointContract,
    pub payments: EndpointContract,
    pub tasks: EndpointContract,
    pub staff: EndpointContract,
}

impl Default for CrmEndpoints {
    fn default() -> Self {
        Self {
            leads: EndpointContract::new("/api/leads", "leads", "totalPages", "totalLeads"),
            payments: EndpointContract::new("/api/payments", "payments", "totalPages", "totalPayments"),
            tasks: EndpointContract::new("/api/tasks", "tasks", "totalPages", "totalTasks"),
            staff: EndpointContract::new("/api/staff", "staff", "totalPages", "totalStaff"),
        }
    }
}

// O repositório do CRM remoto: cada método drena uma coleção inteira
#[derive(Clone)]
pub struct CrmRepository {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    max_pages: u32,
    endpoints: CrmEndpoints,
}

impl CrmRepository {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        page_size: u32,
        max_pages: u32,
        endpoints: CrmEndpoints,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            page_size,
            max_pages,
            endpoints,
        }
    }

    fn fetcher<T>(&self, contract: &EndpointContract, auth: &UpstreamAuth) -> HttpPageFetcher<T> {
        HttpPageFetcher::new(self.client.clone(), &self.base_url, contract.clone(), self.page_size)
            .with_bearer(auth.token())
    }

    async fn drain<T>(
        &self,
        contract: &EndpointContract,
        filter: &FilterParams,
        auth: &UpstreamAuth,
    ) -> Result<Vec<T>, FetchError>
    where
        T: DeserializeOwned + Send,
    {
        let fetcher = self.fetcher::<T>(contract, auth);
        let drained = drain_all(&fetcher, filter, self.max_pages).await?;
        tracing::debug!(
            "{}: {} itens drenados ({} páginas, total informado {})",
            contract.path,
            drained.items.len(),
            drained.total_pages,
            drained.total_count
        );
        Ok(drained.items)
    }

    pub async fn drain_leads(&self, filter: &FilterParams, auth: &UpstreamAuth) -> Result<Vec<Lead>, FetchError> {
        self.drain(&self.endpoints.leads, filter, auth).await
    }

    pub async fn drain_payments(&self, filter: &FilterParams, auth: &UpstreamAuth) -> Result<Vec<Payment>, FetchError> {
        self.drain(&self.endpoints.payments, filter, auth).await
    }

    pub async fn drain_tasks(&self, filter: &FilterParams, auth: &UpstreamAuth) -> Result<Vec<Task>, FetchError> {
        self.drain(&self.endpoints.tasks, filter, auth).await
    }

    /// Lista de staff: só o filtro de cargo se aplica; status/busca/datas são
    /// filtros de leads e tarefas.
    pub async fn drain_staff(&self, filter: &FilterParams, auth: &UpstreamAuth) -> Result<Vec<Staff>, FetchError> {
        let staff_filter = FilterParams {
            role: filter.role.clone(),
            ..Default::default()
        };
        self.drain(&self.endpoints.staff, &staff_filter, auth).await
    }
}
