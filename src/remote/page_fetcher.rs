// src/remote/page_fetcher.rs

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    common::error::FetchError,
    models::{de::u64_from_value, report::FilterParams},
};

/// Uma página da coleção remota. Criada a cada requisição, nunca persistida.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total_pages: u64,
    pub total_count: u64,
}

/// Busca uma página (1-based) de uma coleção remota sob um conjunto de filtros.
/// Erros sobem sem tratamento para quem chamou (o Drain Loop).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Item: Send;

    /// Nome usado em logs e mensagens de erro.
    fn endpoint(&self) -> &str;

    async fn fetch_page(
        &self,
        page: u32,
        filter: &FilterParams,
    ) -> Result<PageResult<Self::Item>, FetchError>;
}

// =============================================================================
//  CONTRATO DO ENDPOINT
// =============================================================================

/// Nomes dos campos de cada endpoint. São definidos pelo backend e fixos por
/// endpoint; aceitam caminho com ponto ("pagination.totalPages").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointContract {
    pub path: String,
    pub items_field: String,
    pub total_pages_field: String,
    pub total_count_field: String,
}

impl EndpointContract {
    pub fn new(path: &str, items_field: &str, total_pages_field: &str, total_count_field: &str) -> Self {
        Self {
            path: path.to_string(),
            items_field: items_field.to_string(),
            total_pages_field: total_pages_field.to_string(),
            total_count_field: total_count_field.to_string(),
        }
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}

/// Interpreta o corpo JSON de uma página segundo o contrato do endpoint.
pub fn parse_page<T: DeserializeOwned>(
    contract: &EndpointContract,
    body: &Value,
) -> Result<PageResult<T>, FetchError> {
    let endpoint = contract.path.as_str();

    let raw_items = lookup(body, &contract.items_field)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FetchError::malformed(endpoint, format!("campo '{}' ausente ou não é uma lista", contract.items_field))
        })?;

    let mut items = Vec::with_capacity(raw_items.len());
    for (index, raw) in raw_items.iter().enumerate() {
        let item = T::deserialize(raw).map_err(|e| {
            FetchError::malformed(endpoint, format!("item {index} de '{}' inválido: {e}", contract.items_field))
        })?;
        items.push(item);
    }

    let total_pages = lookup(body, &contract.total_pages_field)
        .and_then(u64_from_value)
        .ok_or_else(|| {
            FetchError::malformed(endpoint, format!("campo '{}' ausente ou não numérico", contract.total_pages_field))
        })?;

    // Sem total, só dá pra confiar na contagem quando tudo coube numa página
    let total_count = match lookup(body, &contract.total_count_field).and_then(u64_from_value) {
        Some(count) => count,
        None if total_pages <= 1 => items.len() as u64,
        None => {
            return Err(FetchError::malformed(
                endpoint,
                format!("campo '{}' ausente ou não numérico", contract.total_count_field),
            ));
        }
    };

    Ok(PageResult { items, total_pages, total_count })
}

/// Mensagem de erro do backend: `message`/`error` do JSON, ou o texto cru.
fn server_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        ["message", "error"]
            .iter()
            .find_map(|field| json.get(*field).and_then(Value::as_str).map(str::to_string))
    });
    from_json.unwrap_or_else(|| body.trim().chars().take(200).collect())
}

// =============================================================================
//  IMPLEMENTAÇÃO HTTP
// =============================================================================

/// GET `base_url + path?page=N&limit=M&<filtros>` com o bearer do usuário.
pub struct HttpPageFetcher<T> {
    client: reqwest::Client,
    base_url: String,
    contract: EndpointContract,
    page_size: u32,
    bearer: Option<String>,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpPageFetcher<T> {
    pub fn new(client: reqwest::Client, base_url: &str, contract: EndpointContract, page_size: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            contract,
            page_size,
            bearer: None,
            _item: PhantomData,
        }
    }

    /// O token é opaco: só é anexado ao cabeçalho Authorization.
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }
}

#[async_trait]
impl<T> PageFetcher for HttpPageFetcher<T>
where
    T: DeserializeOwned + Send,
{
    type Item = T;

    fn endpoint(&self) -> &str {
        &self.contract.path
    }

    async fn fetch_page(&self, page: u32, filter: &FilterParams) -> Result<PageResult<T>, FetchError> {
        let endpoint = self.endpoint();
        if page == 0 {
            return Err(FetchError::InvalidPage { endpoint: endpoint.to_string(), page });
        }

        let url = format!("{}{}", self.base_url, self.contract.path);
        let mut query = vec![("page", page.to_string()), ("limit", self.page_size.to_string())];
        query.extend(filter.to_query_pairs());

        let mut request = self.client.get(&url).query(&query);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        tracing::debug!("GET {} página {}", endpoint, page);

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::transport(endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::transport(endpoint, e))?;

        if !status.is_success() {
            return Err(FetchError::Server {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message: server_message(&body),
            });
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| FetchError::malformed(endpoint, format!("JSON inválido: {e}")))?;

        parse_page(&self.contract, &json)
    }
}
