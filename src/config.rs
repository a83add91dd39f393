// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{bail, Context};

use crate::{
    common::i18n::I18nStore,
    remote::{CrmEndpoints, CrmRepository},
    services::{report_service::ReportService, view_service::ViewService},
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 500;
const DEFAULT_MAX_PAGES: u32 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub crm_base_url: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub endpoints: CrmEndpoints,
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} inválida ({raw}): {e}")),
        _ => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave/valor.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let crm_base_url = get("CRM_API_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .context("CRM_API_BASE_URL deve ser definida")?;
        if !(crm_base_url.starts_with("http://") || crm_base_url.starts_with("https://")) {
            bail!("CRM_API_BASE_URL deve começar com http:// ou https://");
        }

        let page_size = parse_or(&get, "CRM_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            bail!("CRM_PAGE_SIZE deve estar entre 1 e {MAX_PAGE_SIZE}");
        }

        let max_pages = parse_or(&get, "CRM_MAX_PAGES", DEFAULT_MAX_PAGES)?;
        if max_pages == 0 {
            bail!("CRM_MAX_PAGES deve ser maior que zero");
        }

        let timeout_secs = parse_or(&get, "CRM_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let cache_ttl_secs = parse_or(&get, "REPORT_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;

        // Caminhos podem mudar por instalação; os nomes de campo são fixos
        let mut endpoints = CrmEndpoints::default();
        for (key, contract) in [
            ("CRM_LEADS_PATH", &mut endpoints.leads),
            ("CRM_PAYMENTS_PATH", &mut endpoints.payments),
            ("CRM_TASKS_PATH", &mut endpoints.tasks),
            ("CRM_STAFF_PATH", &mut endpoints.staff),
        ] {
            if let Some(path) = get(key).filter(|p| p.starts_with('/')) {
                contract.path = path;
            }
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            crm_base_url,
            page_size,
            max_pages,
            request_timeout: Duration::from_secs(timeout_secs),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            endpoints,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub report_service: ReportService,
    pub view_service: ViewService,
    pub i18n_store: I18nStore,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Falha ao criar o cliente HTTP")?;

        tracing::info!("✅ Backend do CRM configurado em {}", config.crm_base_url);
        Ok(Self::from_parts(config, client))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(config: AppConfig, client: reqwest::Client) -> Self {
        let repo = CrmRepository::new(
            client,
            &config.crm_base_url,
            config.page_size,
            config.max_pages,
            config.endpoints.clone(),
        );
        let report_service = ReportService::new(repo);
        let view_service = ViewService::new(report_service.clone(), config.cache_ttl);

        Self {
            config: Arc::new(config),
            report_service,
            view_service,
            i18n_store: I18nStore::new(),
        }
    }
}
