// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// =============================================================================
//  ERROS DO BACKEND REMOTO (Page Fetcher / Drain)
// =============================================================================

#[derive(Debug, Error)]
pub enum FetchError {
    // Rede, DNS, conexão recusada, timeout...
    #[error("Falha de rede ao acessar {endpoint}: {message}")]
    Transport {
        endpoint: String,
        timeout: bool,
        message: String,
    },

    // Resposta não-2xx
    #[error("Backend respondeu {status} em {endpoint}: {message}")]
    Server {
        endpoint: String,
        status: u16,
        message: String,
    },

    // JSON sem os campos de paginação esperados
    #[error("Resposta inesperada de {endpoint}: {detail}")]
    Malformed { endpoint: String, detail: String },

    #[error("{endpoint} informou {total_pages} páginas, acima do limite de {max_pages}")]
    PageLimitExceeded {
        endpoint: String,
        total_pages: u64,
        max_pages: u32,
    },

    #[error("Número de página inválido para {endpoint}: {page}")]
    InvalidPage { endpoint: String, page: u32 },
}

impl FetchError {
    pub fn transport(endpoint: &str, err: reqwest::Error) -> Self {
        FetchError::Transport {
            endpoint: endpoint.to_string(),
            timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }

    pub fn malformed(endpoint: &str, detail: impl Into<String>) -> Self {
        FetchError::Malformed {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }
}

// =============================================================================
//  ERRO DA APLICAÇÃO
// =============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Token de autenticação ausente")]
    MissingCredentials,

    #[error("View não encontrada")]
    ViewNotFound,

    #[error("Falha no backend do CRM: {0}")]
    Upstream(#[from] FetchError),

    // `anyhow::Error` guarda o contexto do erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Código estável, usado como chave de tradução e no corpo da resposta.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::MissingCredentials => "missing_credentials",
            AppError::ViewNotFound => "view_not_found",
            AppError::Upstream(fetch) => match fetch {
                FetchError::Server { status: 401 | 403, .. } => "upstream_unauthorized",
                FetchError::Server { .. } => "upstream_error",
                FetchError::Transport { timeout: true, .. } => "upstream_timeout",
                FetchError::Transport { .. } => "upstream_unavailable",
                FetchError::Malformed { .. } => "upstream_malformed",
                FetchError::PageLimitExceeded { .. } => "too_many_pages",
                FetchError::InvalidPage { .. } => "internal_error",
            },
            AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AppError::ViewNotFound => StatusCode::NOT_FOUND,
            AppError::Upstream(fetch) => match fetch {
                // O token é do usuário: repassamos a recusa do backend
                FetchError::Server { status: 401, .. } => StatusCode::UNAUTHORIZED,
                FetchError::Server { status: 403, .. } => StatusCode::FORBIDDEN,
                FetchError::Transport { timeout: true, .. } => StatusCode::GATEWAY_TIMEOUT,
                FetchError::InvalidPage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        } else if matches!(self, AppError::Upstream(_)) {
            tracing::warn!("Backend do CRM recusou a requisição: {}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors, locale, store)),
            _ => None,
        };

        ApiError {
            status,
            code: self.code(),
            message: store.translate(&locale.0, self.code()),
            details,
        }
    }
}

fn validation_details(
    errors: &validator::ValidationErrors,
    locale: &Locale,
    store: &I18nStore,
) -> Value {
    let mut details: HashMap<String, Vec<String>> = HashMap::new();
    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors
            .iter()
            .map(|e| {
                let code = e.message.as_deref().unwrap_or(&*e.code);
                store.translate(&locale.0, code)
            })
            .collect();
        details.insert(field.to_string(), messages);
    }
    json!(details)
}

// =============================================================================
//  RESPOSTA HTTP
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "code": self.code, "details": details }),
            None => json!({ "error": self.message, "code": self.code }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Sem Locale disponível (ex: rejeição de extrator), responde em inglês.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::new())
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    use crate::models::report::FilterParams;

    fn server(status: u16) -> AppError {
        AppError::Upstream(FetchError::Server {
            endpoint: "/api/leads".into(),
            status,
            message: "boom".into(),
        })
    }

    #[test]
    fn test_upstream_status_mapping() {
        assert_eq!(server(401).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(server(403).status(), StatusCode::FORBIDDEN);
        assert_eq!(server(500).status(), StatusCode::BAD_GATEWAY);

        let timeout = AppError::Upstream(FetchError::Transport {
            endpoint: "/api/leads".into(),
            timeout: true,
            message: "timed out".into(),
        });
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.code(), "upstream_timeout");
    }

    #[test]
    fn test_to_api_error_is_localized() {
        let store = I18nStore::new();
        let api = AppError::ViewNotFound.to_api_error(&Locale("pt".into()), &store);
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.message, "View não encontrada.");
        assert!(api.details.is_none());
    }

    #[test]
    fn test_validation_details_per_field() {
        let params = FilterParams { search: Some("x".repeat(300)), ..Default::default() };
        let err = AppError::from(params.validate().unwrap_err());

        let api = err.to_api_error(&Locale("en".into()), &I18nStore::new());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert_eq!(details["search"][0], "Value is too long.");
    }
}
