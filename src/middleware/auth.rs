// src/middleware/auth.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use sha2::{Digest, Sha256};

use crate::common::error::AppError;

/// Token do usuário, repassado sem alteração para o backend do CRM.
/// Este serviço não valida o token: quem decide é o backend.
#[derive(Clone)]
pub struct UpstreamAuth(pub String);

// Não vazar o token nos logs
impl std::fmt::Debug for UpstreamAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UpstreamAuth(***)")
    }
}

impl UpstreamAuth {
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Identifica o dono do token sem guardar o token em memória.
    pub fn owner(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl<S> FromRequestParts<S> for UpstreamAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::MissingCredentials)?;

        let token = bearer.token().trim();
        if token.is_empty() {
            return Err(AppError::MissingCredentials);
        }

        Ok(UpstreamAuth(token.to_string()))
    }
}
