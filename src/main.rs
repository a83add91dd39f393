//src/main.rs

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod aggregation;
mod common;
mod config;
mod docs;
mod handlers;
mod middleware;
mod models;
mod remote;
mod services;

// Importações principais
use crate::config::AppState;
use crate::docs::ApiDoc;

/// Monta todas as rotas. Separado do `main` para os testes usarem o mesmo router.
fn build_router(app_state: AppState) -> Router {
    // Relatórios sob demanda (a resposta espera o dreno terminar)
    let report_routes = Router::new()
        .route("/{kind}", get(handlers::reports::get_report));

    // Views: filtro aplicado, estado de carregamento, cancelamento e cache
    let view_routes = Router::new()
        .route("/{view_id}/{kind}"
               ,put(handlers::views::apply_filter)
               .get(handlers::views::get_view)
               .delete(handlers::views::remove_view)
        )
        .route("/{view_id}/{kind}/refresh"
               ,post(handlers::views::refresh_view)
        );

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/reports", report_routes)
        .nest("/api/views", view_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger; RUST_LOG sobrescreve o nível padrão
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new().context("Falha ao inicializar o estado da aplicação.")?;
    let addr = app_state.config.bind_addr.clone();

    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}
