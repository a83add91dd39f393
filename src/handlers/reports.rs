// src/handlers/reports.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::UpstreamAuth, i18n::Locale},
    models::report::{FilterParams, ReportKind, ReportPayload},
};

// GET /api/reports/{kind}
#[utoipa::path(
    get,
    path = "/api/reports/{kind}",
    tag = "Reports",
    responses(
        (status = 200, description = "Relatório completo (todas as páginas drenadas)", body = ReportPayload),
        (status = 400, description = "Filtros inválidos"),
        (status = 401, description = "Token ausente ou recusado pelo backend"),
        (status = 502, description = "Falha no backend do CRM"),
        (status = 504, description = "Backend do CRM não respondeu a tempo")
    ),
    params(
        ("kind" = ReportKind, Path, description = "Tipo do relatório"),
        FilterParams
    ),
    security(("api_jwt" = []))
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    locale: Locale,
    auth: UpstreamAuth,
    Path(kind): Path<ReportKind>,
    Query(filter): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    filter
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    // Chamada direta: sem memoização, o cliente espera o dreno terminar
    let report = app_state
        .report_service
        .run(kind, &filter.normalized(), &auth)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
