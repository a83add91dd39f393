// src/handlers/views.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        i18n::I18nStore,
    },
    config::AppState,
    middleware::{auth::UpstreamAuth, i18n::Locale},
    models::report::{FilterParams, ReportKind, ReportState, ViewSnapshot},
};

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct ViewPath {
    /// Identificador da tela/painel no cliente
    #[validate(length(max = 64, message = "too_long"))]
    #[param(example = "dashboard")]
    pub view_id: String,
    pub kind: ReportKind,
}

impl ViewPath {
    fn validated(&self, locale: &Locale, store: &I18nStore) -> Result<(), ApiError> {
        self.validate()
            .map_err(|e| AppError::ValidationError(e).to_api_error(locale, store))
    }
}

// A mensagem de falha é gravada em português no registro; aqui vai no idioma do cliente
fn localized(mut snapshot: ViewSnapshot, locale: &Locale, store: &I18nStore) -> ViewSnapshot {
    if let ReportState::Failed { code, message } = &mut snapshot.state {
        *message = store.translate(&locale.0, code);
    }
    snapshot
}

// PUT /api/views/{view_id}/{kind}
#[utoipa::path(
    put,
    path = "/api/views/{view_id}/{kind}",
    tag = "Views",
    request_body = FilterParams,
    responses(
        (status = 202, description = "Filtro aplicado; dreno em andamento ou resultado memoizado", body = ViewSnapshot),
        (status = 400, description = "Filtros inválidos"),
        (status = 401, description = "Token ausente")
    ),
    params(ViewPath),
    security(("api_jwt" = []))
)]
pub async fn apply_filter(
    State(app_state): State<AppState>,
    locale: Locale,
    auth: UpstreamAuth,
    Path(path): Path<ViewPath>,
    Json(filter): Json<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    path.validated(&locale, &app_state.i18n_store)?;
    filter
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let snapshot = app_state
        .view_service
        .apply(&path.view_id, path.kind, filter, auth, false)
        .await;

    Ok((StatusCode::ACCEPTED, Json(localized(snapshot, &locale, &app_state.i18n_store))))
}

// GET /api/views/{view_id}/{kind}
#[utoipa::path(
    get,
    path = "/api/views/{view_id}/{kind}",
    tag = "Views",
    responses(
        (status = 200, description = "Estado atual da view (loading, failed, empty ou ready)", body = ViewSnapshot),
        (status = 401, description = "Token ausente"),
        (status = 404, description = "View não encontrada para este token")
    ),
    params(ViewPath),
    security(("api_jwt" = []))
)]
pub async fn get_view(
    State(app_state): State<AppState>,
    locale: Locale,
    auth: UpstreamAuth,
    Path(path): Path<ViewPath>,
) -> Result<impl IntoResponse, ApiError> {
    path.validated(&locale, &app_state.i18n_store)?;

    let snapshot = app_state
        .view_service
        .snapshot(&path.view_id, path.kind, &auth)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(localized(snapshot, &locale, &app_state.i18n_store))))
}

// POST /api/views/{view_id}/{kind}/refresh
#[utoipa::path(
    post,
    path = "/api/views/{view_id}/{kind}/refresh",
    tag = "Views",
    responses(
        (status = 202, description = "Novo dreno iniciado com o filtro atual", body = ViewSnapshot),
        (status = 401, description = "Token ausente"),
        (status = 404, description = "View não encontrada")
    ),
    params(ViewPath),
    security(("api_jwt" = []))
)]
pub async fn refresh_view(
    State(app_state): State<AppState>,
    locale: Locale,
    auth: UpstreamAuth,
    Path(path): Path<ViewPath>,
) -> Result<impl IntoResponse, ApiError> {
    path.validated(&locale, &app_state.i18n_store)?;

    let snapshot = app_state
        .view_service
        .refresh(&path.view_id, path.kind, auth)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::ACCEPTED, Json(localized(snapshot, &locale, &app_state.i18n_store))))
}

// DELETE /api/views/{view_id}/{kind}
#[utoipa::path(
    delete,
    path = "/api/views/{view_id}/{kind}",
    tag = "Views",
    responses(
        (status = 204, description = "View removida; dreno em andamento cancelado"),
        (status = 401, description = "Token ausente"),
        (status = 404, description = "View não encontrada para este token")
    ),
    params(ViewPath),
    security(("api_jwt" = []))
)]
pub async fn remove_view(
    State(app_state): State<AppState>,
    locale: Locale,
    auth: UpstreamAuth,
    Path(path): Path<ViewPath>,
) -> Result<impl IntoResponse, ApiError> {
    path.validated(&locale, &app_state.i18n_store)?;

    app_state
        .view_service
        .remove(&path.view_id, path.kind, &auth)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
