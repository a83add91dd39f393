// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::aggregation;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Reports ---
        handlers::reports::get_report,

        // --- Views ---
        handlers::views::apply_filter,
        handlers::views::get_view,
        handlers::views::refresh_view,
        handlers::views::remove_view,
    ),
    components(
        schemas(
            // --- Filtros ---
            models::report::FilterParams,
            models::report::ReportKind,

            // --- Relatórios ---
            aggregation::ChartPoint,
            models::report::LeadStatusReport,
            models::report::PaymentModeReport,
            models::report::ProductPaymentRow,
            models::report::ProductPaymentReport,
            models::report::StaffPerformanceRow,
            models::report::StaffPerformanceReport,
            models::report::LeadTrendRow,
            models::report::LeadTrendReport,
            models::report::ReportPayload,

            // --- Views ---
            models::report::ReportState,
            models::report::ViewSnapshot,
        )
    ),
    tags(
        (name = "Reports", description = "Relatórios agregados a partir do backend do CRM"),
        (name = "Views", description = "Estado de exibição dos relatórios (filtro, carregamento, memoização)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        // O mesmo token é repassado ao backend do CRM
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
