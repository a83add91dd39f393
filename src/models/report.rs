// src/models/report.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::aggregation::{key::is_blank_or_sentinel, ChartPoint};

// =============================================================================
//  FILTROS
// =============================================================================

/// Filtros repassados ao backend em todas as páginas de um dreno.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Validate, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
#[validate(schema(function = "validate_date_range"))]
pub struct FilterParams {
    #[validate(length(max = 50, message = "too_long"))]
    #[schema(example = "sales")]
    pub role: Option<String>,

    #[validate(length(max = 50, message = "too_long"))]
    #[schema(example = "closed")]
    pub status: Option<String>,

    #[validate(length(max = 200, message = "too_long"))]
    #[schema(example = "maria")]
    pub search: Option<String>,

    #[validate(length(max = 64, message = "too_long"))]
    pub assigned_to: Option<String>,

    #[schema(example = "2024-01-01")]
    pub start_date: Option<NaiveDate>,

    #[schema(example = "2024-12-31")]
    pub end_date: Option<NaiveDate>,
}

fn validate_date_range(params: &FilterParams) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
        if start > end {
            let mut err = ValidationError::new("date_range");
            err.message = Some("invalid_date_range".into());
            return Err(err);
        }
    }
    Ok(())
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !is_blank_or_sentinel(v))
        .map(|v| v.trim().to_string())
}

impl FilterParams {
    /// Remove espaços e valores vazios, para que `?status=` e nenhum status
    /// sejam o mesmo filtro (importante na memoização das views).
    pub fn normalized(&self) -> Self {
        Self {
            role: clean(&self.role),
            status: clean(&self.status),
            search: clean(&self.search),
            assigned_to: clean(&self.assigned_to),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Pares de query string no formato que o backend espera.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let normalized = self.normalized();
        let mut pairs = Vec::new();
        if let Some(role) = normalized.role {
            pairs.push(("role", role));
        }
        if let Some(status) = normalized.status {
            pairs.push(("status", status));
        }
        if let Some(search) = normalized.search {
            pairs.push(("search", search));
        }
        if let Some(assigned_to) = normalized.assigned_to {
            pairs.push(("assignedTo", assigned_to));
        }
        if let Some(start) = normalized.start_date {
            pairs.push(("startDate", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = normalized.end_date {
            pairs.push(("endDate", end.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

// =============================================================================
//  RELATÓRIOS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    LeadStatus,
    PaymentModes,
    ProductPayments,
    StaffPerformance,
    LeadTrend,
}

// 1. Leads por status (cards/donut do dashboard)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadStatusReport {
    pub total_leads: u64,
    pub unknown_status: u64,
    pub points: Vec<ChartPoint>,
}

// 2. Donut de pagamentos por forma de pagamento
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentModeReport {
    pub total_payments: u64,
    pub total_amount: Decimal,
    pub points: Vec<ChartPoint>,
}

// 3. Detalhe de pagamentos por produto
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPaymentRow {
    #[schema(example = "65f1c0ffee")]
    pub product_id: String,
    #[schema(example = "Plano Ouro")]
    pub product_name: String,
    pub payments: u64,
    pub amount: Decimal,
    // % do faturamento total
    pub share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPaymentReport {
    pub total_payments: u64,
    pub total_amount: Decimal,
    pub rows: Vec<ProductPaymentRow>,
}

// 4. Relatório de staff
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffPerformanceRow {
    pub staff_id: String,
    pub staff_name: String,
    pub role: Option<String>,
    pub total_leads: u64,
    pub closed_leads: u64,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub conversion_rate: Decimal,
    pub task_completion_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffPerformanceReport {
    pub rows: Vec<StaffPerformanceRow>,
    /// Atividade atribuída a ids fora da lista de staff (ou sem responsável).
    pub unassigned: Option<StaffPerformanceRow>,
}

// 5. Tendência mensal de leads
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadTrendRow {
    /// `YYYY-MM` em UTC, ou "Unknown" sem data
    #[schema(example = "2024-03")]
    pub month: String,
    pub leads: u64,
    // Soma do leadValue no mês
    pub value: Decimal,
    // % do total de leads
    pub share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadTrendReport {
    pub total_leads: u64,
    pub total_value: Decimal,
    pub rows: Vec<LeadTrendRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum ReportPayload {
    LeadStatus(LeadStatusReport),
    PaymentModes(PaymentModeReport),
    ProductPayments(ProductPaymentReport),
    StaffPerformance(StaffPerformanceReport),
    LeadTrend(LeadTrendReport),
}

impl ReportPayload {
    /// Sem nenhum bucket/linha para mostrar (estado "vazio", diferente de erro).
    pub fn is_empty(&self) -> bool {
        match self {
            ReportPayload::LeadStatus(r) => r.points.is_empty(),
            ReportPayload::PaymentModes(r) => r.points.is_empty(),
            ReportPayload::ProductPayments(r) => r.rows.is_empty(),
            ReportPayload::StaffPerformance(r) => r.rows.is_empty() && r.unassigned.is_none(),
            ReportPayload::LeadTrend(r) => r.rows.is_empty(),
        }
    }
}

// =============================================================================
//  ESTADO DA VIEW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ReportState {
    Loading,
    Failed { code: String, message: String },
    Empty,
    Ready { report: ReportPayload },
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub view_id: String,
    pub kind: ReportKind,
    pub filter: FilterParams,
    pub generation: u64,
    pub state: ReportState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn test_normalized_drops_blank_and_sentinels() {
        let params = FilterParams {
            role: Some("  ".into()),
            status: Some(" closed ".into()),
            search: Some("undefined".into()),
            ..Default::default()
        };
        let normalized = params.normalized();
        assert_eq!(normalized.role, None);
        assert_eq!(normalized.status.as_deref(), Some("closed"));
        assert_eq!(normalized.search, None);
        assert_eq!(normalized, FilterParams { status: Some("closed".into()), ..Default::default() });
    }

    #[test]
    fn test_query_pairs_use_backend_names() {
        let params = FilterParams {
            assigned_to: Some("S1".into()),
            start_date: Some(date("2024-01-01")),
            end_date: Some(date("2024-01-31")),
            ..Default::default()
        };
        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("assignedTo", "S1".to_string()),
                ("startDate", "2024-01-01".to_string()),
                ("endDate", "2024-01-31".to_string()),
            ]
        );
    }

    #[test]
    fn test_inverted_date_range_fails_validation() {
        let params = FilterParams {
            start_date: Some(date("2024-02-01")),
            end_date: Some(date("2024-01-01")),
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let ok = FilterParams { start_date: Some(date("2024-01-01")), ..Default::default() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_search_too_long_fails_validation() {
        let params = FilterParams { search: Some("x".repeat(201)), ..Default::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_report_kind_is_kebab_case() {
        let kind: ReportKind = serde_json::from_value(json!("staff-performance")).unwrap();
        assert_eq!(kind, ReportKind::StaffPerformance);
    }

    #[test]
    fn test_state_serialization_shape() {
        let state = ReportState::Failed { code: "upstream_unavailable".into(), message: "x".into() };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"state": "failed", "code": "upstream_unavailable", "message": "x"})
        );
        assert_eq!(serde_json::to_value(ReportState::Empty).unwrap(), json!({"state": "empty"}));
    }
}
