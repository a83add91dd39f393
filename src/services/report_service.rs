// src/services/report_service.rs

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::{
    aggregation::{
        count_percentage, group_by, group_by_sum, key_label, present, AggregationKey, EntityCounters,
        EntityTally, Measure, SortOrder,
    },
    common::error::AppError,
    middleware::auth::UpstreamAuth,
    models::{
        crm::{ref_key, Lead, Payment, Staff, Task},
        report::{
            FilterParams, LeadStatusReport, LeadTrendReport, LeadTrendRow, PaymentModeReport, ProductPaymentReport,
            ProductPaymentRow, ReportKind, ReportPayload, StaffPerformanceReport, StaffPerformanceRow,
        },
    },
    remote::CrmRepository,
};

const CLOSED_LEAD_STATUSES: [&str; 3] = ["closed", "won", "converted"];
const COMPLETED_TASK_STATUSES: [&str; 2] = ["completed", "done"];

// Nomes usados dentro do EntityTally
const LEADS: &str = "leads";
const TASKS: &str = "tasks";
const CLOSED: &str = "closed";
const COMPLETED: &str = "completed";

pub const UNASSIGNED_ID: &str = "unassigned";
const UNASSIGNED_NAME: &str = "Unassigned";

#[derive(Clone)]
pub struct ReportService {
    repo: CrmRepository,
}

impl ReportService {
    pub fn new(repo: CrmRepository) -> Self {
        Self { repo }
    }

    /// Drena o que o relatório precisa e monta o payload.
    pub async fn run(
        &self,
        kind: ReportKind,
        filter: &FilterParams,
        auth: &UpstreamAuth,
    ) -> Result<ReportPayload, AppError> {
        let payload = match kind {
            ReportKind::LeadStatus => ReportPayload::LeadStatus(self.lead_status(filter, auth).await?),
            ReportKind::PaymentModes => ReportPayload::PaymentModes(self.payment_modes(filter, auth).await?),
            ReportKind::ProductPayments => {
                ReportPayload::ProductPayments(self.product_payments(filter, auth).await?)
            }
            ReportKind::StaffPerformance => {
                ReportPayload::StaffPerformance(self.staff_performance(filter, auth).await?)
            }
            ReportKind::LeadTrend => ReportPayload::LeadTrend(self.lead_trend(filter, auth).await?),
        };
        Ok(payload)
    }

    // =========================================================================
    //  1. LEADS
    // =========================================================================

    pub async fn lead_status(&self, filter: &FilterParams, auth: &UpstreamAuth) -> Result<LeadStatusReport, AppError> {
        let leads = self.repo.drain_leads(filter, auth).await?;
        Ok(build_lead_status(&leads))
    }

    pub async fn lead_trend(&self, filter: &FilterParams, auth: &UpstreamAuth) -> Result<LeadTrendReport, AppError> {
        let leads = self.repo.drain_leads(filter, auth).await?;
        Ok(build_lead_trend(&leads))
    }

    // =========================================================================
    //  2. PAGAMENTOS
    // =========================================================================

    pub async fn payment_modes(&self, filter: &FilterParams, auth: &UpstreamAuth) -> Result<PaymentModeReport, AppError> {
        let payments = self.repo.drain_payments(filter, auth).await?;
        Ok(build_payment_modes(&payments))
    }

    pub async fn product_payments(
        &self,
        filter: &FilterParams,
        auth: &UpstreamAuth,
    ) -> Result<ProductPaymentReport, AppError> {
        let payments = self.repo.drain_payments(filter, auth).await?;
        Ok(build_product_payments(&payments))
    }

    // =========================================================================
    //  3. STAFF
    // =========================================================================

    /// Três drenos em sequência: staff, leads e tarefas.
    pub async fn staff_performance(
        &self,
        filter: &FilterParams,
        auth: &UpstreamAuth,
    ) -> Result<StaffPerformanceReport, AppError> {
        let staff = self.repo.drain_staff(filter, auth).await?;
        let leads = self.repo.drain_leads(filter, auth).await?;
        let tasks = self.repo.drain_tasks(filter, auth).await?;

        tracing::debug!(
            "staff-performance: {} staff, {} leads, {} tarefas",
            staff.len(),
            leads.len(),
            tasks.len()
        );
        Ok(build_staff_performance(&staff, &leads, &tasks))
    }
}

// =============================================================================
//  BUILDERS (funções puras sobre as coleções drenadas)
// =============================================================================

fn status_in(status: Option<&str>, accepted: &[&str]) -> bool {
    status
        .map(str::trim)
        .is_some_and(|s| accepted.iter().any(|a| s.eq_ignore_ascii_case(a)))
}

pub fn build_lead_status(leads: &[Lead]) -> LeadStatusReport {
    let buckets = group_by(leads, |lead| AggregationKey::from_field(lead.status.as_deref()));

    LeadStatusReport {
        total_leads: buckets.total_count(),
        unknown_status: buckets.unknown_count(),
        points: present(&buckets, Measure::Count, SortOrder::CountDesc, key_label),
    }
}

pub fn build_payment_modes(payments: &[Payment]) -> PaymentModeReport {
    let buckets = group_by_sum(
        payments,
        |payment| AggregationKey::from_field(payment.payment_mode.as_deref()),
        |payment| payment.amount,
    );

    PaymentModeReport {
        total_payments: buckets.total_count(),
        total_amount: buckets.total_sum(),
        points: present(&buckets, Measure::Sum, SortOrder::ValueDesc, key_label),
    }
}

pub fn build_product_payments(payments: &[Payment]) -> ProductPaymentReport {
    // Nome do produto: o primeiro populado que aparecer; senão, o próprio id
    let mut names: HashMap<AggregationKey, String> = HashMap::new();
    for product in payments.iter().filter_map(|p| p.product.as_ref()) {
        if let Some(name) = product.name.as_deref().filter(|n| !n.trim().is_empty()) {
            names.entry(product.key()).or_insert_with(|| name.trim().to_string());
        }
    }

    let buckets = group_by_sum(payments, |payment| ref_key(&payment.product), |payment| payment.amount);
    let label = |key: &AggregationKey| names.get(key).cloned().unwrap_or_else(|| key.to_string());

    let rows = present(&buckets, Measure::Sum, SortOrder::ValueDesc, label)
        .into_iter()
        .map(|point| ProductPaymentRow {
            product_id: point.key.to_string(),
            product_name: point.label,
            payments: point.count,
            amount: point.value,
            share: point.percent,
        })
        .collect();

    ProductPaymentReport {
        total_payments: buckets.total_count(),
        total_amount: buckets.total_sum(),
        rows,
    }
}

pub fn build_lead_trend(leads: &[Lead]) -> LeadTrendReport {
    let buckets = group_by_sum(
        leads,
        |lead| {
            let month = lead.created_at.map(|at| at.format("%Y-%m").to_string());
            AggregationKey::from_field(month.as_deref())
        },
        |lead| lead.lead_value,
    );

    let values: HashMap<&AggregationKey, Decimal> = buckets.iter().map(|b| (&b.key, b.sum)).collect();

    // Ordem cronológica; o share é sobre a contagem de leads
    let rows = present(&buckets, Measure::Count, SortOrder::LabelAsc, key_label)
        .into_iter()
        .map(|point| LeadTrendRow {
            value: values.get(&point.key).copied().unwrap_or_default(),
            month: point.label,
            leads: point.count,
            share: point.percent,
        })
        .collect();

    LeadTrendReport {
        total_leads: buckets.total_count(),
        total_value: buckets.total_sum(),
        rows,
    }
}

/// Contadores de um membro (ou do grupo "Unassigned").
#[derive(Debug, Default, Clone, Copy)]
struct Activity {
    total_leads: u64,
    closed_leads: u64,
    total_tasks: u64,
    completed_tasks: u64,
}

impl Activity {
    fn absorb(&mut self, counters: &EntityCounters) {
        self.total_leads += counters.total(LEADS);
        self.closed_leads += counters.metric(CLOSED);
        self.total_tasks += counters.total(TASKS);
        self.completed_tasks += counters.metric(COMPLETED);
    }

    fn is_idle(&self) -> bool {
        self.total_leads == 0 && self.total_tasks == 0
    }

    fn into_row(self, staff_id: String, staff_name: String, role: Option<String>) -> StaffPerformanceRow {
        StaffPerformanceRow {
            staff_id,
            staff_name,
            role,
            total_leads: self.total_leads,
            closed_leads: self.closed_leads,
            total_tasks: self.total_tasks,
            completed_tasks: self.completed_tasks,
            conversion_rate: count_percentage(self.closed_leads, self.total_leads),
            task_completion_rate: count_percentage(self.completed_tasks, self.total_tasks),
        }
    }
}

fn display_name(member: &Staff, key: &AggregationKey) -> String {
    member
        .name
        .as_deref()
        .or(member.email.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| key.to_string(), str::to_string)
}

/// Uma passada por coleção no `EntityTally`; nunca staff × leads × tarefas.
pub fn build_staff_performance(staff: &[Staff], leads: &[Lead], tasks: &[Task]) -> StaffPerformanceReport {
    let mut tally = EntityTally::new();
    let mut roster: Vec<(AggregationKey, &Staff)> = Vec::with_capacity(staff.len());
    let mut known: HashSet<AggregationKey> = HashSet::with_capacity(staff.len());

    for member in staff {
        let key = AggregationKey::from_field(member.id.as_deref());
        // Sem id não há como receber atribuições; ids repetidos contam uma vez
        if key.is_unknown() || !known.insert(key.clone()) {
            continue;
        }
        tally.register(key.clone());
        roster.push((key, member));
    }

    tally.absorb(
        LEADS,
        leads,
        |lead| ref_key(&lead.assigned_to),
        |lead| status_in(lead.status.as_deref(), &CLOSED_LEAD_STATUSES).then(|| AggregationKey::from(CLOSED)),
    );
    tally.absorb(
        TASKS,
        tasks,
        |task| ref_key(&task.assigned_to),
        |task| {
            status_in(task.status.as_deref(), &COMPLETED_TASK_STATUSES).then(|| AggregationKey::from(COMPLETED))
        },
    );

    let mut rows: Vec<StaffPerformanceRow> = roster
        .into_iter()
        .map(|(key, member)| {
            let mut activity = Activity::default();
            if let Some(counters) = tally.get(&key) {
                activity.absorb(counters);
            }
            activity.into_row(key.to_string(), display_name(member, &key), member.role.clone())
        })
        .collect();

    rows.sort_by(|a, b| {
        b.closed_leads
            .cmp(&a.closed_leads)
            .then_with(|| b.total_leads.cmp(&a.total_leads))
            .then_with(|| a.staff_name.cmp(&b.staff_name))
    });

    // Tudo que caiu em ids fora da lista (inclusive Unknown) vai para uma linha só
    let mut orphan = Activity::default();
    for (_, counters) in tally.iter().filter(|(key, _)| !known.contains(*key)) {
        orphan.absorb(counters);
    }
    let unassigned = (!orphan.is_idle())
        .then(|| orphan.into_row(UNASSIGNED_ID.to_string(), UNASSIGNED_NAME.to_string(), None));

    StaffPerformanceReport { rows, unassigned }
}
