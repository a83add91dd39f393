// src/services/view_service.rs

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tokio::{sync::RwLock, task::AbortHandle};

use crate::{
    common::error::AppError,
    middleware::auth::UpstreamAuth,
    models::report::{FilterParams, ReportKind, ReportPayload, ReportState, ViewSnapshot},
    services::report_service::ReportService,
};

/// Uma view do painel que consome um relatório.
///
/// `owner` é o hash do token: cada usuário tem os próprios slots e nunca lê o
/// resultado drenado com a credencial de outro.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub owner: String,
    pub view_id: String,
    pub kind: ReportKind,
}

impl ViewKey {
    pub fn new(auth: &UpstreamAuth, view_id: &str, kind: ReportKind) -> Self {
        Self { owner: auth.owner(), view_id: view_id.to_string(), kind }
    }
}

/// Autorização para gravar o resultado de um dreno. Só vale enquanto a
/// geração do slot for a mesma da emissão.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainTicket {
    pub key: ViewKey,
    pub filter: FilterParams,
    pub generation: u64,
}

struct Slot {
    filter: FilterParams,
    generation: u64,
    state: ReportState,
    completed_at: Option<Instant>,
    task: Option<AbortHandle>,
}

impl Slot {
    fn snapshot(&self, key: &ViewKey) -> ViewSnapshot {
        ViewSnapshot {
            view_id: key.view_id.clone(),
            kind: key.kind,
            filter: self.filter.clone(),
            generation: self.generation,
            state: self.state.clone(),
        }
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Estado de exibição de cada view, com descarte de drenos obsoletos e
/// memoização por filtro.
#[derive(Clone)]
pub struct ViewRegistry {
    slots: Arc<RwLock<HashMap<ViewKey, Slot>>>,
    // Contador global: gerações nunca se repetem, nem após `remove`
    next_generation: Arc<AtomicU64>,
    ttl: Duration,
}

impl ViewRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Arc::default(),
            next_generation: Arc::new(AtomicU64::new(0)),
            ttl,
        }
    }

    // Resultado terminado há mais de um TTL não serve para nada
    fn expired(&self, slot: &Slot) -> bool {
        !matches!(slot.state, ReportState::Loading)
            && slot.completed_at.is_some_and(|at| at.elapsed() >= self.ttl)
    }

    fn reusable(&self, slot: &Slot) -> bool {
        match slot.state {
            ReportState::Loading => true,
            ReportState::Ready { .. } | ReportState::Empty => {
                slot.completed_at.is_some_and(|at| at.elapsed() < self.ttl)
            }
            ReportState::Failed { .. } => false,
        }
    }

    /// Abre (ou reaproveita) a view para `filter`.
    ///
    /// Devolve um ticket só quando é preciso drenar. Mesmo filtro com resultado
    /// fresco ou dreno em andamento não gera ticket, a menos que `force`.
    pub async fn begin(&self, key: ViewKey, filter: FilterParams, force: bool) -> (ViewSnapshot, Option<DrainTicket>) {
        let mut slots = self.slots.write().await;

        let before = slots.len();
        slots.retain(|_, slot| !self.expired(slot));
        if slots.len() < before {
            tracing::debug!("{} views expiradas removidas", before - slots.len());
        }

        if let Some(slot) = slots.get_mut(&key) {
            if !force && slot.filter == filter && self.reusable(slot) {
                tracing::debug!("View {}/{:?} reaproveitada (geração {})", key.view_id, key.kind, slot.generation);
                return (slot.snapshot(&key), None);
            }
            // O dreno anterior perdeu a validade
            slot.cancel();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let slot = Slot {
            filter: filter.clone(),
            generation,
            state: ReportState::Loading,
            completed_at: None,
            task: None,
        };
        let snapshot = slot.snapshot(&key);
        slots.insert(key.clone(), slot);

        tracing::info!("View {}/{:?}: novo dreno (geração {})", key.view_id, key.kind, generation);
        (snapshot, Some(DrainTicket { key, filter, generation }))
    }

    /// Associa a task do dreno ao slot, para poder abortá-la depois.
    pub async fn attach(&self, ticket: &DrainTicket, task: AbortHandle) {
        let mut slots = self.slots.write().await;
        match slots.get_mut(&ticket.key) {
            Some(slot) if slot.generation == ticket.generation => {
                // Se já terminou, commit já rodou e o estado não é mais Loading
                if matches!(slot.state, ReportState::Loading) {
                    slot.task = Some(task);
                }
            }
            _ => task.abort(),
        }
    }

    /// Grava o resultado se o ticket ainda for o vigente. Resultados de
    /// drenos substituídos são descartados e a função devolve `false`.
    pub async fn commit(&self, ticket: &DrainTicket, outcome: Result<ReportPayload, AppError>) -> bool {
        let mut slots = self.slots.write().await;

        let Some(slot) = slots.get_mut(&ticket.key) else {
            tracing::debug!("View {}/{:?} removida; descartando resultado", ticket.key.view_id, ticket.key.kind);
            return false;
        };
        if slot.generation != ticket.generation || slot.filter != ticket.filter {
            tracing::debug!(
                "Resultado obsoleto de {}/{:?} descartado (geração {} != {})",
                ticket.key.view_id,
                ticket.key.kind,
                ticket.generation,
                slot.generation
            );
            return false;
        }

        slot.state = match outcome {
            Ok(report) if report.is_empty() => ReportState::Empty,
            Ok(report) => ReportState::Ready { report },
            Err(err) => {
                tracing::warn!("Dreno de {}/{:?} falhou: {}", ticket.key.view_id, ticket.key.kind, err);
                ReportState::Failed {
                    code: err.code().to_string(),
                    message: err.to_string(),
                }
            }
        };
        slot.completed_at = Some(Instant::now());
        slot.task = None;
        true
    }

    pub async fn snapshot(&self, key: &ViewKey) -> Option<ViewSnapshot> {
        self.slots.read().await.get(key).map(|slot| slot.snapshot(key))
    }

    pub async fn current_filter(&self, key: &ViewKey) -> Option<FilterParams> {
        self.slots.read().await.get(key).map(|slot| slot.filter.clone())
    }

    /// Remove a view e aborta o dreno em andamento, se houver.
    pub async fn remove(&self, key: &ViewKey) -> bool {
        match self.slots.write().await.remove(key) {
            Some(mut slot) => {
                slot.cancel();
                true
            }
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct ViewService {
    registry: ViewRegistry,
    reports: ReportService,
}

impl ViewService {
    pub fn new(reports: ReportService, ttl: Duration) -> Self {
        Self {
            registry: ViewRegistry::new(ttl),
            reports,
        }
    }

    /// Aplica um filtro na view. Responde na hora (normalmente `Loading`);
    /// o dreno roda em background e grava o resultado ao terminar.
    pub async fn apply(
        &self,
        view_id: &str,
        kind: ReportKind,
        filter: FilterParams,
        auth: UpstreamAuth,
        force: bool,
    ) -> ViewSnapshot {
        let key = ViewKey::new(&auth, view_id, kind);
        let (snapshot, ticket) = self.registry.begin(key, filter.normalized(), force).await;

        if let Some(ticket) = ticket {
            let registry = self.registry.clone();
            let reports = self.reports.clone();
            let drain_ticket = ticket.clone();

            let handle = tokio::spawn(async move {
                let outcome = reports.run(drain_ticket.key.kind, &drain_ticket.filter, &auth).await;
                registry.commit(&drain_ticket, outcome).await;
            });
            self.registry.attach(&ticket, handle.abort_handle()).await;
        }

        snapshot
    }

    /// Refaz o dreno com o filtro atual, ignorando a memoização.
    pub async fn refresh(&self, view_id: &str, kind: ReportKind, auth: UpstreamAuth) -> Result<ViewSnapshot, AppError> {
        let key = ViewKey::new(&auth, view_id, kind);
        let filter = self
            .registry
            .current_filter(&key)
            .await
            .ok_or(AppError::ViewNotFound)?;
        Ok(self.apply(view_id, kind, filter, auth, true).await)
    }

    pub async fn snapshot(&self, view_id: &str, kind: ReportKind, auth: &UpstreamAuth) -> Result<ViewSnapshot, AppError> {
        self.registry
            .snapshot(&ViewKey::new(auth, view_id, kind))
            .await
            .ok_or(AppError::ViewNotFound)
    }

    pub async fn remove(&self, view_id: &str, kind: ReportKind, auth: &UpstreamAuth) -> Result<(), AppError> {
        if self.registry.remove(&ViewKey::new(auth, view_id, kind)).await {
            Ok(())
        } else {
            Err(AppError::ViewNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::{json, Value};

    use crate::{
        common::error::FetchError,
        models::report::LeadStatusReport,
        remote::{
            testing::{spawn_backend, test_client},
            CrmEndpoints, CrmRepository,
        },
    };

    fn key() -> ViewKey {
        ViewKey::new(&UpstreamAuth("t".into()), "dashboard", ReportKind::LeadStatus)
    }

    fn status(value: &str) -> FilterParams {
        FilterParams { status: Some(value.into()), ..Default::default() }
    }

    fn ready_payload() -> ReportPayload {
        use crate::aggregation::{group_by, key_label, present, AggregationKey, Measure, SortOrder};
        let buckets = group_by(&["open"], |s| AggregationKey::from(*s));
        ReportPayload::LeadStatus(LeadStatusReport {
            total_leads: 1,
            unknown_status: 0,
            points: present(&buckets, Measure::Count, SortOrder::CountDesc, key_label),
        })
    }

    fn empty_payload() -> ReportPayload {
        ReportPayload::LeadStatus(LeadStatusReport { total_leads: 0, unknown_status: 0, points: vec![] })
    }

    fn upstream_down() -> AppError {
        AppError::Upstream(FetchError::Transport {
            endpoint: "/api/leads".into(),
            timeout: false,
            message: "connection refused".into(),
        })
    }

    #[tokio::test]
    async fn test_stale_commit_is_discarded() {
        let registry = ViewRegistry::new(Duration::from_secs(60));

        let (_, first) = registry.begin(key(), status("open"), false).await;
        let (_, second) = registry.begin(key(), status("closed"), false).await;
        let (first, second) = (first.unwrap(), second.unwrap());
        assert!(second.generation > first.generation);

        // O dreno antigo termina depois: não pode sobrescrever
        assert!(registry.commit(&second, Ok(ready_payload())).await);
        assert!(!registry.commit(&first, Ok(empty_payload())).await);

        let snapshot = registry.snapshot(&key()).await.unwrap();
        assert_eq!(snapshot.filter, status("closed"));
        assert!(matches!(snapshot.state, ReportState::Ready { .. }));
    }

    #[tokio::test]
    async fn test_same_filter_is_memoized_within_ttl() {
        let registry = ViewRegistry::new(Duration::from_secs(60));

        let (loading, ticket) = registry.begin(key(), status("open"), false).await;
        assert_eq!(loading.state, ReportState::Loading);
        let ticket = ticket.unwrap();

        // Em andamento: mesmo filtro não dispara outro dreno
        assert!(registry.begin(key(), status("open"), false).await.1.is_none());

        registry.commit(&ticket, Ok(ready_payload())).await;
        let (snapshot, again) = registry.begin(key(), status("open"), false).await;
        assert!(again.is_none());
        assert_eq!(snapshot.generation, ticket.generation);

        // `force` ignora a memoização
        assert!(registry.begin(key(), status("open"), true).await.1.is_some());
    }

    #[tokio::test]
    async fn test_expired_result_triggers_new_drain() {
        let registry = ViewRegistry::new(Duration::ZERO);

        let (_, ticket) = registry.begin(key(), status("open"), false).await;
        registry.commit(&ticket.unwrap(), Ok(ready_payload())).await;

        assert!(registry.begin(key(), status("open"), false).await.1.is_some());
    }

    #[tokio::test]
    async fn test_begin_evicts_expired_views() {
        let registry = ViewRegistry::new(Duration::ZERO);
        let other = ViewKey::new(&UpstreamAuth("t".into()), "outra", ReportKind::LeadStatus);

        let (_, ticket) = registry.begin(key(), status("open"), false).await;
        registry.commit(&ticket.unwrap(), Err(upstream_down())).await;
        assert!(registry.snapshot(&key()).await.is_some());

        registry.begin(other.clone(), status("open"), false).await;

        assert!(registry.snapshot(&key()).await.is_none());
        // Em andamento não expira
        assert_eq!(registry.snapshot(&other).await.unwrap().state, ReportState::Loading);
        registry.begin(key(), status("open"), false).await;
        assert!(registry.snapshot(&other).await.is_some());
    }

    #[tokio::test]
    async fn test_fresh_views_survive_eviction() {
        let registry = ViewRegistry::new(Duration::from_secs(60));
        let other = ViewKey::new(&UpstreamAuth("t".into()), "outra", ReportKind::LeadStatus);

        let (_, ticket) = registry.begin(key(), status("open"), false).await;
        registry.commit(&ticket.unwrap(), Ok(ready_payload())).await;
        registry.begin(other, status("open"), false).await;

        assert!(matches!(registry.snapshot(&key()).await.unwrap().state, ReportState::Ready { .. }));
    }

    #[tokio::test]
    async fn test_views_are_scoped_by_token() {
        let registry = ViewRegistry::new(Duration::from_secs(60));
        let intruder = ViewKey::new(&UpstreamAuth("outro".into()), "dashboard", ReportKind::LeadStatus);
        assert_ne!(intruder, key());

        let (_, ticket) = registry.begin(key(), status("open"), false).await;
        registry.commit(&ticket.unwrap(), Ok(ready_payload())).await;

        // Mesmo view_id e filtro, outro token: nada visível e dreno próprio
        assert!(registry.snapshot(&intruder).await.is_none());
        let (snapshot, own) = registry.begin(intruder, status("open"), false).await;
        assert_eq!(snapshot.state, ReportState::Loading);
        assert!(own.is_some());
    }

    #[tokio::test]
    async fn test_failed_state_is_retried_and_empty_is_distinct() {
        let registry = ViewRegistry::new(Duration::from_secs(60));

        let (_, ticket) = registry.begin(key(), status("open"), false).await;
        registry.commit(&ticket.unwrap(), Err(upstream_down())).await;
        let failed = registry.snapshot(&key()).await.unwrap();
        assert!(matches!(failed.state, ReportState::Failed { ref code, .. } if code == "upstream_unavailable"));

        // Falha não é memoizada
        let (_, retry) = registry.begin(key(), status("open"), false).await;
        registry.commit(&retry.unwrap(), Ok(empty_payload())).await;
        assert_eq!(registry.snapshot(&key()).await.unwrap().state, ReportState::Empty);
    }

    #[tokio::test]
    async fn test_new_filter_aborts_running_drain() {
        let registry = ViewRegistry::new(Duration::from_secs(60));

        let (_, ticket) = registry.begin(key(), status("open"), false).await;
        let task = tokio::spawn(std::future::pending::<()>());
        registry.attach(&ticket.unwrap(), task.abort_handle()).await;

        registry.begin(key(), status("closed"), false).await;

        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_removed_view_rejects_commit() {
        let registry = ViewRegistry::new(Duration::from_secs(60));

        let (_, ticket) = registry.begin(key(), status("open"), false).await;
        assert!(registry.remove(&key()).await);
        assert!(!registry.remove(&key()).await);

        // Mesmo recriada com o mesmo filtro, a geração antiga não vale mais
        registry.begin(key(), status("open"), false).await;
        assert!(!registry.commit(&ticket.unwrap(), Ok(ready_payload())).await);
    }

    // --- ViewService contra um backend falso ---

    async fn leads_handler(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        let status = query.get("status").cloned().unwrap_or_default();
        if status == "slow" {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        Json(json!({"leads": [{"_id": "L1", "status": status}], "totalPages": 1, "totalLeads": 1}))
    }

    async fn service() -> ViewService {
        let base_url = spawn_backend(Router::new().route("/api/leads", get(leads_handler))).await;
        let repo = CrmRepository::new(test_client(), &base_url, 10, 10, CrmEndpoints::default());
        ViewService::new(ReportService::new(repo), Duration::from_secs(60))
    }

    fn token() -> UpstreamAuth {
        UpstreamAuth("t".into())
    }

    async fn settled(service: &ViewService, view_id: &str) -> ViewSnapshot {
        for _ in 0..100 {
            let snapshot = service.snapshot(view_id, ReportKind::LeadStatus, &token()).await.unwrap();
            if snapshot.state != ReportState::Loading {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("dreno não terminou");
    }

    fn first_label(snapshot: &ViewSnapshot) -> String {
        match &snapshot.state {
            ReportState::Ready { report: ReportPayload::LeadStatus(report) } => report.points[0].label.clone(),
            other => panic!("estado inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_apply_returns_loading_then_ready() {
        let service = service().await;
        let auth = UpstreamAuth("t".into());

        let snapshot = service
            .apply("dash", ReportKind::LeadStatus, status(" open "), auth, false)
            .await;
        assert_eq!(snapshot.state, ReportState::Loading);
        assert_eq!(snapshot.filter, status("open"));

        let done = settled(&service, "dash").await;
        assert_eq!(first_label(&done), "open");
    }

    #[tokio::test]
    async fn test_latest_filter_wins_over_slow_drain() {
        let service = service().await;

        service
            .apply("dash", ReportKind::LeadStatus, status("slow"), UpstreamAuth("t".into()), false)
            .await;
        service
            .apply("dash", ReportKind::LeadStatus, status("fast"), UpstreamAuth("t".into()), false)
            .await;

        let done = settled(&service, "dash").await;
        assert_eq!(first_label(&done), "fast");

        // Depois que o dreno lento terminaria, o estado continua o do filtro novo
        tokio::time::sleep(Duration::from_millis(400)).await;
        let later = service.snapshot("dash", ReportKind::LeadStatus, &token()).await.unwrap();
        assert_eq!(first_label(&later), "fast");
    }

    #[tokio::test]
    async fn test_refresh_and_remove_unknown_view() {
        let service = service().await;

        let missing = service.refresh("nope", ReportKind::LeadStatus, UpstreamAuth("t".into())).await;
        assert!(matches!(missing, Err(AppError::ViewNotFound)));
        assert!(matches!(
            service.remove("nope", ReportKind::LeadStatus, &token()).await,
            Err(AppError::ViewNotFound)
        ));

        service
            .apply("dash", ReportKind::LeadStatus, status("open"), UpstreamAuth("t".into()), false)
            .await;
        settled(&service, "dash").await;

        let refreshed = service
            .refresh("dash", ReportKind::LeadStatus, UpstreamAuth("t".into()))
            .await
            .unwrap();
        assert_eq!(refreshed.state, ReportState::Loading);
        assert_eq!(refreshed.filter, status("open"));
    }

    #[tokio::test]
    async fn test_other_token_cannot_read_or_remove_view() {
        let service = service().await;
        let other = UpstreamAuth("bogus".into());

        service.apply("dash", ReportKind::LeadStatus, status("open"), token(), false).await;
        settled(&service, "dash").await;

        assert!(matches!(
            service.snapshot("dash", ReportKind::LeadStatus, &other).await,
            Err(AppError::ViewNotFound)
        ));
        assert!(matches!(
            service.remove("dash", ReportKind::LeadStatus, &other).await,
            Err(AppError::ViewNotFound)
        ));
        assert!(matches!(
            service.refresh("dash", ReportKind::LeadStatus, other).await,
            Err(AppError::ViewNotFound)
        ));
        assert!(service.snapshot("dash", ReportKind::LeadStatus, &token()).await.is_ok());
    }
}
