// src/aggregation/tally.rs

use std::collections::{BTreeMap, HashMap};

use super::key::AggregationKey;

/// Contadores de uma entidade (ex: um membro do staff).
///
/// `metrics` guarda só o que o `metric_fn` escolheu contar ("closed", "completed"...);
/// `totals` guarda quantos itens de cada coleção de origem caíram na entidade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCounters {
    pub metrics: BTreeMap<AggregationKey, u64>,
    pub totals: BTreeMap<&'static str, u64>,
}

impl EntityCounters {
    pub fn metric(&self, name: &str) -> u64 {
        self.metrics
            .get(&AggregationKey::from_field(Some(name)))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self, source: &str) -> u64 {
        self.totals.get(source).copied().unwrap_or(0)
    }
}

/// Acumulador compartilhado por várias coleções de origem, indexado pelo id da
/// entidade. Cada coleção entra com uma única passada em `absorb`, então o custo
/// total é O(n + m) e nunca staff × leads × tasks.
#[derive(Debug, Default)]
pub struct EntityTally {
    entities: HashMap<AggregationKey, EntityCounters>,
}

impl EntityTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra a entidade mesmo sem atividade (linhas zeradas no relatório).
    pub fn register(&mut self, entity: AggregationKey) {
        self.entities.entry(entity).or_default();
    }

    pub fn absorb<T, E, M>(&mut self, source: &'static str, items: &[T], entity_fn: E, metric_fn: M)
    where
        E: Fn(&T) -> AggregationKey,
        M: Fn(&T) -> Option<AggregationKey>,
    {
        for item in items {
            let counters = self.entities.entry(entity_fn(item)).or_default();
            *counters.totals.entry(source).or_insert(0) += 1;
            if let Some(metric) = metric_fn(item) {
                *counters.metrics.entry(metric).or_insert(0) += 1;
            }
        }
    }

    pub fn get(&self, entity: &AggregationKey) -> Option<&EntityCounters> {
        self.entities.get(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AggregationKey, &EntityCounters)> {
        self.entities.iter()
    }
}

#[cfg(test)]
impl EntityTally {
    fn len(&self) -> usize {
        self.entities.len()
    }
}
