// src/aggregation/group.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::key::AggregationKey;

/// Acumulador de contagem/soma para uma chave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationBucket {
    pub key: AggregationKey,
    pub count: u64,
    pub sum: Decimal,
}

impl AggregationBucket {
    fn new(key: AggregationKey) -> Self {
        Self { key, count: 0, sum: Decimal::ZERO }
    }
}

/// Resultado de uma passada do reducer. Cada chamada de `group_by` cria um
/// mapa novo; nada é compartilhado entre chamadas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    map: HashMap<AggregationKey, AggregationBucket>,
}

impl Buckets {
    fn record(&mut self, key: AggregationKey, value: Option<Decimal>) {
        let bucket = self
            .map
            .entry(key)
            .or_insert_with_key(|k| AggregationBucket::new(k.clone()));
        bucket.count += 1;
        // Valor ausente conta como zero
        bucket.sum += value.unwrap_or(Decimal::ZERO);
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregationBucket> {
        self.map.values()
    }

    /// Soma de todas as contagens (inclui o bucket `Unknown`).
    pub fn total_count(&self) -> u64 {
        self.map.values().map(|b| b.count).sum()
    }

    /// Grand total das somas, denominador dos percentuais por valor.
    pub fn total_sum(&self) -> Decimal {
        self.map.values().map(|b| b.sum).sum()
    }

    /// Quantos itens caíram no bucket sentinela.
    pub fn unknown_count(&self) -> u64 {
        self.map
            .get(&AggregationKey::unknown())
            .map_or(0, |b| b.count)
    }

}

#[cfg(test)]
impl Buckets {
    fn get(&self, key: &AggregationKey) -> Option<&AggregationBucket> {
        self.map.get(key)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Contagem só dos itens com chave resolvida.
    fn resolved_count(&self) -> u64 {
        self.total_count() - self.unknown_count()
    }
}

/// Agrupa `items` por `key_fn`, contando. Uma única passada, O(n).
pub fn group_by<T, K>(items: &[T], key_fn: K) -> Buckets
where
    K: Fn(&T) -> AggregationKey,
{
    let mut buckets = Buckets::default();
    for item in items {
        buckets.record(key_fn(item), None);
    }
    buckets
}

/// Como `group_by`, somando também o valor extraído por `value_fn`.
/// `None` (campo ausente ou não numérico) soma zero.
pub fn group_by_sum<T, K, V>(items: &[T], key_fn: K, value_fn: V) -> Buckets
where
    K: Fn(&T) -> AggregationKey,
    V: Fn(&T) -> Option<Decimal>,
{
    let mut buckets = Buckets::default();
    for item in items {
        buckets.record(key_fn(item), value_fn(item));
    }
    buckets
}
