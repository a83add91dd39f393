// src/aggregation/present.rs

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    group::{AggregationBucket, Buckets},
    key::AggregationKey,
    percent::to_percentage,
};

/// Qual grandeza vira o `value` do ponto (e o denominador do percentual).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Measure {
    Count,
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    CountDesc,
    ValueDesc,
    LabelAsc,
}

/// Linha pronta para o gráfico/tabela: `{ label, value, percent }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    #[schema(value_type = String, example = "paid")]
    pub key: AggregationKey,
    #[schema(example = "Pago")]
    pub label: String,
    #[schema(example = 2)]
    pub count: u64,
    #[schema(example = 150.0)]
    pub value: Decimal,
    #[schema(example = 75.0)]
    pub percent: Decimal,
}

fn measured(bucket: &AggregationBucket, measure: Measure) -> Decimal {
    match measure {
        Measure::Count => Decimal::from(bucket.count),
        Measure::Sum => bucket.sum,
    }
}

/// Converte buckets em pontos ordenados. Só lê `buckets`; o resultado da
/// agregação continua intacto para outros consumidores.
pub fn present<L>(buckets: &Buckets, measure: Measure, order: SortOrder, label_fn: L) -> Vec<ChartPoint>
where
    L: Fn(&AggregationKey) -> String,
{
    let grand_total = match measure {
        Measure::Count => Decimal::from(buckets.total_count()),
        Measure::Sum => buckets.total_sum(),
    };

    let mut points: Vec<ChartPoint> = buckets
        .iter()
        .map(|bucket| {
            let value = measured(bucket, measure);
            ChartPoint {
                key: bucket.key.clone(),
                label: label_fn(&bucket.key),
                count: bucket.count,
                value,
                percent: to_percentage(value, grand_total),
            }
        })
        .collect();

    points.sort_by(|a, b| compare(a, b, order));
    points
}

/// Rótulo padrão: a própria chave.
pub fn key_label(key: &AggregationKey) -> String {
    key.to_string()
}

fn compare(a: &ChartPoint, b: &ChartPoint, order: SortOrder) -> Ordering {
    // Unknown sempre no fim, independente da ordem pedida
    a.key
        .is_unknown()
        .cmp(&b.key.is_unknown())
        .then_with(|| match order {
            SortOrder::CountDesc => b.count.cmp(&a.count),
            SortOrder::ValueDesc => b.value.cmp(&a.value),
            SortOrder::LabelAsc => Ordering::Equal,
        })
        .then_with(|| a.label.cmp(&b.label))
}
