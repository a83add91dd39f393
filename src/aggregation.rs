// src/aggregation.rs
//
// Reducers puros usados pelos relatórios: chave de agrupamento, buckets,
// acumulador multi-fonte, percentuais e adaptação para gráfico.

pub mod group;
pub mod key;
pub mod percent;
pub mod present;
pub mod tally;

pub use group::{group_by, group_by_sum};
pub use key::AggregationKey;
pub use percent::count_percentage;
pub use present::{key_label, present, ChartPoint, Measure, SortOrder};
pub use tally::{EntityCounters, EntityTally};
