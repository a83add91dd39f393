// src/aggregation/percent.rs

use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Arredondamento único para todos os relatórios: 2 casas, meio para longe do zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentual de `part` em `grand_total`, entre 0 e 100.
///
/// `grand_total == 0` devolve 0. Cada percentual é arredondado de forma
/// independente, então a soma de vários buckets pode dar 99.99 ou 100.01.
pub fn to_percentage(part: Decimal, grand_total: Decimal) -> Decimal {
    if grand_total.is_zero() {
        return Decimal::ZERO;
    }
    match (part * HUNDRED).checked_div(grand_total) {
        Some(pct) => round2(pct.clamp(Decimal::ZERO, HUNDRED)),
        None => Decimal::ZERO,
    }
}

/// Atalho para contagens.
pub fn count_percentage(part: u64, grand_total: u64) -> Decimal {
    to_percentage(Decimal::from(part), Decimal::from(grand_total))
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn percentage_always_in_range(part in 0u64..1_000_000, total in 0u64..1_000_000) {
            let pct = count_percentage(part, total);
            prop_assert!(pct >= Decimal::ZERO && pct <= HUNDRED);
            prop_assert!(pct.scale() <= 2);
        }
    }
}
