// src/aggregation/key.rs

use std::fmt;

use serde::{Serialize, Serializer};

/// Chave usada quando o campo de origem não existe ou veio "sujo".
pub const UNKNOWN_KEY: &str = "Unknown";

// Valores que o backend às vezes manda como texto no lugar de "sem valor"
const SENTINELS: [&str; 3] = ["undefined", "null", "none"];

/// Valor categórico usado para agrupar itens (status, id de produto, id de staff...).
///
/// Sempre construída via `from_field`, que normaliza ausência, string vazia e os
/// literais `"undefined"`/`"null"` para a variante `Unknown`. Um valor real igual
/// a `"Unknown"` continua sendo `Value` e não se mistura com o sentinela.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregationKey {
    Value(String),
    Unknown,
}

impl AggregationKey {
    pub fn from_field(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if !is_blank_or_sentinel(value) => Self::Value(value.to_string()),
            _ => Self::unknown(),
        }
    }

    pub fn unknown() -> Self {
        Self::Unknown
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(value) => value,
            Self::Unknown => UNKNOWN_KEY,
        }
    }
}

// No JSON a chave é sempre texto
impl Serialize for AggregationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AggregationKey {
    fn from(value: &str) -> Self {
        Self::from_field(Some(value))
    }
}

/// `true` para "", "   ", "undefined", "NULL"...
pub fn is_blank_or_sentinel(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || SENTINELS.iter().any(|s| trimmed.eq_ignore_ascii_case(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field_keeps_trimmed_value() {
        assert_eq!(AggregationKey::from_field(Some("  paid ")).as_str(), "paid");
    }

    #[test]
    fn test_from_field_none_is_unknown() {
        assert!(AggregationKey::from_field(None).is_unknown());
    }

    #[test]
    fn test_from_field_sentinels_are_unknown() {
        for raw in ["", "   ", "undefined", "UNDEFINED", "null", "None"] {
            let key = AggregationKey::from_field(Some(raw));
            assert!(key.is_unknown(), "{raw:?} deveria virar Unknown");
        }
    }

    #[test]
    fn test_literal_unknown_from_backend_is_a_real_value() {
        let key = AggregationKey::from_field(Some("Unknown"));
        assert!(!key.is_unknown());
        assert_ne!(key, AggregationKey::unknown());
        // Mesmo texto na serialização, chaves diferentes no agrupamento
        assert_eq!(serde_json::to_value(&key).unwrap(), serde_json::json!("Unknown"));
        assert_eq!(serde_json::to_value(AggregationKey::unknown()).unwrap(), serde_json::json!("Unknown"));
    }

    #[test]
    fn test_display_matches_inner_value() {
        assert_eq!(AggregationKey::from("S1").to_string(), "S1");
        assert_eq!(AggregationKey::unknown().to_string(), UNKNOWN_KEY);
    }
}
