// src/models/de.rs
//
// Deserializers tolerantes para os payloads do backend do CRM.
// O backend manda campos ausentes, `null`, "" e até o texto "undefined";
// tudo isso vira `None` aqui, nunca erro e nunca NaN.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::aggregation::key::is_blank_or_sentinel;
use crate::models::crm::EntityRef;

// ---
// Conversões a partir de um `serde_json::Value` já lido
// ---

/// Texto "de verdade": strings não vazias/sentinela, números e booleanos.
pub fn string_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !is_blank_or_sentinel(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Números e strings numéricas ("150.50"). Qualquer outra coisa é `None`.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) if !is_blank_or_sentinel(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

/// Inteiro não negativo, aceitando número, float inteiro ou string ("3").
pub fn u64_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// RFC 3339, "YYYY-MM-DD" ou epoch em milissegundos.
pub fn datetime_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) if !is_blank_or_sentinel(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Referência a outra entidade: id puro ou objeto populado `{ _id, name }`.
pub fn entity_ref_from_value(value: &Value) -> Option<EntityRef> {
    match value {
        Value::Object(obj) => {
            let id = obj
                .get("_id")
                .or_else(|| obj.get("id"))
                .and_then(string_from_value);
            let name = ["name", "fullName", "title"]
                .iter()
                .find_map(|field| obj.get(*field).and_then(string_from_value));
            if id.is_none() && name.is_none() {
                return None;
            }
            Some(EntityRef { id, name })
        }
        other => string_from_value(other).map(|id| EntityRef { id: Some(id), name: None }),
    }
}

// ---
// Adaptadores para `#[serde(deserialize_with = "...")]`
// Sempre usar junto com `#[serde(default)]` para campos ausentes.
// ---

pub fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(string_from_value))
}

pub fn loose_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_value))
}

pub fn loose_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(datetime_from_value))
}

pub fn loose_entity_ref<'de, D>(deserializer: D) -> Result<Option<EntityRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(entity_ref_from_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    #[test]
    fn test_string_sentinels_are_none() {
        for v in [json!("undefined"), json!(""), json!("null"), json!(null), json!([1])] {
            assert_eq!(string_from_value(&v), None, "{v}");
        }
        assert_eq!(string_from_value(&json!(" closed ")), Some("closed".to_string()));
        assert_eq!(string_from_value(&json!(42)), Some("42".to_string()));
    }

    #[test]
    fn test_decimal_accepts_numbers_and_numeric_strings() {
        assert_eq!(decimal_from_value(&json!(100)), Some(d("100")));
        assert_eq!(decimal_from_value(&json!(10.25)), Some(d("10.25")));
        assert_eq!(decimal_from_value(&json!("150.50")), Some(d("150.50")));
        assert_eq!(decimal_from_value(&json!("abc")), None);
        assert_eq!(decimal_from_value(&json!("undefined")), None);
        assert_eq!(decimal_from_value(&json!({"amount": 1})), None);
    }

    #[test]
    fn test_u64_from_value() {
        assert_eq!(u64_from_value(&json!(3)), Some(3));
        assert_eq!(u64_from_value(&json!(3.0)), Some(3));
        assert_eq!(u64_from_value(&json!("7")), Some(7));
        assert_eq!(u64_from_value(&json!(-1)), None);
        assert_eq!(u64_from_value(&json!(2.5)), None);
    }

    #[test]
    fn test_datetime_formats() {
        let rfc = datetime_from_value(&json!("2024-03-05T10:00:00.000Z")).unwrap();
        assert_eq!(rfc.format("%Y-%m").to_string(), "2024-03");

        let day = datetime_from_value(&json!("2024-01-31")).unwrap();
        assert_eq!(day.format("%Y-%m-%d").to_string(), "2024-01-31");

        let epoch = datetime_from_value(&json!(0)).unwrap();
        assert_eq!(epoch.format("%Y").to_string(), "1970");

        assert_eq!(datetime_from_value(&json!("ontem")), None);
    }

    #[test]
    fn test_entity_ref_shapes() {
        let bare = entity_ref_from_value(&json!("S1")).unwrap();
        assert_eq!(bare, EntityRef { id: Some("S1".into()), name: None });

        let populated = entity_ref_from_value(&json!({"_id": "P1", "name": "Plano Ouro"})).unwrap();
        assert_eq!(populated.id.as_deref(), Some("P1"));
        assert_eq!(populated.name.as_deref(), Some("Plano Ouro"));

        assert_eq!(entity_ref_from_value(&json!({"_id": "undefined"})), None);
        assert_eq!(entity_ref_from_value(&json!("undefined")), None);
    }
}
