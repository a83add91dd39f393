// src/models/crm.rs
//
// Registros que chegam do backend do CRM (leads, pagamentos, tarefas, staff).
// Todos os campos são opcionais: o backend não garante o formato.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::aggregation::AggregationKey;
use crate::models::de;

/// Referência para outra entidade, como veio no payload (id puro ou populado).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl EntityRef {
    pub fn key(&self) -> AggregationKey {
        AggregationKey::from_field(self.id.as_deref())
    }
}

/// Chave a partir de uma referência opcional (ausente => Unknown).
pub fn ref_key(entity: &Option<EntityRef>) -> AggregationKey {
    entity.as_ref().map_or_else(AggregationKey::unknown, EntityRef::key)
}

// --- LEADS ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id", alias = "id", default, deserialize_with = "de::loose_string")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "de::loose_string")]
    pub name: Option<String>,

    // Ex: "new", "contacted", "closed"
    #[serde(default, deserialize_with = "de::loose_string")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "de::loose_string")]
    pub source: Option<String>,

    // Staff responsável
    #[serde(default, deserialize_with = "de::loose_entity_ref")]
    pub assigned_to: Option<EntityRef>,

    #[serde(default, deserialize_with = "de::loose_entity_ref")]
    pub product: Option<EntityRef>,

    #[serde(default, alias = "value", deserialize_with = "de::loose_decimal")]
    pub lead_value: Option<Decimal>,

    #[serde(default, deserialize_with = "de::loose_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

// --- PAGAMENTOS ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id", alias = "id", default, deserialize_with = "de::loose_string")]
    pub id: Option<String>,

    #[serde(default, alias = "customer", deserialize_with = "de::loose_entity_ref")]
    pub lead: Option<EntityRef>,

    #[serde(default, deserialize_with = "de::loose_entity_ref")]
    pub product: Option<EntityRef>,

    #[serde(default, deserialize_with = "de::loose_decimal")]
    pub amount: Option<Decimal>,

    // Ex: "cash", "card", "upi"
    #[serde(default, alias = "paymentMethod", deserialize_with = "de::loose_string")]
    pub payment_mode: Option<String>,

    #[serde(default, deserialize_with = "de::loose_string")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "de::loose_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

// --- TAREFAS ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", alias = "id", default, deserialize_with = "de::loose_string")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "de::loose_string")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "de::loose_entity_ref")]
    pub assigned_to: Option<EntityRef>,

    #[serde(default, deserialize_with = "de::loose_string")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "de::loose_datetime")]
    pub due_date: Option<DateTime<Utc>>,
}

// --- STAFF ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    #[serde(rename = "_id", alias = "id", default, deserialize_with = "de::loose_string")]
    pub id: Option<String>,

    #[serde(default, alias = "fullName", deserialize_with = "de::loose_string")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "de::loose_string")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "de::loose_string")]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_with_populated_refs() {
        let lead: Lead = serde_json::from_value(json!({
            "_id": "L1",
            "name": "Maria",
            "status": "closed",
            "assignedTo": {"_id": "S1", "name": "Ana"},
            "product": "P1",
            "leadValue": "1200.50",
            "createdAt": "2024-02-10T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(lead.id.as_deref(), Some("L1"));
        assert_eq!(ref_key(&lead.assigned_to).as_str(), "S1");
        assert_eq!(lead.assigned_to.unwrap().name.as_deref(), Some("Ana"));
        assert_eq!(ref_key(&lead.product).as_str(), "P1");
        assert_eq!(lead.lead_value, Some("1200.50".parse().unwrap()));
        assert!(lead.created_at.is_some());
    }

    #[test]
    fn test_lead_with_garbage_fields_still_parses() {
        let lead: Lead = serde_json::from_value(json!({
            "_id": "L2",
            "status": "undefined",
            "assignedTo": null,
            "leadValue": "n/a",
            "createdAt": 12.5
        }))
        .unwrap();

        assert_eq!(lead.status, None);
        assert!(ref_key(&lead.assigned_to).is_unknown());
        assert_eq!(lead.lead_value, None);
        assert_eq!(lead.created_at, None);
    }

    #[test]
    fn test_payment_aliases() {
        let payment: Payment = serde_json::from_value(json!({
            "id": "PAY1",
            "customer": "C1",
            "amount": 99,
            "paymentMethod": "card"
        }))
        .unwrap();

        assert_eq!(payment.id.as_deref(), Some("PAY1"));
        assert_eq!(ref_key(&payment.lead).as_str(), "C1");
        assert_eq!(payment.payment_mode.as_deref(), Some("card"));
        assert_eq!(payment.amount, Some(Decimal::from(99)));
    }

    #[test]
    fn test_empty_object_is_all_none() {
        let task: Task = serde_json::from_value(json!({})).unwrap();
        assert_eq!(task, Task::default());
        let staff: Staff = serde_json::from_value(json!({})).unwrap();
        assert_eq!(staff, Staff::default());
    }
}
