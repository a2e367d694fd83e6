use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Current on-hand stock for one product, as persisted in the state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: i64,
}

impl InventoryItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self { product_id: product_id.into(), quantity }
    }
}

/// A field of the wrong type decodes to its zero value; the rest of the line
/// is still used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrderLine {
    #[serde(default, deserialize_with = "zero_if_mistyped")]
    pub product_id: String,
    #[serde(default, deserialize_with = "zero_if_mistyped")]
    pub quantity: i64,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrderEvent {
    #[serde(default, deserialize_with = "zero_if_mistyped")]
    pub order_id: String,
    #[serde(default, deserialize_with = "zero_if_mistyped")]
    pub customer_id: String,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("order payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("order payload is {0}, expected an object or a JSON string")]
    UnexpectedShape(&'static str),
}

impl OrderEvent {
    /// Normalise a pub/sub payload into an order. The publisher may hand us the
    /// document itself or a string holding the serialized document.
    pub fn from_payload(payload: &Value) -> Result<Self, DecodeError> {
        match payload {
            Value::String(text) => Ok(serde_json::from_str(text)?),
            Value::Object(_) => Ok(serde_json::from_value(payload.clone())?),
            Value::Null => Err(DecodeError::UnexpectedShape("null")),
            Value::Array(_) => Err(DecodeError::UnexpectedShape("an array")),
            Value::Bool(_) => Err(DecodeError::UnexpectedShape("a boolean")),
            Value::Number(_) => Err(DecodeError::UnexpectedShape("a number")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn zero_if_mistyped<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw.clone()).unwrap_or_else(|err| {
        warn!(value = %raw, error = %err, "Order field has the wrong type; using zero value");
        T::default()
    }))
}

// Prices arrive as JSON numbers from some publishers and as strings from others.
// Nothing downstream reads the price, so an unparseable one is zeroed.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let text = match &raw {
        Value::Null => return Ok(BigDecimal::default()),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            warn!(price = %other, "Order line price is not a decimal; using zero");
            return Ok(BigDecimal::default());
        }
    };
    Ok(BigDecimal::from_str(&text).unwrap_or_else(|err| {
        warn!(price = %text, error = %err, "Order line price is not a decimal; using zero");
        BigDecimal::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_structured_payload() {
        let payload = json!({
            "order_id": "O1",
            "customer_id": "C9",
            "items": [{ "product_id": "P1", "quantity": 30, "price": 12.5 }]
        });
        let order = OrderEvent::from_payload(&payload).expect("decode");
        assert_eq!(order.order_id, "O1");
        assert_eq!(order.customer_id, "C9");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 30);
        assert_eq!(order.items[0].price, BigDecimal::from_str("12.5").unwrap());
    }

    #[test]
    fn decodes_string_encoded_payload() {
        let inner = r#"{"order_id":"O2","items":[{"product_id":"P7","quantity":2,"price":"3.10"}]}"#;
        let order = OrderEvent::from_payload(&Value::String(inner.into())).expect("decode");
        assert_eq!(order.order_id, "O2");
        assert_eq!(order.items[0].product_id, "P7");
        assert_eq!(order.items[0].price.to_string(), "3.10");
    }

    #[test]
    fn ignores_fields_added_by_the_order_service() {
        let payload = json!({
            "order_id": "O3",
            "status": "PENDING",
            "created_at": "2024-01-01T00:00:00",
            "total_amount": 99.9,
            "fast_delivery": true,
            "customer_id": "C1",
            "items": [{ "product_id": "P1", "quantity": 1, "price": 99.9 }]
        });
        let order = OrderEvent::from_payload(&payload).expect("decode");
        assert_eq!(order.items.len(), 1);
    }

    #[test]
    fn missing_fields_take_zero_values() {
        let order = OrderEvent::from_payload(&json!({ "items": [{ "product_id": "P1" }] })).expect("decode");
        assert_eq!(order.order_id, "");
        assert_eq!(order.items[0].quantity, 0);
        assert_eq!(order.items[0].price, BigDecimal::default());
    }

    #[test]
    fn rejects_non_document_payloads() {
        assert!(OrderEvent::from_payload(&Value::Null).is_err());
        assert!(OrderEvent::from_payload(&json!([1, 2])).is_err());
        assert!(OrderEvent::from_payload(&json!(42)).is_err());
        assert!(OrderEvent::from_payload(&Value::String("not json".into())).is_err());
        assert!(OrderEvent::from_payload(&json!({ "items": "nope" })).is_err());
    }

    #[test]
    fn unparseable_price_becomes_zero() {
        let payload = json!({ "items": [
            { "product_id": "P1", "quantity": 1, "price": "abc" },
            { "product_id": "P2", "quantity": 2, "price": {} }
        ] });
        let order = OrderEvent::from_payload(&payload).expect("decode");
        assert_eq!(order.items[0].price, BigDecimal::default());
        assert_eq!(order.items[1].price, BigDecimal::default());
        assert_eq!(order.items[1].quantity, 2);
    }

    #[test]
    fn mistyped_scalars_become_zero_values() {
        let payload = json!({
            "order_id": 17,
            "items": [
                { "product_id": "P1", "quantity": "3" },
                { "product_id": "P2", "quantity": 18446744073709551615u64 },
                { "product_id": "P3", "quantity": 2.5 },
                { "product_id": ["P4"], "quantity": 4 }
            ]
        });
        let order = OrderEvent::from_payload(&payload).expect("decode");
        assert_eq!(order.order_id, "");
        let quantities: Vec<i64> = order.items.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![0, 0, 0, 4]);
        assert_eq!(order.items[3].product_id, "");
    }

    #[test]
    fn inventory_item_wire_shape() {
        let encoded = serde_json::to_value(InventoryItem::new("P1", 70)).unwrap();
        assert_eq!(encoded, json!({ "product_id": "P1", "quantity": 70 }));
    }
}
