use crate::{AppState, ORDER_CREATED_ROUTE, ORDER_CREATED_TOPIC, PUBSUB_NAME};
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Subscription {
    pub pubsubname: &'static str,
    pub topic: &'static str,
    pub route: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicStatus {
    Success,
    Retry,
}

#[derive(Debug, Serialize)]
pub struct TopicResponse {
    pub status: TopicStatus,
}

/// `GET /dapr/subscribe`: the broker reads this once to learn where to push events.
pub async fn dapr_subscribe() -> Json<Vec<Subscription>> {
    Json(vec![Subscription {
        pubsubname: PUBSUB_NAME,
        topic: ORDER_CREATED_TOPIC,
        route: ORDER_CREATED_ROUTE,
    }])
}

/// Splits a delivered body into the CloudEvent id and its `data` payload.
/// Bodies without a `data` field are raw payloads and are returned whole;
/// bodies that are not JSON yield `Value::Null`, which decodes to an empty order.
pub fn event_payload(body: &[u8]) -> (Option<String>, Value) {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut envelope)) if envelope.contains_key("data") => {
            let id = envelope.get("id").and_then(Value::as_str).map(str::to_owned);
            let data = envelope.remove("data").unwrap_or(Value::Null);
            (id, data)
        }
        Ok(raw) => (None, raw),
        Err(err) => {
            warn!(error = %err, "Order event body is not JSON");
            (None, Value::Null)
        }
    }
}

/// `POST /events/order_created`. Always acknowledged: failures stay local.
pub async fn order_created(State(state): State<AppState>, body: Bytes) -> Json<TopicResponse> {
    let (event_id, payload) = event_payload(&body);
    info!(event_id = event_id.as_deref().unwrap_or("-"), "Order created event received");
    let report = state.reconciler.handle_payload(&payload).await;
    let status = if report.should_retry_delivery() {
        TopicStatus::Retry
    } else {
        TopicStatus::Success
    };
    Json(TopicResponse { status })
}
