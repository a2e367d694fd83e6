use futures::StreamExt;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use serde_json::Value;

use crate::reconciler::StockReconciler;
use crate::ORDER_CREATED_TOPIC;

/// Kafka-delivered payloads are either the order document or arbitrary text;
/// text that is not JSON is handed on as a string and fails decoding there.
/// Empty or non-UTF-8 messages become `Value::Null` so they are counted as
/// malformed like any other undecodable event.
pub fn kafka_payload(raw: Option<&[u8]>) -> Value {
    match raw.map(std::str::from_utf8) {
        Some(Ok(text)) if !text.is_empty() => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
        }
        Some(Err(err)) => {
            tracing::warn!(error = %err, "Kafka order event is not UTF-8");
            Value::Null
        }
        _ => {
            tracing::warn!("Kafka order event has an empty payload");
            Value::Null
        }
    }
}

/// Feeds `order_created` records from Kafka into the same reconciler the HTTP
/// subscription uses.
pub fn spawn_order_consumer(bootstrap: &str, reconciler: StockReconciler) -> anyhow::Result<()> {
    let consumer: StreamConsumer = rdkafka::ClientConfig::new()
        .set("bootstrap.servers", bootstrap)
        .set("group.id", crate::SERVICE_NAME)
        .set("enable.auto.commit", "true")
        .create()?;
    consumer.subscribe(&[ORDER_CREATED_TOPIC])?;

    tokio::spawn(async move {
        let mut stream = consumer.stream();
        while let Some(message) = stream.next().await {
            match message {
                Ok(m) => {
                    let report = reconciler.handle_payload(&kafka_payload(m.payload())).await;
                    tracing::debug!(order_id = %report.order_id, applied = report.applied(), "Kafka order event handled");
                }
                Err(err) => tracing::error!(?err, "Kafka error"),
            }
        }
    });
    Ok(())
}
