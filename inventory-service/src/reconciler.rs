use std::sync::Arc;
use std::time::Instant;

use common_observability::{
    InventoryMetrics, OUTCOME_APPLIED, OUTCOME_REJECTED_INSUFFICIENT, OUTCOME_SKIPPED_CONFLICT,
    OUTCOME_SKIPPED_INVALID, OUTCOME_SKIPPED_READ, OUTCOME_SKIPPED_WRITE,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::model::{InventoryItem, OrderEvent, OrderLine};
use crate::state_store::{StoreClient, StoreError};

/// Starting stock assumed for a product the store has never seen.
pub const DEFAULT_PROVISIONED_QUANTITY: i64 = 100;

pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    /// Unconditional put. Concurrent orders for one product can lose updates.
    LastWriterWins,
    /// Put conditioned on the etag from the read; the read-modify-write is
    /// retried on conflict.
    Optimistic { max_attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Applied { previous: i64, remaining: i64, provisioned: bool },
    RejectedInsufficientStock { requested: i64, available: i64 },
    SkippedInvalidLine,
    SkippedReadError { reason: String },
    SkippedWriteError { reason: String },
    SkippedConflict { attempts: u32 },
}

impl LineOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            LineOutcome::Applied { .. } => OUTCOME_APPLIED,
            LineOutcome::RejectedInsufficientStock { .. } => OUTCOME_REJECTED_INSUFFICIENT,
            LineOutcome::SkippedInvalidLine => OUTCOME_SKIPPED_INVALID,
            LineOutcome::SkippedReadError { .. } => OUTCOME_SKIPPED_READ,
            LineOutcome::SkippedWriteError { .. } => OUTCOME_SKIPPED_WRITE,
            LineOutcome::SkippedConflict { .. } => OUTCOME_SKIPPED_CONFLICT,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, LineOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReport {
    pub product_id: String,
    pub requested: i64,
    pub outcome: LineOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    pub order_id: String,
    pub lines: Vec<LineReport>,
}

impl ReconcileReport {
    /// Failures are handled per line; redelivery is never requested.
    pub fn should_retry_delivery(&self) -> bool {
        false
    }

    pub fn applied(&self) -> usize {
        self.lines.iter().filter(|l| l.outcome.is_applied()).count()
    }

    pub fn outcome_for(&self, product_id: &str) -> Option<&LineOutcome> {
        self.lines.iter().find(|l| l.product_id == product_id).map(|l| &l.outcome)
    }
}

#[derive(Clone)]
pub struct StockReconciler {
    store: StoreClient,
    metrics: Arc<InventoryMetrics>,
    write_mode: WriteMode,
}

impl StockReconciler {
    pub fn new(store: StoreClient, metrics: Arc<InventoryMetrics>, write_mode: WriteMode) -> Self {
        Self { store, metrics, write_mode }
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Decode a delivered payload. Anything undecodable becomes an empty order.
    pub fn decode(&self, payload: &Value) -> OrderEvent {
        match OrderEvent::from_payload(payload) {
            Ok(order) => {
                self.metrics.order_events_total.with_label_values(&["decoded"]).inc();
                order
            }
            Err(err) => {
                self.metrics.order_events_total.with_label_values(&["malformed"]).inc();
                warn!(error = %err, "Failed to decode order payload; treating as empty order");
                OrderEvent::default()
            }
        }
    }

    pub async fn handle_payload(&self, payload: &Value) -> ReconcileReport {
        let order = self.decode(payload);
        self.reconcile(&order).await
    }

    /// Apply every line of the order in listed order. Lines are independent:
    /// a failure or rejection on one never affects the others.
    pub async fn reconcile(&self, order: &OrderEvent) -> ReconcileReport {
        let start = Instant::now();
        let mut lines = Vec::with_capacity(order.items.len());
        for line in &order.items {
            let outcome = self.adjust_line(line).await;
            self.metrics.record_adjustment(outcome.label());
            log_outcome(&order.order_id, line, &outcome);
            lines.push(LineReport {
                product_id: line.product_id.clone(),
                requested: line.quantity,
                outcome,
            });
        }
        self.metrics.reconcile_duration_seconds.observe(start.elapsed().as_secs_f64());
        let report = ReconcileReport { order_id: order.order_id.clone(), lines };
        debug!(
            order_id = %report.order_id,
            lines = report.lines.len(),
            applied = report.applied(),
            "Order reconciled"
        );
        report
    }

    async fn adjust_line(&self, line: &OrderLine) -> LineOutcome {
        if line.product_id.is_empty() {
            return LineOutcome::SkippedInvalidLine;
        }
        let max_attempts = match self.write_mode {
            WriteMode::LastWriterWins => 1,
            WriteMode::Optimistic { max_attempts } => max_attempts.max(1),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let entry = match self.store.get(&line.product_id).await {
                Ok(entry) => entry,
                Err(err) => return LineOutcome::SkippedReadError { reason: err.to_string() },
            };
            let (current, provisioned, etag) = match entry {
                None => (DEFAULT_PROVISIONED_QUANTITY, true, None),
                Some(entry) => (stored_quantity(&line.product_id, &entry.value), false, entry.etag),
            };

            let Some(remaining) = current.checked_sub(line.quantity) else {
                return LineOutcome::SkippedInvalidLine;
            };
            if remaining < 0 {
                return LineOutcome::RejectedInsufficientStock {
                    requested: line.quantity,
                    available: current,
                };
            }

            let body = match serde_json::to_vec(&InventoryItem::new(line.product_id.clone(), remaining)) {
                Ok(body) => body,
                Err(err) => return LineOutcome::SkippedWriteError { reason: err.to_string() },
            };
            let condition = match self.write_mode {
                WriteMode::LastWriterWins => None,
                WriteMode::Optimistic { .. } => etag.as_deref(),
            };
            match self.store.put(&line.product_id, body, condition).await {
                Ok(()) => {
                    return LineOutcome::Applied { previous: current, remaining, provisioned };
                }
                Err(StoreError::EtagMismatch(_)) if attempt < max_attempts => {
                    debug!(product_id = %line.product_id, attempt, "Stock changed underneath us; re-reading");
                }
                Err(StoreError::EtagMismatch(_)) => {
                    return LineOutcome::SkippedConflict { attempts: attempt };
                }
                Err(err) => return LineOutcome::SkippedWriteError { reason: err.to_string() },
            }
        }
    }
}

// A record that does not parse counts as empty stock.
fn stored_quantity(product_id: &str, raw: &[u8]) -> i64 {
    match serde_json::from_slice::<InventoryItem>(raw) {
        Ok(item) => item.quantity,
        Err(err) => {
            warn!(product_id = %product_id, error = %err, "Stored inventory record is unreadable; assuming zero stock");
            0
        }
    }
}

fn log_outcome(order_id: &str, line: &OrderLine, outcome: &LineOutcome) {
    match outcome {
        LineOutcome::Applied { previous, remaining, provisioned } => {
            if *provisioned {
                info!(
                    order_id = %order_id,
                    product_id = %line.product_id,
                    default_quantity = DEFAULT_PROVISIONED_QUANTITY,
                    "Unknown product provisioned with default stock"
                );
            }
            info!(
                order_id = %order_id,
                product_id = %line.product_id,
                requested = line.quantity,
                previous = *previous,
                remaining = *remaining,
                "Stock decremented"
            );
        }
        LineOutcome::RejectedInsufficientStock { requested, available } => warn!(
            order_id = %order_id,
            product_id = %line.product_id,
            requested = *requested,
            available = *available,
            "Insufficient stock; line rejected"
        ),
        LineOutcome::SkippedInvalidLine => warn!(
            order_id = %order_id,
            product_id = %line.product_id,
            requested = line.quantity,
            "Invalid order line skipped"
        ),
        LineOutcome::SkippedReadError { reason } => warn!(
            order_id = %order_id,
            product_id = %line.product_id,
            error = %reason,
            "Failed to read stock; line skipped"
        ),
        LineOutcome::SkippedWriteError { reason } => error!(
            order_id = %order_id,
            product_id = %line.product_id,
            error = %reason,
            "Failed to persist stock update"
        ),
        LineOutcome::SkippedConflict { attempts } => warn!(
            order_id = %order_id,
            product_id = %line.product_id,
            attempts = *attempts,
            "Gave up after repeated concurrent updates"
        ),
    }
}
