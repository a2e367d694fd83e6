use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

pub const OUTCOME_APPLIED: &str = "applied";
pub const OUTCOME_REJECTED_INSUFFICIENT: &str = "rejected_insufficient_stock";
pub const OUTCOME_SKIPPED_INVALID: &str = "skipped_invalid_line";
pub const OUTCOME_SKIPPED_READ: &str = "skipped_read_error";
pub const OUTCOME_SKIPPED_WRITE: &str = "skipped_write_error";
pub const OUTCOME_SKIPPED_CONFLICT: &str = "skipped_conflict";

#[derive(Clone)]
pub struct InventoryMetrics {
    pub registry: Registry,
    pub order_events_total: IntCounterVec,
    pub stock_adjustments_total: IntCounterVec,
    pub stock_queries_total: IntCounterVec,
    pub store_op_duration_seconds: HistogramVec,
    pub reconcile_duration_seconds: Histogram,
    pub http_errors_total: IntCounterVec,
}

impl InventoryMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let order_events_total = IntCounterVec::new(
            Opts::new(
                "inventory_order_events_total",
                "Order events received, by decode result",
            ),
            &["result"],
        ).unwrap();
        let stock_adjustments_total = IntCounterVec::new(
            Opts::new(
                "inventory_stock_adjustments_total",
                "Per-line stock adjustment outcomes",
            ),
            &["outcome"],
        ).unwrap();
        let stock_queries_total = IntCounterVec::new(
            Opts::new(
                "inventory_stock_queries_total",
                "Stock lookups served, by access path and result",
            ),
            &["path", "result"],
        ).unwrap();
        let store_op_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "inventory_store_op_duration_seconds",
                "Latency of state store operations",
            ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["op"],
        ).unwrap();
        let reconcile_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "inventory_reconcile_duration_seconds",
                "Duration of a full order reconciliation"
            ).buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0])
        ).unwrap();
        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)"
            ),
            &["service", "code", "status"]
        ).unwrap();
        let _ = registry.register(Box::new(order_events_total.clone()));
        let _ = registry.register(Box::new(stock_adjustments_total.clone()));
        let _ = registry.register(Box::new(stock_queries_total.clone()));
        let _ = registry.register(Box::new(store_op_duration_seconds.clone()));
        let _ = registry.register(Box::new(reconcile_duration_seconds.clone()));
        let _ = registry.register(Box::new(http_errors_total.clone()));
        InventoryMetrics {
            registry,
            order_events_total,
            stock_adjustments_total,
            stock_queries_total,
            store_op_duration_seconds,
            reconcile_duration_seconds,
            http_errors_total,
        }
    }

    pub fn record_adjustment(&self, outcome: &str) {
        self.stock_adjustments_total.with_label_values(&[outcome]).inc();
    }

    pub fn adjustment_count(&self, outcome: &str) -> u64 {
        self.stock_adjustments_total.with_label_values(&[outcome]).get()
    }
}

impl Default for InventoryMetrics {
    fn default() -> Self { Self::new() }
}
