use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method, Request,
    },
    middleware::{self, Next},
    response::Response,
    routing::{any, get, post},
    Router,
};
use common_http_errors::{ApiError, ERROR_CODE_HEADER};
use common_observability::InventoryMetrics;
use prometheus::{Encoder, TextEncoder};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::inventory_handlers::{check_stock, get_inventory};
use crate::reconciler::{StockReconciler, WriteMode};
use crate::state_store::{StateStore, StoreClient};
use crate::stock_query::StockQueryService;
use crate::subscription_handlers::{dapr_subscribe, order_created};
use crate::{ORDER_CREATED_ROUTE, SERVICE_NAME};

pub const CHECK_STOCK_ROUTE: &str = "/check-stock";

#[derive(Clone)]
pub struct AppState {
    pub reconciler: StockReconciler,
    pub stock_query: StockQueryService,
    pub metrics: Arc<InventoryMetrics>,
}

impl AppState {
    /// Wires both components to one shared store handle.
    pub fn new(store: Arc<dyn StateStore>, store_timeout: Duration, write_mode: WriteMode) -> Self {
        let metrics = Arc::new(InventoryMetrics::new());
        let client = StoreClient::new(store, store_timeout, metrics.clone());
        Self {
            reconciler: StockReconciler::new(client.clone(), metrics.clone(), write_mode),
            stock_query: StockQueryService::new(client),
            metrics,
        }
    }
}

async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, ApiError> {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry.gather();
    let mut buf = Vec::new();
    encoder
        .encode(&families, &mut buf)
        .map_err(|e| ApiError::internal(format!("metrics encode error: {e}")))?;
    Ok(String::from_utf8_lossy(&buf).to_string())
}

async fn health() -> &'static str {
    "ok"
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound { code: "route_not_found" }
}

async fn error_metrics_mw(
    State(metrics): State<Arc<InventoryMetrics>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get(ERROR_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        metrics
            .http_errors_total
            .with_label_values(&[SERVICE_NAME, code, status.as_str()])
            .inc();
    }
    resp
}

pub fn build_router(state: AppState) -> Router {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:5173",
    ];
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    let metrics = state.metrics.clone();
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/dapr/subscribe", get(dapr_subscribe))
        .route(ORDER_CREATED_ROUTE, post(order_created))
        .route(CHECK_STOCK_ROUTE, any(check_stock))
        .route("/inventory/:id", get(get_inventory))
        .fallback(route_not_found)
        .with_state(state)
        .layer(middleware::from_fn_with_state(metrics, error_metrics_mw))
        .layer(cors)
}
