use crate::model::InventoryItem;
use crate::stock_query::StockLookup;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::{
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use common_http_errors::ApiError;
use tracing::{info, warn};

/// Body answered by `check-stock` for a product the store has never seen.
pub const CHECK_STOCK_ABSENT_BODY: &[u8] = br#"{"quantity": 0}"#;

fn raw_json(body: Vec<u8>) -> Response {
    ([(CONTENT_TYPE, "application/json")], body).into_response()
}

/// `GET /inventory/:id`
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Response, ApiError> {
    let queries = &state.metrics.stock_queries_total;
    match state.stock_query.lookup(&product_id).await {
        Ok(StockLookup::Found(raw)) => {
            queries.with_label_values(&["http", "found"]).inc();
            Ok(raw_json(raw))
        }
        Ok(StockLookup::Absent) => {
            queries.with_label_values(&["http", "absent"]).inc();
            Ok(Json(InventoryItem::new(product_id, 0)).into_response())
        }
        Err(err) => {
            queries.with_label_values(&["http", "error"]).inc();
            warn!(product_id = %product_id, error = %err, "Stock lookup failed");
            Err(ApiError::store_unavailable(err))
        }
    }
}

/// Service invocation `check-stock`; the request body is the bare product id.
pub async fn check_stock(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let Ok(product_id) = std::str::from_utf8(&body).map(str::to_owned) else {
        return Err(ApiError::BadRequest {
            code: "invalid_product_id",
            message: Some("product id must be UTF-8 text".into()),
        });
    };
    if product_id.is_empty() {
        return Err(ApiError::BadRequest {
            code: "missing_product_id",
            message: Some("request body must carry the product id".into()),
        });
    }
    info!(product_id = %product_id, "Stock check requested");

    let queries = &state.metrics.stock_queries_total;
    match state.stock_query.lookup(&product_id).await {
        Ok(StockLookup::Found(raw)) => {
            queries.with_label_values(&["invoke", "found"]).inc();
            Ok(raw_json(raw))
        }
        Ok(StockLookup::Absent) => {
            queries.with_label_values(&["invoke", "absent"]).inc();
            Ok(raw_json(CHECK_STOCK_ABSENT_BODY.to_vec()))
        }
        Err(err) => {
            queries.with_label_values(&["invoke", "error"]).inc();
            warn!(product_id = %product_id, error = %err, "Stock check failed");
            Err(ApiError::store_unavailable(err))
        }
    }
}
