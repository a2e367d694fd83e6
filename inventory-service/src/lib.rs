pub mod app;
pub mod config;
pub mod inventory_handlers;
#[cfg(feature = "kafka")]
pub mod kafka_consumer;
pub mod model;
pub mod reconciler;
pub mod state_store;
pub mod stock_query;
pub mod subscription_handlers;

pub use crate::app::{build_router, AppState};
pub use crate::inventory_handlers::*;
pub use crate::subscription_handlers::*;

pub const SERVICE_NAME: &str = "inventory-service";
pub const STATE_STORE_NAME: &str = "statestore";
pub const PUBSUB_NAME: &str = "order-pubsub";
pub const ORDER_CREATED_TOPIC: &str = "order_created";
pub const ORDER_CREATED_ROUTE: &str = "/events/order_created";
pub const CHECK_STOCK_METHOD: &str = "check-stock";
