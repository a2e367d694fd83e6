use thiserror::Error;

use crate::model::InventoryItem;
use crate::state_store::{StoreClient, StoreError};

/// Raw result of a stock lookup. Both public access paths hand stored bytes
/// back verbatim, so the bytes are kept as-is here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockLookup {
    Found(Vec<u8>),
    Absent,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored record for {product_id} is unreadable: {source}")]
    CorruptRecord {
        product_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone)]
pub struct StockQueryService {
    store: StoreClient,
}

impl StockQueryService {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// Single read against the store; store failures are returned to the caller.
    pub async fn lookup(&self, product_id: &str) -> Result<StockLookup, StoreError> {
        Ok(match self.store.get(product_id).await? {
            Some(entry) => StockLookup::Found(entry.value),
            None => StockLookup::Absent,
        })
    }

    /// Typed view of the current stock; an absent product has quantity 0.
    pub async fn get_quantity(&self, product_id: &str) -> Result<InventoryItem, QueryError> {
        match self.lookup(product_id).await? {
            StockLookup::Absent => Ok(InventoryItem::new(product_id, 0)),
            StockLookup::Found(raw) => {
                let mut item: InventoryItem = serde_json::from_slice(&raw).map_err(|source| {
                    QueryError::CorruptRecord { product_id: product_id.to_owned(), source }
                })?;
                if item.product_id.is_empty() {
                    item.product_id = product_id.to_owned();
                }
                Ok(item)
            }
        }
    }
}
