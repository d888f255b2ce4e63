//! Document storage: item masters, unit conversions, and transactional documents.
//!
//! Stores return documents in their natural fetch order (insertion order). The
//! ledger relies on that order to break ties between same-day movements.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use loomerp_core::{DocumentId, DomainError, ItemId, Segment};
use loomerp_inventory::{Item, UnitConversion};
use loomerp_purchasing::{GoodsReceipt, PurchaseInvoice, PurchaseReturn};
use loomerp_sales::{DeliveryOrder, SalesReturn};

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error in {operation}: {message}")]
    Database { operation: &'static str, message: String },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::conflict(msg))
    }
}

/// Which documents of one kind to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    pub segment: Segment,
    /// Only documents with at least one line for this item.
    pub item_id: Option<ItemId>,
}

impl DocumentFilter {
    pub fn segment(segment: Segment) -> Self {
        Self {
            segment,
            item_id: None,
        }
    }

    pub fn item(segment: Segment, item_id: ItemId) -> Self {
        Self {
            segment,
            item_id: Some(item_id),
        }
    }
}

/// Persistence boundary for the stock documents and their masters.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_item(&self, item: Item) -> StoreResult<()>;
    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>>;
    async fn list_items(&self) -> StoreResult<Vec<Item>>;

    /// Insert or replace the conversion for an unordered unit pair.
    async fn upsert_conversion(&self, conversion: UnitConversion) -> StoreResult<()>;
    async fn list_conversions(&self) -> StoreResult<Vec<UnitConversion>>;

    async fn insert_goods_receipt(&self, doc: GoodsReceipt) -> StoreResult<()>;
    async fn insert_purchase_return(&self, doc: PurchaseReturn) -> StoreResult<()>;
    async fn insert_delivery_order(&self, doc: DeliveryOrder) -> StoreResult<()>;
    async fn insert_sales_return(&self, doc: SalesReturn) -> StoreResult<()>;
    async fn insert_purchase_invoice(&self, invoice: PurchaseInvoice) -> StoreResult<()>;

    async fn goods_receipts(&self, filter: &DocumentFilter) -> StoreResult<Vec<GoodsReceipt>>;
    async fn purchase_returns(&self, filter: &DocumentFilter) -> StoreResult<Vec<PurchaseReturn>>;
    async fn delivery_orders(&self, filter: &DocumentFilter) -> StoreResult<Vec<DeliveryOrder>>;
    async fn sales_returns(&self, filter: &DocumentFilter) -> StoreResult<Vec<SalesReturn>>;

    async fn goods_receipts_by_ids(&self, ids: &[DocumentId]) -> StoreResult<Vec<GoodsReceipt>>;
    /// Segment of a delivery order, `None` when it does not exist.
    async fn delivery_order_segment(&self, id: DocumentId) -> StoreResult<Option<Segment>>;
    /// Purchase returns made against any of the given receipts.
    async fn purchase_returns_against(
        &self,
        goods_receipt_ids: &[DocumentId],
    ) -> StoreResult<Vec<PurchaseReturn>>;

    async fn get_purchase_invoice(&self, id: DocumentId) -> StoreResult<Option<PurchaseInvoice>>;
    async fn purchase_invoices(&self, segment: &Segment) -> StoreResult<Vec<PurchaseInvoice>>;
}
