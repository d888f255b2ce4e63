//! Stock queries: item ledger and stock summary.
//!
//! Both are read-only aggregations recomputed from the four movement sources
//! on every call.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use loomerp_core::{ItemId, Segment};
use loomerp_inventory::{
    Item, ItemLedger, StockDocument, StockMovement, StockSummaryRow, UnitCode, summarize,
};

use crate::store::{DocumentFilter, DocumentStore, StoreResult};

/// Ledger for one item plus its master record (absent for unknown items).
#[derive(Debug, Clone, Serialize)]
pub struct ItemLedgerView {
    pub item: Option<Item>,
    #[serde(flatten)]
    pub ledger: ItemLedger,
}

/// Summary row joined with the item master.
#[derive(Debug, Clone, Serialize)]
pub struct StockSummaryView {
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub stock_unit: Option<UnitCode>,
    #[serde(flatten)]
    pub row: StockSummaryRow,
}

pub struct StockService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for StockService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> StockService<S>
where
    S: DocumentStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Chronological movement history with running balance for one item.
    ///
    /// An unknown item yields an empty ledger with `item: None`.
    pub async fn item_ledger(
        &self,
        item_id: ItemId,
        segment: Segment,
    ) -> StoreResult<ItemLedgerView> {
        let filter = DocumentFilter::item(segment.clone(), item_id);

        let (item, receipts, purchase_returns, deliveries, sales_returns) = tokio::try_join!(
            self.store.get_item(item_id),
            self.store.goods_receipts(&filter),
            self.store.purchase_returns(&filter),
            self.store.delivery_orders(&filter),
            self.store.sales_returns(&filter),
        )?;

        // Source order matters: it breaks ties between same-day movements.
        let mut movements: Vec<StockMovement> = Vec::new();
        movements.extend(receipts.iter().flat_map(|d| d.movements_for_item(item_id)));
        movements.extend(
            purchase_returns
                .iter()
                .flat_map(|d| d.movements_for_item(item_id)),
        );
        movements.extend(deliveries.iter().flat_map(|d| d.movements_for_item(item_id)));
        movements.extend(sales_returns.iter().flat_map(|d| d.movements_for_item(item_id)));

        let ledger = ItemLedger::build(item_id, segment, movements)?;
        tracing::debug!(
            item_id = %item_id,
            segment = %ledger.segment,
            entries = ledger.entries.len(),
            closing_balance = %ledger.closing_balance,
            "built item ledger"
        );

        Ok(ItemLedgerView { item, ledger })
    }

    /// Per-item totals for a segment, optionally restricted to one warehouse.
    ///
    /// Rows are ordered by item code; rows for items without a master record
    /// come last, ordered by item id.
    pub async fn stock_summary(
        &self,
        segment: Segment,
        warehouse: Option<&str>,
    ) -> StoreResult<Vec<StockSummaryView>> {
        let filter = DocumentFilter::segment(segment.clone());

        let (items, receipts, purchase_returns, deliveries, sales_returns) = tokio::try_join!(
            self.store.list_items(),
            self.store.goods_receipts(&filter),
            self.store.purchase_returns(&filter),
            self.store.delivery_orders(&filter),
            self.store.sales_returns(&filter),
        )?;

        let movements = receipts
            .iter()
            .flat_map(|d| d.movements())
            .chain(purchase_returns.iter().flat_map(|d| d.movements()))
            .chain(deliveries.iter().flat_map(|d| d.movements()))
            .chain(sales_returns.iter().flat_map(|d| d.movements()));

        let rows = summarize(movements, warehouse)?;
        let by_id: HashMap<ItemId, &Item> = items.iter().map(|i| (i.id, i)).collect();

        let mut views: Vec<StockSummaryView> = rows
            .into_iter()
            .map(|row| {
                let item = by_id.get(&row.item_id).copied();
                StockSummaryView {
                    item_code: item.map(|i| i.code.clone()),
                    item_name: item.map(|i| i.name.clone()),
                    stock_unit: item.map(|i| i.stock_unit.clone()),
                    row,
                }
            })
            .collect();

        views.sort_by(|a, b| match (&a.item_code, &b.item_code) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => core::cmp::Ordering::Less,
            (None, Some(_)) => core::cmp::Ordering::Greater,
            (None, None) => a.row.item_id.cmp(&b.row.item_id),
        });

        tracing::debug!(
            segment = %segment,
            warehouse = warehouse.unwrap_or("*"),
            rows = views.len(),
            "built stock summary"
        );

        Ok(views)
    }
}
