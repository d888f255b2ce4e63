//! In-memory document store for tests/dev.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use loomerp_core::{DocumentId, Entity, ItemId, Segment};
use loomerp_inventory::{Item, StockDocument, UnitConversion, UnitConversionTable};
use loomerp_purchasing::{GoodsReceipt, PurchaseInvoice, PurchaseReturn};
use loomerp_sales::{DeliveryOrder, SalesReturn};

use super::{DocumentFilter, DocumentStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<ItemId, Item>,
    item_order: Vec<ItemId>,
    conversions: UnitConversionTable,
    goods_receipts: Vec<GoodsReceipt>,
    purchase_returns: Vec<PurchaseReturn>,
    delivery_orders: Vec<DeliveryOrder>,
    sales_returns: Vec<SalesReturn>,
    purchase_invoices: Vec<PurchaseInvoice>,
}

/// Documents are kept per kind in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

fn push_unique<D: StockDocument + Entity>(docs: &mut Vec<D>, doc: D) -> StoreResult<()> {
    let header = doc.header();
    let duplicate = docs.iter().any(|d| {
        d.id() == doc.id()
            || (d.header().segment == header.segment
                && d.header().document_no == header.document_no)
    });
    if duplicate {
        return Err(StoreError::conflict(format!(
            "{} {} already exists in segment {}",
            D::SOURCE,
            header.document_no,
            header.segment
        )));
    }
    docs.push(doc);
    Ok(())
}

fn select<D: StockDocument + Clone>(docs: &[D], filter: &DocumentFilter) -> Vec<D> {
    docs.iter()
        .filter(|d| d.segment() == &filter.segment)
        .filter(|d| filter.item_id.is_none_or(|item| d.touches_item(item)))
        .cloned()
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_item(&self, item: Item) -> StoreResult<()> {
        let mut inner = self.write()?;
        let duplicate = inner.items.contains_key(item.id())
            || inner.items.values().any(|i| i.code == item.code);
        if duplicate {
            return Err(StoreError::conflict(format!(
                "item code {} already exists",
                item.code
            )));
        }
        inner.item_order.push(*item.id());
        inner.items.insert(*item.id(), item);
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        let inner = self.read()?;
        Ok(inner
            .item_order
            .iter()
            .filter_map(|id| inner.items.get(id).cloned())
            .collect())
    }

    async fn upsert_conversion(&self, conversion: UnitConversion) -> StoreResult<()> {
        self.write()?.conversions.insert(conversion);
        Ok(())
    }

    async fn list_conversions(&self) -> StoreResult<Vec<UnitConversion>> {
        Ok(self.read()?.conversions.conversions())
    }

    async fn insert_goods_receipt(&self, doc: GoodsReceipt) -> StoreResult<()> {
        push_unique(&mut self.write()?.goods_receipts, doc)
    }

    async fn insert_purchase_return(&self, doc: PurchaseReturn) -> StoreResult<()> {
        push_unique(&mut self.write()?.purchase_returns, doc)
    }

    async fn insert_delivery_order(&self, doc: DeliveryOrder) -> StoreResult<()> {
        push_unique(&mut self.write()?.delivery_orders, doc)
    }

    async fn insert_sales_return(&self, doc: SalesReturn) -> StoreResult<()> {
        push_unique(&mut self.write()?.sales_returns, doc)
    }

    async fn insert_purchase_invoice(&self, invoice: PurchaseInvoice) -> StoreResult<()> {
        let mut inner = self.write()?;
        let duplicate = inner.purchase_invoices.iter().any(|i| {
            i.id() == invoice.id()
                || (i.segment == invoice.segment && i.invoice_no == invoice.invoice_no)
        });
        if duplicate {
            return Err(StoreError::conflict(format!(
                "purchase invoice {} already exists in segment {}",
                invoice.invoice_no, invoice.segment
            )));
        }
        inner.purchase_invoices.push(invoice);
        Ok(())
    }

    async fn goods_receipts(&self, filter: &DocumentFilter) -> StoreResult<Vec<GoodsReceipt>> {
        Ok(select(&self.read()?.goods_receipts, filter))
    }

    async fn purchase_returns(&self, filter: &DocumentFilter) -> StoreResult<Vec<PurchaseReturn>> {
        Ok(select(&self.read()?.purchase_returns, filter))
    }

    async fn delivery_orders(&self, filter: &DocumentFilter) -> StoreResult<Vec<DeliveryOrder>> {
        Ok(select(&self.read()?.delivery_orders, filter))
    }

    async fn sales_returns(&self, filter: &DocumentFilter) -> StoreResult<Vec<SalesReturn>> {
        Ok(select(&self.read()?.sales_returns, filter))
    }

    async fn goods_receipts_by_ids(&self, ids: &[DocumentId]) -> StoreResult<Vec<GoodsReceipt>> {
        Ok(self
            .read()?
            .goods_receipts
            .iter()
            .filter(|g| ids.contains(&g.header.id))
            .cloned()
            .collect())
    }

    async fn delivery_order_segment(&self, id: DocumentId) -> StoreResult<Option<Segment>> {
        Ok(self
            .read()?
            .delivery_orders
            .iter()
            .find(|d| d.header.id == id)
            .map(|d| d.header.segment.clone()))
    }

    async fn purchase_returns_against(
        &self,
        goods_receipt_ids: &[DocumentId],
    ) -> StoreResult<Vec<PurchaseReturn>> {
        Ok(self
            .read()?
            .purchase_returns
            .iter()
            .filter(|r| r.goods_receipt_id.is_some_and(|id| goods_receipt_ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn get_purchase_invoice(&self, id: DocumentId) -> StoreResult<Option<PurchaseInvoice>> {
        Ok(self
            .read()?
            .purchase_invoices
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn purchase_invoices(&self, segment: &Segment) -> StoreResult<Vec<PurchaseInvoice>> {
        Ok(self
            .read()?
            .purchase_invoices
            .iter()
            .filter(|i| &i.segment == segment)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use loomerp_core::DomainError;
    use loomerp_inventory::{DocumentHeader, NewItem, StockLine, UnitCode};
    use rust_decimal_macros::dec;

    fn item(code: &str) -> Item {
        Item::create(
            ItemId::new(),
            NewItem {
                code: code.to_string(),
                name: format!("Item {code}"),
                group: None,
                color: None,
                stock_unit: UnitCode::new("MTR").unwrap(),
                packing_unit: None,
            },
        )
        .unwrap()
    }

    fn grn(no: &str, segment: &str, item_id: ItemId) -> GoodsReceipt {
        GoodsReceipt::new(
            DocumentHeader {
                id: DocumentId::new(),
                document_no: no.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                counterparty: "Mill".to_string(),
                segment: Segment::new(segment).unwrap(),
                warehouse: None,
                remarks: None,
            },
            vec![StockLine { item_id, quantity: dec!(10), remarks: None }],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_item_code_conflicts() {
        let store = InMemoryDocumentStore::new();
        store.insert_item(item("LAWN")).await.unwrap();
        let err = store.insert_item(item("LAWN")).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
        assert_eq!(store.list_items().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn document_numbers_are_unique_per_segment() {
        let store = InMemoryDocumentStore::new();
        let a = ItemId::new();
        store.insert_goods_receipt(grn("GRN-1", "fabric", a)).await.unwrap();
        store.insert_goods_receipt(grn("GRN-1", "export", a)).await.unwrap();
        let err = store.insert_goods_receipt(grn("GRN-1", "fabric", a)).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn filter_by_segment_and_item_keeps_insertion_order() {
        let store = InMemoryDocumentStore::new();
        let a = ItemId::new();
        let b = ItemId::new();
        store.insert_goods_receipt(grn("GRN-2", "fabric", a)).await.unwrap();
        store.insert_goods_receipt(grn("GRN-1", "fabric", b)).await.unwrap();
        store.insert_goods_receipt(grn("GRN-3", "fabric", a)).await.unwrap();
        store.insert_goods_receipt(grn("GRN-4", "export", a)).await.unwrap();

        let found = store
            .goods_receipts(&DocumentFilter::item(Segment::default(), a))
            .await
            .unwrap();
        let numbers: Vec<_> = found.iter().map(|g| g.header.document_no.as_str()).collect();
        assert_eq!(numbers, vec!["GRN-2", "GRN-3"]);

        let all = store
            .goods_receipts(&DocumentFilter::segment(Segment::default()))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }
}
