//! Master data and document intake.
//!
//! Validates drafts against the item masters, converts line quantities into
//! each item's stock unit, and persists the resulting documents.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use loomerp_core::{DocumentId, DomainError, ItemId, Segment};
use loomerp_inventory::{
    DocumentHeader, Item, NewItem, StockLine, UnitCode, UnitConversion, UnitConversionTable,
};
use loomerp_purchasing::{
    GoodsReceipt, InvoiceLine, PurchaseInvoice, PurchaseReturn, RATE_DECIMALS,
    ReconciliationReport, reconcile,
};
use loomerp_sales::{DeliveryOrder, SalesReturn};

use crate::store::{DocumentFilter, DocumentStore, StoreResult};

/// Draft line as entered; `unit` defaults to the item's stock unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLine {
    pub item_id: ItemId,
    pub quantity: Decimal,
    pub unit: Option<UnitCode>,
    pub remarks: Option<String>,
}

/// Draft of a stock document.
///
/// `reference_id` is the goods receipt for a purchase return and the delivery
/// order for a sales return; other kinds ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDraft {
    pub document_no: String,
    pub date: NaiveDate,
    pub counterparty: String,
    pub segment: Segment,
    pub warehouse: Option<String>,
    pub remarks: Option<String>,
    pub reference_id: Option<DocumentId>,
    pub lines: Vec<DraftLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraftLine {
    pub item_id: ItemId,
    pub quantity: Decimal,
    /// Rate per `unit`.
    pub rate: Decimal,
    pub unit: Option<UnitCode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    pub invoice_no: String,
    pub date: NaiveDate,
    pub supplier: String,
    pub segment: Segment,
    pub goods_receipt_ids: Vec<DocumentId>,
    pub lines: Vec<InvoiceDraftLine>,
}

pub struct DocumentService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for DocumentService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

/// Item masters and conversions loaded once per intake request.
struct LineResolver {
    items: HashMap<ItemId, Item>,
    conversions: UnitConversionTable,
}

impl LineResolver {
    fn item(&self, line_no: usize, item_id: ItemId) -> StoreResult<&Item> {
        self.items.get(&item_id).ok_or_else(|| {
            DomainError::validation(format!("line {line_no}: unknown item {item_id}")).into()
        })
    }

    /// Factor taking a quantity in `unit` to the item's stock unit.
    fn factor(
        &self,
        line_no: usize,
        item: &Item,
        unit: Option<&UnitCode>,
    ) -> StoreResult<Decimal> {
        match unit {
            None => Ok(Decimal::ONE),
            Some(u) => self
                .conversions
                .factor(u, &item.stock_unit)
                .map_err(|e| match e {
                    DomainError::Validation(msg) => {
                        DomainError::validation(format!("line {line_no}: {msg}")).into()
                    }
                    other => other.into(),
                }),
        }
    }

    /// Line quantity expressed in the item's stock unit.
    fn stock_quantity(
        &self,
        line_no: usize,
        item: &Item,
        quantity: Decimal,
        unit: Option<&UnitCode>,
    ) -> StoreResult<Decimal> {
        let factor = self.factor(line_no, item, unit)?;
        let converted = quantity.checked_mul(factor).ok_or_else(|| {
            DomainError::validation(format!(
                "line {line_no}: {quantity} {} is out of range in {}",
                unit.unwrap_or(&item.stock_unit),
                item.stock_unit
            ))
        })?;
        Ok(converted.normalize())
    }

    fn stock_lines(&self, lines: Vec<DraftLine>) -> StoreResult<Vec<StockLine>> {
        lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| {
                let item = self.item(idx + 1, line.item_id)?;
                let quantity =
                    self.stock_quantity(idx + 1, item, line.quantity, line.unit.as_ref())?;
                Ok(StockLine {
                    item_id: line.item_id,
                    quantity,
                    remarks: line.remarks,
                })
            })
            .collect()
    }

    /// Invoice lines in stock units; rates are re-expressed per stock unit and
    /// rounded to `RATE_DECIMALS` places.
    fn invoice_lines(&self, lines: Vec<InvoiceDraftLine>) -> StoreResult<Vec<InvoiceLine>> {
        lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| {
                let line_no = idx + 1;
                let item = self.item(line_no, line.item_id)?;
                let unit = line.unit.as_ref();
                let factor = self.factor(line_no, item, unit)?;
                let quantity = self.stock_quantity(line_no, item, line.quantity, unit)?;
                let rate = line.rate.checked_div(factor).ok_or_else(|| {
                    DomainError::validation(format!(
                        "line {line_no}: rate {} per {} is out of range per {}",
                        line.rate,
                        unit.unwrap_or(&item.stock_unit),
                        item.stock_unit
                    ))
                })?;
                Ok(InvoiceLine {
                    item_id: line.item_id,
                    quantity,
                    rate: rate.round_dp(RATE_DECIMALS).normalize(),
                })
            })
            .collect()
    }
}

impl DocumentDraft {
    fn header(&self) -> DocumentHeader {
        DocumentHeader {
            id: DocumentId::new(),
            document_no: self.document_no.clone(),
            date: self.date,
            counterparty: self.counterparty.clone(),
            segment: self.segment.clone(),
            warehouse: self.warehouse.clone(),
            remarks: self.remarks.clone(),
        }
    }
}

impl<S> DocumentService<S>
where
    S: DocumentStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn resolver(&self) -> StoreResult<LineResolver> {
        let (items, conversions) =
            tokio::try_join!(self.store.list_items(), self.store.list_conversions())?;
        Ok(LineResolver {
            items: items.into_iter().map(|i| (i.id, i)).collect(),
            conversions: UnitConversionTable::from_conversions(conversions),
        })
    }

    // ---------------------------------------------------------------------
    // Masters
    // ---------------------------------------------------------------------

    pub async fn create_item(&self, input: NewItem) -> StoreResult<Item> {
        let item = Item::create(ItemId::new(), input)?;
        self.store.insert_item(item.clone()).await?;
        tracing::info!(item_id = %item.id, code = %item.code, "item created");
        Ok(item)
    }

    pub async fn get_item(&self, id: ItemId) -> StoreResult<Item> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("item {id}")).into())
    }

    pub async fn list_items(&self) -> StoreResult<Vec<Item>> {
        self.store.list_items().await
    }

    pub async fn add_conversion(
        &self,
        conversion: UnitConversion,
    ) -> StoreResult<UnitConversion> {
        self.store.upsert_conversion(conversion.clone()).await?;
        tracing::info!(
            from = %conversion.from,
            to = %conversion.to,
            factor = %conversion.factor,
            "unit conversion saved"
        );
        Ok(conversion)
    }

    pub async fn list_conversions(&self) -> StoreResult<Vec<UnitConversion>> {
        self.store.list_conversions().await
    }

    pub async fn convert(
        &self,
        quantity: Decimal,
        from: &UnitCode,
        to: &UnitCode,
    ) -> StoreResult<Decimal> {
        let table = UnitConversionTable::from_conversions(self.store.list_conversions().await?);
        Ok(table.convert(quantity, from, to)?)
    }

    // ---------------------------------------------------------------------
    // Stock documents
    // ---------------------------------------------------------------------

    pub async fn create_goods_receipt(&self, draft: DocumentDraft) -> StoreResult<GoodsReceipt> {
        let header = draft.header();
        let lines = self.resolver().await?.stock_lines(draft.lines)?;
        let doc = GoodsReceipt::new(header, lines)?;
        self.store.insert_goods_receipt(doc.clone()).await?;
        tracing::info!(
            document_no = %doc.header.document_no,
            segment = %doc.header.segment,
            "goods receipt created"
        );
        Ok(doc)
    }

    pub async fn create_purchase_return(
        &self,
        draft: DocumentDraft,
    ) -> StoreResult<PurchaseReturn> {
        if let Some(grn_id) = draft.reference_id {
            let found = self.store.goods_receipts_by_ids(&[grn_id]).await?;
            match found.first() {
                None => {
                    return Err(DomainError::validation(format!(
                        "goods receipt {grn_id} does not exist"
                    ))
                    .into());
                }
                Some(grn) if grn.header.segment != draft.segment => {
                    return Err(DomainError::validation(format!(
                        "goods receipt {grn_id} belongs to segment {}",
                        grn.header.segment
                    ))
                    .into());
                }
                Some(_) => {}
            }
        }

        let header = draft.header();
        let lines = self.resolver().await?.stock_lines(draft.lines)?;
        let doc = PurchaseReturn::new(header, draft.reference_id, lines)?;
        self.store.insert_purchase_return(doc.clone()).await?;
        tracing::info!(
            document_no = %doc.header.document_no,
            segment = %doc.header.segment,
            "purchase return created"
        );
        Ok(doc)
    }

    pub async fn create_delivery_order(
        &self,
        draft: DocumentDraft,
    ) -> StoreResult<DeliveryOrder> {
        let header = draft.header();
        let lines = self.resolver().await?.stock_lines(draft.lines)?;
        let doc = DeliveryOrder::new(header, lines)?;
        self.store.insert_delivery_order(doc.clone()).await?;
        tracing::info!(
            document_no = %doc.header.document_no,
            segment = %doc.header.segment,
            "delivery order created"
        );
        Ok(doc)
    }

    pub async fn create_sales_return(&self, draft: DocumentDraft) -> StoreResult<SalesReturn> {
        if let Some(do_id) = draft.reference_id {
            match self.store.delivery_order_segment(do_id).await? {
                None => {
                    return Err(DomainError::validation(format!(
                        "delivery order {do_id} does not exist"
                    ))
                    .into());
                }
                Some(segment) if segment != draft.segment => {
                    return Err(DomainError::validation(format!(
                        "delivery order {do_id} belongs to segment {segment}"
                    ))
                    .into());
                }
                Some(_) => {}
            }
        }

        let header = draft.header();
        let lines = self.resolver().await?.stock_lines(draft.lines)?;
        let doc = SalesReturn::new(header, draft.reference_id, lines)?;
        self.store.insert_sales_return(doc.clone()).await?;
        tracing::info!(
            document_no = %doc.header.document_no,
            segment = %doc.header.segment,
            "sales return created"
        );
        Ok(doc)
    }

    pub async fn list_goods_receipts(&self, segment: Segment) -> StoreResult<Vec<GoodsReceipt>> {
        self.store.goods_receipts(&DocumentFilter::segment(segment)).await
    }

    pub async fn list_purchase_returns(
        &self,
        segment: Segment,
    ) -> StoreResult<Vec<PurchaseReturn>> {
        self.store.purchase_returns(&DocumentFilter::segment(segment)).await
    }

    pub async fn list_delivery_orders(
        &self,
        segment: Segment,
    ) -> StoreResult<Vec<DeliveryOrder>> {
        self.store.delivery_orders(&DocumentFilter::segment(segment)).await
    }

    pub async fn list_sales_returns(&self, segment: Segment) -> StoreResult<Vec<SalesReturn>> {
        self.store.sales_returns(&DocumentFilter::segment(segment)).await
    }

    // ---------------------------------------------------------------------
    // Purchase invoices
    // ---------------------------------------------------------------------

    pub async fn create_purchase_invoice(
        &self,
        draft: InvoiceDraft,
    ) -> StoreResult<PurchaseInvoice> {
        let receipts = self.store.goods_receipts_by_ids(&draft.goods_receipt_ids).await?;
        for id in &draft.goods_receipt_ids {
            match receipts.iter().find(|g| &g.header.id == id) {
                None => {
                    return Err(DomainError::validation(format!(
                        "goods receipt {id} does not exist"
                    ))
                    .into());
                }
                Some(grn) if grn.header.segment != draft.segment => {
                    return Err(DomainError::validation(format!(
                        "goods receipt {id} belongs to segment {}",
                        grn.header.segment
                    ))
                    .into());
                }
                Some(_) => {}
            }
        }

        let lines = self.resolver().await?.invoice_lines(draft.lines)?;
        let invoice = PurchaseInvoice::new(
            DocumentId::new(),
            draft.invoice_no,
            draft.date,
            draft.supplier,
            draft.segment,
            draft.goods_receipt_ids,
            lines,
        )?;
        self.store.insert_purchase_invoice(invoice.clone()).await?;
        tracing::info!(
            invoice_no = %invoice.invoice_no,
            segment = %invoice.segment,
            "purchase invoice created"
        );
        Ok(invoice)
    }

    pub async fn list_purchase_invoices(
        &self,
        segment: Segment,
    ) -> StoreResult<Vec<PurchaseInvoice>> {
        self.store.purchase_invoices(&segment).await
    }

    /// Compare an invoice with the receipts it covers (net of returns against them).
    pub async fn reconciliation(
        &self,
        invoice_id: DocumentId,
    ) -> StoreResult<ReconciliationReport> {
        let invoice = self
            .store
            .get_purchase_invoice(invoice_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("purchase invoice {invoice_id}")))?;

        let (receipts, returns) = tokio::try_join!(
            self.store.goods_receipts_by_ids(&invoice.goods_receipt_ids),
            self.store.purchase_returns_against(&invoice.goods_receipt_ids),
        )?;

        let report = reconcile(&invoice, &receipts, &returns)?;
        tracing::debug!(
            invoice_no = %report.invoice_no,
            lines = report.lines.len(),
            fully_matched = report.fully_matched,
            "reconciled purchase invoice"
        );
        Ok(report)
    }
}
