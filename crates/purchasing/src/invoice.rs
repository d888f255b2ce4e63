use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainError, DomainResult, Entity, ItemId, Segment};
use loomerp_inventory::MAX_LINE_QUANTITY;

/// Largest accepted rate per stock unit.
pub const MAX_RATE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Decimal places kept on a rate after converting it to a per-stock-unit rate.
pub const RATE_DECIMALS: u32 = 6;

/// Purchase invoice line. `quantity` is in the item's stock unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub item_id: ItemId,
    pub quantity: Decimal,
    pub rate: Decimal,
}

impl InvoiceLine {
    pub fn amount(&self) -> DomainResult<Decimal> {
        self.quantity.checked_mul(self.rate).ok_or_else(|| {
            DomainError::invariant(format!("amount for item {} is out of range", self.item_id))
        })
    }
}

/// Supplier invoice covering one or more goods receipts.
///
/// Invoices do not move stock; they are reconciled against the receipts they
/// cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInvoice {
    pub id: DocumentId,
    pub invoice_no: String,
    pub date: NaiveDate,
    pub supplier: String,
    pub segment: Segment,
    pub goods_receipt_ids: Vec<DocumentId>,
    pub lines: Vec<InvoiceLine>,
}

impl PurchaseInvoice {
    pub fn new(
        id: DocumentId,
        invoice_no: String,
        date: NaiveDate,
        supplier: String,
        segment: Segment,
        goods_receipt_ids: Vec<DocumentId>,
        lines: Vec<InvoiceLine>,
    ) -> DomainResult<Self> {
        let invoice_no = invoice_no.trim().to_string();
        if invoice_no.is_empty() {
            return Err(DomainError::validation("invoice number cannot be empty"));
        }
        let supplier = supplier.trim().to_string();
        if supplier.is_empty() {
            return Err(DomainError::validation("supplier cannot be empty"));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("invoice must have at least one line"));
        }
        for (idx, line) in lines.iter().enumerate() {
            if line.quantity <= Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "line {}: quantity must be positive",
                    idx + 1
                )));
            }
            if line.quantity > MAX_LINE_QUANTITY {
                return Err(DomainError::validation(format!(
                    "line {}: quantity exceeds {MAX_LINE_QUANTITY}",
                    idx + 1
                )));
            }
            if line.rate < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "line {}: rate cannot be negative",
                    idx + 1
                )));
            }
            if line.rate > MAX_RATE {
                return Err(DomainError::validation(format!(
                    "line {}: rate exceeds {MAX_RATE}",
                    idx + 1
                )));
            }
        }

        let mut goods_receipt_ids = goods_receipt_ids;
        goods_receipt_ids.sort();
        goods_receipt_ids.dedup();

        Ok(Self {
            id,
            invoice_no,
            date,
            supplier,
            segment,
            goods_receipt_ids,
            lines,
        })
    }

    pub fn total(&self) -> DomainResult<Decimal> {
        self.lines.iter().try_fold(Decimal::ZERO, |acc, line| {
            acc.checked_add(line.amount()?).ok_or_else(|| {
                DomainError::invariant(format!(
                    "total of invoice {} is out of range",
                    self.invoice_no
                ))
            })
        })
    }
}

impl Entity for PurchaseInvoice {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
