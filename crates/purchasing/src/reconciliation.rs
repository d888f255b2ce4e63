//! Invoice / GRN quantity reconciliation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainError, DomainResult, ItemId};

use crate::goods_receipt::GoodsReceipt;
use crate::invoice::PurchaseInvoice;
use crate::purchase_return::PurchaseReturn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Matched,
    UnderInvoiced,
    OverInvoiced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLine {
    pub item_id: ItemId,
    pub received: Decimal,
    pub returned: Decimal,
    pub net_received: Decimal,
    pub invoiced: Decimal,
    /// `invoiced - net_received`.
    pub variance: Decimal,
    pub status: ReconciliationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub invoice_id: DocumentId,
    pub invoice_no: String,
    pub lines: Vec<ReconciliationLine>,
    pub fully_matched: bool,
}

#[derive(Default)]
struct Totals {
    received: Decimal,
    returned: Decimal,
    invoiced: Decimal,
}

fn out_of_range(item_id: ItemId) -> DomainError {
    DomainError::invariant(format!("reconciled quantity for item {item_id} is out of range"))
}

fn accumulate(total: &mut Decimal, item_id: ItemId, quantity: Decimal) -> DomainResult<()> {
    *total = total
        .checked_add(quantity)
        .ok_or_else(|| out_of_range(item_id))?;
    Ok(())
}

/// Compare invoiced quantities with what the covered receipts brought in.
///
/// Only receipts listed on the invoice count, and only returns made against one
/// of those receipts reduce the received quantity.
pub fn reconcile(
    invoice: &PurchaseInvoice,
    receipts: &[GoodsReceipt],
    returns: &[PurchaseReturn],
) -> DomainResult<ReconciliationReport> {
    let covered = |id: &DocumentId| invoice.goods_receipt_ids.contains(id);
    let mut totals: BTreeMap<ItemId, Totals> = BTreeMap::new();

    for grn in receipts.iter().filter(|g| covered(&g.header.id)) {
        for line in &grn.lines {
            let t = totals.entry(line.item_id).or_default();
            accumulate(&mut t.received, line.item_id, line.quantity)?;
        }
    }

    for ret in returns
        .iter()
        .filter(|r| r.goods_receipt_id.as_ref().is_some_and(covered))
    {
        for line in &ret.lines {
            let t = totals.entry(line.item_id).or_default();
            accumulate(&mut t.returned, line.item_id, line.quantity)?;
        }
    }

    for line in &invoice.lines {
        let t = totals.entry(line.item_id).or_default();
        accumulate(&mut t.invoiced, line.item_id, line.quantity)?;
    }

    let lines = totals
        .into_iter()
        .map(|(item_id, t)| {
            let net_received = t
                .received
                .checked_sub(t.returned)
                .ok_or_else(|| out_of_range(item_id))?;
            let variance = t
                .invoiced
                .checked_sub(net_received)
                .ok_or_else(|| out_of_range(item_id))?;
            let status = if variance.is_zero() {
                ReconciliationStatus::Matched
            } else if variance < Decimal::ZERO {
                ReconciliationStatus::UnderInvoiced
            } else {
                ReconciliationStatus::OverInvoiced
            };
            Ok(ReconciliationLine {
                item_id,
                received: t.received,
                returned: t.returned,
                net_received,
                invoiced: t.invoiced,
                variance,
                status,
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    let fully_matched = lines
        .iter()
        .all(|l| l.status == ReconciliationStatus::Matched);

    Ok(ReconciliationReport {
        invoice_id: invoice.id,
        invoice_no: invoice.invoice_no.clone(),
        lines,
        fully_matched,
    })
}
