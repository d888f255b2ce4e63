//! Stock summary: one row of per-source totals per item.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomerp_core::{DomainError, DomainResult, ItemId};

use crate::movement::{MovementSource, StockMovement};

/// Per-item totals over all four movement sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummaryRow {
    pub item_id: ItemId,
    pub received: Decimal,
    pub purchase_returned: Decimal,
    pub delivered: Decimal,
    pub sales_returned: Decimal,
    pub current_stock: Decimal,
}

impl StockSummaryRow {
    fn empty(item_id: ItemId) -> Self {
        Self {
            item_id,
            received: Decimal::ZERO,
            purchase_returned: Decimal::ZERO,
            delivered: Decimal::ZERO,
            sales_returned: Decimal::ZERO,
            current_stock: Decimal::ZERO,
        }
    }

    fn add(&mut self, movement: &StockMovement) -> DomainResult<()> {
        let overflow = || {
            DomainError::invariant(format!(
                "stock summary for item {} overflows at {} {}",
                movement.item_id, movement.source, movement.document_no
            ))
        };

        let qty = movement
            .qty_in
            .checked_add(movement.qty_out)
            .ok_or_else(overflow)?;
        let total = match movement.source {
            MovementSource::GoodsReceipt => &mut self.received,
            MovementSource::PurchaseReturn => &mut self.purchase_returned,
            MovementSource::DeliveryOrder => &mut self.delivered,
            MovementSource::SalesReturn => &mut self.sales_returned,
        };
        *total = total.checked_add(qty).ok_or_else(overflow)?;
        self.current_stock = self
            .current_stock
            .checked_add(movement.delta()?)
            .ok_or_else(overflow)?;
        Ok(())
    }
}

/// Fold movements into per-item rows, ordered by item id.
///
/// A row is created for the first movement of any source, so items that were
/// only delivered or returned still appear. When `warehouse` is given, only
/// movements carrying exactly that warehouse label are counted.
///
/// Fails with an invariant violation if a total leaves the decimal range.
pub fn summarize(
    movements: impl IntoIterator<Item = StockMovement>,
    warehouse: Option<&str>,
) -> DomainResult<Vec<StockSummaryRow>> {
    let mut rows: BTreeMap<ItemId, StockSummaryRow> = BTreeMap::new();

    for movement in movements {
        if let Some(w) = warehouse {
            if movement.warehouse.as_deref() != Some(w) {
                continue;
            }
        }
        rows.entry(movement.item_id)
            .or_insert_with(|| StockSummaryRow::empty(movement.item_id))
            .add(&movement)?;
    }

    Ok(rows.into_values().collect())
}
