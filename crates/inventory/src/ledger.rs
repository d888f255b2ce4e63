//! Item stock ledger: chronological movement history with a running balance.
//!
//! The ledger is a derived view. It is rebuilt from the movement sources on
//! every read and never persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomerp_core::{DomainError, DomainResult, ItemId, Segment};

use crate::movement::StockMovement;

/// One ledger line: a movement plus the balance right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub balance: Decimal,
}

/// Movement history for one item in one segment, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLedger {
    pub item_id: ItemId,
    pub segment: Segment,
    pub entries: Vec<LedgerEntry>,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub closing_balance: Decimal,
}

impl ItemLedger {
    /// Build the ledger from movements already concatenated in source order.
    ///
    /// Movements are sorted by date with a stable sort, so same-day movements
    /// keep the order they were supplied in. Movements for other items are
    /// ignored. Fails with an invariant violation if a running total leaves the
    /// representable decimal range.
    pub fn build(
        item_id: ItemId,
        segment: Segment,
        movements: impl IntoIterator<Item = StockMovement>,
    ) -> DomainResult<Self> {
        let mut movements: Vec<StockMovement> = movements
            .into_iter()
            .filter(|m| m.item_id == item_id)
            .collect();
        movements.sort_by_key(|m| m.date);

        let mut balance = Decimal::ZERO;
        let mut total_in = Decimal::ZERO;
        let mut total_out = Decimal::ZERO;
        let mut entries = Vec::with_capacity(movements.len());

        for movement in movements {
            balance = balance
                .checked_add(movement.delta()?)
                .ok_or_else(|| overflow(&movement))?;
            total_in = total_in
                .checked_add(movement.qty_in)
                .ok_or_else(|| overflow(&movement))?;
            total_out = total_out
                .checked_add(movement.qty_out)
                .ok_or_else(|| overflow(&movement))?;
            entries.push(LedgerEntry { movement, balance });
        }

        Ok(Self {
            item_id,
            segment,
            entries,
            total_in,
            total_out,
            closing_balance: balance,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn balances(&self) -> Vec<Decimal> {
        self.entries.iter().map(|e| e.balance).collect()
    }
}

fn overflow(movement: &StockMovement) -> DomainError {
    DomainError::invariant(format!(
        "stock total for item {} overflows at {} {}",
        movement.item_id, movement.source, movement.document_no
    ))
}
