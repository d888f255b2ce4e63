//! Stock movements: the common shape every stock-affecting document line maps to.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainError, DomainResult, ItemId};

/// Source document type of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementSource {
    GoodsReceipt,
    PurchaseReturn,
    DeliveryOrder,
    SalesReturn,
}

impl MovementSource {
    /// All sources, in the order ledgers concatenate them.
    pub const ALL: [MovementSource; 4] = [
        MovementSource::GoodsReceipt,
        MovementSource::PurchaseReturn,
        MovementSource::DeliveryOrder,
        MovementSource::SalesReturn,
    ];

    /// Whether documents of this type add to on-hand stock.
    pub fn is_inbound(self) -> bool {
        matches!(self, MovementSource::GoodsReceipt | MovementSource::SalesReturn)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementSource::GoodsReceipt => "goods_receipt",
            MovementSource::PurchaseReturn => "purchase_return",
            MovementSource::DeliveryOrder => "delivery_order",
            MovementSource::SalesReturn => "sales_return",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl core::fmt::Display for MovementSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction affecting one item's on-hand quantity.
///
/// Exactly one of `qty_in` / `qty_out` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub item_id: ItemId,
    pub source: MovementSource,
    pub document_id: DocumentId,
    pub document_no: String,
    pub date: NaiveDate,
    pub counterparty: String,
    pub qty_in: Decimal,
    pub qty_out: Decimal,
    pub remarks: Option<String>,
    pub warehouse: Option<String>,
}

impl StockMovement {
    /// Signed effect on stock (`qty_in - qty_out`).
    pub fn delta(&self) -> DomainResult<Decimal> {
        self.qty_in.checked_sub(self.qty_out).ok_or_else(|| {
            DomainError::invariant(format!(
                "movement {} for item {} is out of range",
                self.document_no, self.item_id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipts_and_sales_returns_are_inbound() {
        let inbound: Vec<_> = MovementSource::ALL
            .into_iter()
            .filter(|s| s.is_inbound())
            .collect();
        assert_eq!(
            inbound,
            vec![MovementSource::GoodsReceipt, MovementSource::SalesReturn]
        );
    }

    #[test]
    fn parse_matches_as_str() {
        for s in MovementSource::ALL {
            assert_eq!(MovementSource::parse(s.as_str()), Some(s));
        }
        assert_eq!(MovementSource::parse("transfer"), None);
    }
}
