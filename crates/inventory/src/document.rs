//! Shared shape of the stock-affecting documents.
//!
//! Purchasing and sales own the concrete document types; this module defines
//! the header/line layout they share and the [`StockDocument`] trait that maps a
//! document into [`StockMovement`]s.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainError, DomainResult, ItemId, Segment};

use crate::movement::{MovementSource, StockMovement};

/// Document header common to receipts, returns and deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub id: DocumentId,
    pub document_no: String,
    pub date: NaiveDate,
    /// Supplier for purchasing documents, customer for sales documents.
    pub counterparty: String,
    pub segment: Segment,
    pub warehouse: Option<String>,
    pub remarks: Option<String>,
}

impl DocumentHeader {
    /// Trim text fields and check the required ones are present.
    pub fn normalized(mut self) -> DomainResult<Self> {
        self.document_no = self.document_no.trim().to_string();
        if self.document_no.is_empty() {
            return Err(DomainError::validation("document number cannot be empty"));
        }
        self.counterparty = self.counterparty.trim().to_string();
        if self.counterparty.is_empty() {
            return Err(DomainError::validation("counterparty cannot be empty"));
        }
        self.warehouse = trimmed(self.warehouse);
        self.remarks = trimmed(self.remarks);
        Ok(self)
    }
}

/// One document line; `quantity` is in the item's stock unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub item_id: ItemId,
    pub quantity: Decimal,
    pub remarks: Option<String>,
}

/// Largest quantity a single line may carry, in stock units.
pub const MAX_LINE_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Validate a document's lines: at least one, each quantity in
/// `(0, MAX_LINE_QUANTITY]`.
pub fn validate_lines(lines: &[StockLine]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("document must have at least one line"));
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
    }
    Ok(())
}

/// A document whose lines move stock.
pub trait StockDocument {
    /// Which movement source this document type represents.
    const SOURCE: MovementSource;

    fn header(&self) -> &DocumentHeader;

    fn lines(&self) -> &[StockLine];

    fn segment(&self) -> &Segment {
        &self.header().segment
    }

    fn touches_item(&self, item_id: ItemId) -> bool {
        self.lines().iter().any(|l| l.item_id == item_id)
    }

    /// Map every line into a movement, in line order.
    fn movements(&self) -> Vec<StockMovement> {
        let header = self.header();
        self.lines()
            .iter()
            .map(|line| {
                let (qty_in, qty_out) = if Self::SOURCE.is_inbound() {
                    (line.quantity, Decimal::ZERO)
                } else {
                    (Decimal::ZERO, line.quantity)
                };
                StockMovement {
                    item_id: line.item_id,
                    source: Self::SOURCE,
                    document_id: header.id,
                    document_no: header.document_no.clone(),
                    date: header.date,
                    counterparty: header.counterparty.clone(),
                    qty_in,
                    qty_out,
                    remarks: line.remarks.clone().or_else(|| header.remarks.clone()),
                    warehouse: header.warehouse.clone(),
                }
            })
            .collect()
    }

    fn movements_for_item(&self, item_id: ItemId) -> Vec<StockMovement> {
        let mut out = self.movements();
        out.retain(|m| m.item_id == item_id);
        out
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Outbound {
        header: DocumentHeader,
        lines: Vec<StockLine>,
    }

    impl StockDocument for Outbound {
        const SOURCE: MovementSource = MovementSource::DeliveryOrder;

        fn header(&self) -> &DocumentHeader {
            &self.header
        }

        fn lines(&self) -> &[StockLine] {
            &self.lines
        }
    }

    fn header() -> DocumentHeader {
        DocumentHeader {
            id: DocumentId::new(),
            document_no: " DO-1 ".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            counterparty: "Al-Noor Textiles".to_string(),
            segment: Segment::default(),
            warehouse: Some(" ".to_string()),
            remarks: Some("urgent".to_string()),
        }
    }

    #[test]
    fn header_normalization() {
        let h = header().normalized().unwrap();
        assert_eq!(h.document_no, "DO-1");
        assert_eq!(h.warehouse, None);

        let mut blank = header();
        blank.counterparty = "".to_string();
        assert!(blank.normalized().is_err());
    }

    #[test]
    fn lines_must_be_present_and_positive() {
        assert!(validate_lines(&[]).is_err());
        let line = StockLine {
            item_id: ItemId::new(),
            quantity: dec!(0),
            remarks: None,
        };
        let err = validate_lines(&[line]).unwrap_err();
        assert_eq!(err, DomainError::validation("line 1: quantity must be positive"));
    }

    #[test]
    fn line_quantity_is_capped() {
        let line = |quantity| StockLine {
            item_id: ItemId::new(),
            quantity,
            remarks: None,
        };
        assert!(validate_lines(&[line(MAX_LINE_QUANTITY)]).is_ok());

        let err = validate_lines(&[line(dec!(1)), line(dec!(50000000000000000000000000000))])
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.starts_with("line 2:")));
    }

    #[test]
    fn outbound_lines_become_qty_out() {
        let a = ItemId::new();
        let b = ItemId::new();
        let doc = Outbound {
            header: header().normalized().unwrap(),
            lines: vec![
                StockLine { item_id: a, quantity: dec!(12.5), remarks: None },
                StockLine { item_id: b, quantity: dec!(3), remarks: Some("cut piece".to_string()) },
            ],
        };

        let moves = doc.movements();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].qty_out, dec!(12.5));
        assert_eq!(moves[0].qty_in, Decimal::ZERO);
        assert_eq!(moves[0].remarks.as_deref(), Some("urgent"));
        assert_eq!(moves[1].remarks.as_deref(), Some("cut piece"));

        assert!(doc.touches_item(b));
        assert_eq!(doc.movements_for_item(b).len(), 1);
        assert!(doc.movements_for_item(ItemId::new()).is_empty());
    }
}
