use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainResult, Entity};
use loomerp_inventory::document::validate_lines;
use loomerp_inventory::{DocumentHeader, MovementSource, StockDocument, StockLine};

/// Delivery order: stock dispatched to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOrder {
    pub header: DocumentHeader,
    pub lines: Vec<StockLine>,
}

impl DeliveryOrder {
    pub fn new(header: DocumentHeader, lines: Vec<StockLine>) -> DomainResult<Self> {
        let header = header.normalized()?;
        validate_lines(&lines)?;
        Ok(Self { header, lines })
    }
}

impl Entity for DeliveryOrder {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.header.id
    }
}

impl StockDocument for DeliveryOrder {
    const SOURCE: MovementSource = MovementSource::DeliveryOrder;

    fn header(&self) -> &DocumentHeader {
        &self.header
    }

    fn lines(&self) -> &[StockLine] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use loomerp_core::{DomainError, ItemId, Segment};
    use rust_decimal_macros::dec;

    fn header(no: &str) -> DocumentHeader {
        DocumentHeader {
            id: DocumentId::new(),
            document_no: no.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            counterparty: "Gul Ahmed Retail".to_string(),
            segment: Segment::new("export").unwrap(),
            warehouse: Some("Port".to_string()),
            remarks: None,
        }
    }

    #[test]
    fn delivered_quantity_leaves_stock() {
        let item = ItemId::new();
        let dorder = DeliveryOrder::new(
            header("DO-55"),
            vec![StockLine { item_id: item, quantity: dec!(64.25), remarks: None }],
        )
        .unwrap();

        assert_eq!(dorder.segment().as_str(), "export");
        let m = &dorder.movements_for_item(item)[0];
        assert_eq!(m.qty_out, dec!(64.25));
        assert_eq!(m.source, MovementSource::DeliveryOrder);
    }

    #[test]
    fn blank_document_number_is_rejected() {
        let err = DeliveryOrder::new(
            header("   "),
            vec![StockLine { item_id: ItemId::new(), quantity: dec!(1), remarks: None }],
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("document number cannot be empty"));
    }
}
