use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainResult, Entity};
use loomerp_inventory::document::validate_lines;
use loomerp_inventory::{DocumentHeader, MovementSource, StockDocument, StockLine};

/// Stock sent back to a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReturn {
    pub header: DocumentHeader,
    /// Goods receipt this return is made against, when known.
    pub goods_receipt_id: Option<DocumentId>,
    pub lines: Vec<StockLine>,
}

impl PurchaseReturn {
    pub fn new(
        header: DocumentHeader,
        goods_receipt_id: Option<DocumentId>,
        lines: Vec<StockLine>,
    ) -> DomainResult<Self> {
        let header = header.normalized()?;
        validate_lines(&lines)?;
        Ok(Self {
            header,
            goods_receipt_id,
            lines,
        })
    }
}

impl Entity for PurchaseReturn {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.header.id
    }
}

impl StockDocument for PurchaseReturn {
    const SOURCE: MovementSource = MovementSource::PurchaseReturn;

    fn header(&self) -> &DocumentHeader {
        &self.header
    }

    fn lines(&self) -> &[StockLine] {
        &self.lines
    }
}
