use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainResult, Entity};
use loomerp_inventory::document::validate_lines;
use loomerp_inventory::{DocumentHeader, MovementSource, StockDocument, StockLine};

/// Goods-receipt note (GRN): stock received from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceipt {
    pub header: DocumentHeader,
    pub lines: Vec<StockLine>,
}

impl GoodsReceipt {
    pub fn new(header: DocumentHeader, lines: Vec<StockLine>) -> DomainResult<Self> {
        let header = header.normalized()?;
        validate_lines(&lines)?;
        Ok(Self { header, lines })
    }
}

impl Entity for GoodsReceipt {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.header.id
    }
}

impl StockDocument for GoodsReceipt {
    const SOURCE: MovementSource = MovementSource::GoodsReceipt;

    fn header(&self) -> &DocumentHeader {
        &self.header
    }

    fn lines(&self) -> &[StockLine] {
        &self.lines
    }
}
