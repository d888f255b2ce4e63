use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainResult, Entity};
use loomerp_inventory::document::validate_lines;
use loomerp_inventory::{DocumentHeader, MovementSource, StockDocument, StockLine};

/// Stock returned by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReturn {
    pub header: DocumentHeader,
    /// Delivery order the goods originally left on, when known.
    pub delivery_order_id: Option<DocumentId>,
    pub lines: Vec<StockLine>,
}

impl SalesReturn {
    pub fn new(
        header: DocumentHeader,
        delivery_order_id: Option<DocumentId>,
        lines: Vec<StockLine>,
    ) -> DomainResult<Self> {
        let header = header.normalized()?;
        validate_lines(&lines)?;
        Ok(Self {
            header,
            delivery_order_id,
            lines,
        })
    }
}

impl Entity for SalesReturn {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.header.id
    }
}

impl StockDocument for SalesReturn {
    const SOURCE: MovementSource = MovementSource::SalesReturn;

    fn header(&self) -> &DocumentHeader {
        &self.header
    }

    fn lines(&self) -> &[StockLine] {
        &self.lines
    }
}
