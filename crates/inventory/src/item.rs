use serde::{Deserialize, Serialize};

use loomerp_core::{DomainError, DomainResult, Entity, ItemId};

use crate::unit::UnitCode;

/// Item master record.
///
/// Group and color are free labels; they classify the item for reporting but
/// carry no behaviour of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub code: String,
    pub name: String,
    pub group: Option<String>,
    pub color: Option<String>,
    /// Unit every stored quantity for this item is expressed in.
    pub stock_unit: UnitCode,
    /// Unit the item is usually packed in (roll, bale, than).
    pub packing_unit: Option<UnitCode>,
}

/// Input for creating an item master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub group: Option<String>,
    pub color: Option<String>,
    pub stock_unit: UnitCode,
    pub packing_unit: Option<UnitCode>,
}

impl Item {
    pub fn create(id: ItemId, input: NewItem) -> DomainResult<Self> {
        let code = input.code.trim();
        if code.is_empty() {
            return Err(DomainError::validation("item code cannot be empty"));
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if input.packing_unit.as_ref() == Some(&input.stock_unit) {
            return Err(DomainError::validation(
                "packing unit must differ from stock unit",
            ));
        }

        Ok(Self {
            id,
            code: code.to_string(),
            name: name.to_string(),
            group: non_blank(input.group),
            color: non_blank(input.color),
            stock_unit: input.stock_unit,
            packing_unit: input.packing_unit,
        })
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
