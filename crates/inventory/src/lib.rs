//! Inventory domain module.
//!
//! Item masters, units of measure, and the stock views derived from the four
//! movement sources (goods receipts, purchase returns, delivery orders, sales
//! returns). Everything here is deterministic domain logic: no IO, no HTTP, no
//! storage.

pub mod document;
pub mod item;
pub mod ledger;
pub mod movement;
pub mod summary;
pub mod unit;

pub use document::{DocumentHeader, MAX_LINE_QUANTITY, StockDocument, StockLine};
pub use item::{Item, NewItem};
pub use ledger::{ItemLedger, LedgerEntry};
pub use movement::{MovementSource, StockMovement};
pub use summary::{StockSummaryRow, summarize};
pub use unit::{
    MAX_CONVERSION_FACTOR, MIN_CONVERSION_FACTOR, UnitCode, UnitConversion, UnitConversionTable,
};
