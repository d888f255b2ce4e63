//! Application services over a [`DocumentStore`](crate::store::DocumentStore).

pub mod documents;
pub mod stock;

pub use documents::{DocumentDraft, DocumentService, DraftLine, InvoiceDraft, InvoiceDraftLine};
pub use stock::{ItemLedgerView, StockService, StockSummaryView};
