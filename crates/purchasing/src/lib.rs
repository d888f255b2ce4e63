//! Purchasing domain module.
//!
//! Goods receipts and purchase returns (the inbound and outbound purchasing
//! movement sources), purchase invoices, and the reconciliation of invoiced
//! quantities against what was actually received.

pub mod goods_receipt;
pub mod invoice;
pub mod purchase_return;
pub mod reconciliation;

pub use goods_receipt::GoodsReceipt;
pub use invoice::{InvoiceLine, MAX_RATE, PurchaseInvoice, RATE_DECIMALS};
pub use purchase_return::PurchaseReturn;
pub use reconciliation::{ReconciliationLine, ReconciliationReport, ReconciliationStatus, reconcile};
