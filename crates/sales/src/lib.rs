//! Sales domain module.
//!
//! Delivery orders (stock leaving for a customer) and sales returns (stock
//! coming back from one).

pub mod delivery_order;
pub mod sales_return;

pub use delivery_order::DeliveryOrder;
pub use sales_return::SalesReturn;
