//! Infrastructure layer: document stores, configuration, and the stock services.

pub mod config;
pub mod services;
pub mod store;
