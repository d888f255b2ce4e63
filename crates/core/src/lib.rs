//! `loomerp-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the business segment tag, and the domain error model.

pub mod entity;
pub mod error;
pub mod id;
pub mod segment;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, ItemId};
pub use segment::Segment;
