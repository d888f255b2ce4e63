use axum::Router;

pub mod inventory;
pub mod items;
pub mod purchasing;
pub mod sales;
pub mod system;
pub mod units;

/// Router for all segment-scoped and master-data endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/items", items::router())
        .nest("/units", units::router())
        .nest("/purchasing", purchasing::router())
        .nest("/sales", sales::router())
        .nest("/inventory", inventory::router())
}
