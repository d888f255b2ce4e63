use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};

use loomerp_core::ItemId;

use crate::app::routes::purchasing::query_segment;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/items/:id/ledger", get(item_ledger))
        .route("/summary", get(stock_summary))
}

/// Unknown items answer 200 with an empty ledger and `item: null`.
pub async fn item_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    query: Result<Query<dto::SegmentQuery>, QueryRejection>,
) -> Response {
    let item_id: ItemId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let segment = match query_segment(&services, query) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.stock.item_ledger(item_id, segment).await {
        Ok(view) => errors::json_ok(StatusCode::OK, view),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn stock_summary(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SummaryQuery>, QueryRejection>,
) -> Response {
    let query = match errors::query_params(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let segment = match services.segment(query.segment.as_deref()) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let warehouse = query.warehouse.as_deref().map(str::trim).filter(|w| !w.is_empty());

    match services.stock.stock_summary(segment, warehouse).await {
        Ok(rows) => errors::json_ok(StatusCode::OK, rows),
        Err(e) => errors::store_error_to_response(e),
    }
}
