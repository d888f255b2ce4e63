use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query,
    },
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};

use crate::app::routes::purchasing::{document_draft, query_segment};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/delivery-orders", get(list_delivery_orders).post(create_delivery_order))
        .route("/returns", get(list_sales_returns).post(create_sales_return))
}

pub async fn create_delivery_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateDocumentRequest>, JsonRejection>,
) -> Response {
    let draft = match document_draft(&services, body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.documents.create_delivery_order(draft).await {
        Ok(doc) => errors::json_ok(StatusCode::CREATED, doc),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_delivery_orders(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SegmentQuery>, QueryRejection>,
) -> Response {
    let segment = match query_segment(&services, query) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.documents.list_delivery_orders(segment).await {
        Ok(docs) => errors::json_ok(StatusCode::OK, docs),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_sales_return(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateDocumentRequest>, JsonRejection>,
) -> Response {
    let draft = match document_draft(&services, body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.documents.create_sales_return(draft).await {
        Ok(doc) => errors::json_ok(StatusCode::CREATED, doc),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_sales_returns(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SegmentQuery>, QueryRejection>,
) -> Response {
    let segment = match query_segment(&services, query) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.documents.list_sales_returns(segment).await {
        Ok(docs) => errors::json_ok(StatusCode::OK, docs),
        Err(e) => errors::store_error_to_response(e),
    }
}
