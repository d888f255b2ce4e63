use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};

use loomerp_core::DocumentId;
use loomerp_infra::services::DocumentDraft;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route(
            "/goods-receipts",
            get(list_goods_receipts).post(create_goods_receipt),
        )
        .route(
            "/returns",
            get(list_purchase_returns).post(create_purchase_return),
        )
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/:id/reconciliation", get(invoice_reconciliation))
}

/// Shared by every stock document kind: body → draft in the resolved segment.
pub(crate) fn document_draft(
    services: &AppServices,
    body: Result<Json<dto::CreateDocumentRequest>, JsonRejection>,
) -> Result<DocumentDraft, Response> {
    let body = errors::json_body(body)?;
    services
        .segment(body.segment.as_deref())
        .and_then(|segment| body.into_draft(segment))
        .map_err(errors::domain_error_to_response)
}

/// Segment named by `?segment=`, or the configured default.
pub(crate) fn query_segment(
    services: &AppServices,
    query: Result<Query<dto::SegmentQuery>, QueryRejection>,
) -> Result<loomerp_core::Segment, Response> {
    let query = errors::query_params(query)?;
    services
        .segment(query.segment.as_deref())
        .map_err(errors::domain_error_to_response)
}

pub async fn create_goods_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateDocumentRequest>, JsonRejection>,
) -> Response {
    let draft = match document_draft(&services, body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.documents.create_goods_receipt(draft).await {
        Ok(doc) => errors::json_ok(StatusCode::CREATED, doc),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_goods_receipts(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SegmentQuery>, QueryRejection>,
) -> Response {
    let segment = match query_segment(&services, query) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.documents.list_goods_receipts(segment).await {
        Ok(docs) => errors::json_ok(StatusCode::OK, docs),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_purchase_return(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateDocumentRequest>, JsonRejection>,
) -> Response {
    let draft = match document_draft(&services, body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.documents.create_purchase_return(draft).await {
        Ok(doc) => errors::json_ok(StatusCode::CREATED, doc),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_purchase_returns(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SegmentQuery>, QueryRejection>,
) -> Response {
    let segment = match query_segment(&services, query) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.documents.list_purchase_returns(segment).await {
        Ok(docs) => errors::json_ok(StatusCode::OK, docs),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateInvoiceRequest>, JsonRejection>,
) -> Response {
    let body = match errors::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let draft = match services
        .segment(body.segment.as_deref())
        .and_then(|segment| body.into_draft(segment))
    {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.create_purchase_invoice(draft).await {
        Ok(invoice) => match dto::InvoiceResponse::from_invoice(invoice) {
            Ok(resp) => errors::json_ok(StatusCode::CREATED, resp),
            Err(e) => errors::domain_error_to_response(e),
        },
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SegmentQuery>, QueryRejection>,
) -> Response {
    let segment = match query_segment(&services, query) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let invoices = match services.documents.list_purchase_invoices(segment).await {
        Ok(invoices) => invoices,
        Err(e) => return errors::store_error_to_response(e),
    };

    match invoices
        .into_iter()
        .map(dto::InvoiceResponse::from_invoice)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(resp) => errors::json_ok(StatusCode::OK, resp),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn invoice_reconciliation(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: DocumentId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.reconciliation(id).await {
        Ok(report) => errors::json_ok(StatusCode::OK, report),
        Err(e) => errors::store_error_to_response(e),
    }
}
