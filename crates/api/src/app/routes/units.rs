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
use rust_decimal::Decimal;
use serde_json::json;

use loomerp_core::DomainError;
use loomerp_inventory::UnitCode;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/conversions", get(list_conversions).post(add_conversion))
        .route("/convert", get(convert))
}

pub async fn add_conversion(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateConversionRequest>, JsonRejection>,
) -> Response {
    let body = match errors::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let conversion = match body.into_conversion() {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.add_conversion(conversion).await {
        Ok(saved) => errors::json_ok(StatusCode::CREATED, saved),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_conversions(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.documents.list_conversions().await {
        Ok(conversions) => errors::json_ok(StatusCode::OK, conversions),
        Err(e) => errors::store_error_to_response(e),
    }
}

fn parse_convert_query(q: dto::ConvertQuery) -> Result<(UnitCode, UnitCode, Decimal), DomainError> {
    let from = q.from.ok_or_else(|| DomainError::validation("from is required"))?;
    let to = q.to.ok_or_else(|| DomainError::validation("to is required"))?;
    let quantity = match q.quantity {
        Some(raw) => raw
            .trim()
            .parse::<Decimal>()
            .map_err(|_| DomainError::validation(format!("quantity {raw:?} is not a number")))?,
        None => Decimal::ONE,
    };
    Ok((UnitCode::new(from)?, UnitCode::new(to)?, quantity))
}

pub async fn convert(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ConvertQuery>, QueryRejection>,
) -> Response {
    let query = match errors::query_params(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let (from, to, quantity) = match parse_convert_query(query) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.convert(quantity, &from, &to).await {
        Ok(converted) => errors::json_ok(
            StatusCode::OK,
            json!({
                "from": from,
                "to": to,
                "quantity": quantity,
                "converted": converted,
            }),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}
