//! Terminal endpoints.
//!
//! # Data Flow
//! ```text
//! axum handler (headers + raw body)
//!     → read_fields: resolve_input → parse_document → extract
//!     → business logic (postal.rs, geocoding.rs, text.rs, weight.rs, item.rs)
//!     → Result<ResponseDocument, AppError>
//!     → respond: errors become documents, metrics + logs, UTF-16 encoding
//! ```
//!
//! # Design Decisions
//! - Each endpoint keeps its own rules (flag policy, extraction policy,
//!   input policy) even where endpoints look alike
//! - Errors are translated to documents only in `respond`

pub mod geocoding;
pub mod item;
pub mod postal;
pub mod text;
pub mod weight;

use axum::http::{header, HeaderMap};
use axum::response::Response;
use std::time::Instant;

use crate::error::{AppError, ErrorKind};
use crate::http::request::{resolve_input, InputPolicy, X_REQUEST_ID};
use crate::http::response::{xml_response, Charset};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::xml::{extract, parse_document, ExtractionPolicy, FieldSet, ResponseDocument, Schema};

/// Static description of one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    /// Label used in logs and metrics.
    pub name: &'static str,
    pub schema: Schema,
    pub charset: Charset,
    pub input: InputPolicy,
}

/// Locate, parse and extract the request's fields.
pub fn read_fields(
    state: &AppState,
    endpoint: &Endpoint,
    headers: &HeaderMap,
    body: &[u8],
    policy: &ExtractionPolicy,
) -> Result<FieldSet, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let payload = resolve_input(
        content_type,
        body,
        &state.config.input.form_aliases,
        endpoint.input,
    )
    .ok_or(AppError::InputAbsent {
        required: endpoint.input.require_body,
    })?;

    let document = parse_document(&payload)?;
    let fields = extract(&document, policy);
    tracing::debug!(endpoint = endpoint.name, fields = fields.len(), "Fields extracted");
    Ok(fields)
}

/// Scalar value of a field that must be present.
pub fn required<'a>(fields: &'a FieldSet, id: &str) -> Result<&'a str, AppError> {
    fields
        .get(id)
        .ok_or_else(|| AppError::MissingField(id.to_string()))
}

/// Turn a handler result into the HTTP response.
pub fn respond(
    state: &AppState,
    endpoint: &Endpoint,
    headers: &HeaderMap,
    start: Instant,
    result: Result<ResponseDocument, AppError>,
) -> Response {
    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let (status, document, outcome) = match result {
        Ok(document) => {
            tracing::debug!(request_id, endpoint = endpoint.name, "Request succeeded");
            (axum::http::StatusCode::OK, document, "success")
        }
        Err(err) => {
            let kind = err.kind();
            if kind == ErrorKind::Internal {
                tracing::error!(
                    request_id,
                    endpoint = endpoint.name,
                    error = ?err,
                    "Request failed"
                );
            } else {
                tracing::warn!(
                    request_id,
                    endpoint = endpoint.name,
                    kind = kind.as_str(),
                    error = %err,
                    "Request rejected"
                );
            }
            (err.status(), err.to_document(endpoint.schema), kind.as_str())
        }
    };

    metrics::record_request(endpoint.name, status.as_u16(), outcome, start);
    xml_response(
        status,
        &document,
        endpoint.charset,
        state.config.response.byte_order_mark,
    )
}
