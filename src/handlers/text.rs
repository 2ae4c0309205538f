//! Text correction endpoint (`/corrigir-texto`).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use std::time::Instant;

use crate::error::AppError;
use crate::handlers::{read_fields, required, respond, Endpoint};
use crate::http::request::InputPolicy;
use crate::http::response::Charset;
use crate::http::server::AppState;
use crate::xml::{ExtractionPolicy, ResponseDocument, ResponseV2, Schema};

const ENDPOINT: Endpoint = Endpoint {
    name: "corrigir_texto",
    schema: Schema::V2,
    charset: Charset::Utf16,
    input: InputPolicy::STRICT,
};

const TEXT_FIELD: &str = "TALK_TEXT";

pub async fn corrigir_texto(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = correct(&state, &headers, &body).await;
    respond(&state, &ENDPOINT, &headers, start, result)
}

async fn correct(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ResponseDocument, AppError> {
    let fields = read_fields(state, &ENDPOINT, headers, body, &ExtractionPolicy::standard())?;
    let text = required(&fields, TEXT_FIELD)?.trim();
    if text.is_empty() {
        return Err(AppError::invalid(TEXT_FIELD, "o texto está vazio"));
    }

    let corrected = state.groq.correct(text).await?;
    tracing::debug!(
        original_len = text.len(),
        corrected_len = corrected.len(),
        "Text corrected"
    );

    Ok(ResponseV2::new("Texto corrigido.")
        .with_field(TEXT_FIELD, corrected)
        .into())
}
