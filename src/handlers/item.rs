//! Item validation endpoints (`/validar-item`, `/validar-item/legado`).
//!
//! Both answer with the dialog schema; they differ in flag and input policy.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use std::time::Instant;

use crate::error::AppError;
use crate::handlers::weight::{parse_flag, FlagPolicy, Simulation};
use crate::handlers::{read_fields, respond, Endpoint};
use crate::http::request::InputPolicy;
use crate::http::response::Charset;
use crate::http::server::AppState;
use crate::xml::{DialogResponse, ExtractionPolicy, Icon, ResponseDocument, Schema};

const VALIDATE: Endpoint = Endpoint {
    name: "validar_item",
    schema: Schema::Dialog,
    charset: Charset::Utf16,
    input: InputPolicy::REQUIRED,
};

const VALIDATE_LEGACY: Endpoint = Endpoint {
    name: "validar_item_legado",
    schema: Schema::Dialog,
    charset: Charset::LegacyUtf8,
    input: InputPolicy::LENIENT,
};

const FLAG_FIELD: &str = "TSTWS";

/// Action that closes the terminal form.
const ACTION_CLOSE_FORM: &str = "CloseForm";

/// Dialog for a validation outcome.
pub fn validation_dialog(outcome: Simulation) -> DialogResponse {
    match outcome {
        Simulation::Stable => DialogResponse {
            text: "Item validado com sucesso.".to_string(),
            icon: Icon::Information,
            button_text: "OK".to_string(),
            short_text: "OK".to_string(),
            long_text: String::new(),
            value: "Sucesso".to_string(),
            action: ACTION_CLOSE_FORM.to_string(),
        },
        Simulation::Unstable => DialogResponse {
            text: "Item inconsistente. Por favor, verifique novamente.".to_string(),
            icon: Icon::Warning,
            button_text: "OK".to_string(),
            short_text: "Verificar".to_string(),
            long_text: String::new(),
            value: "Inconsistente".to_string(),
            action: String::new(),
        },
    }
}

fn validate(
    state: &AppState,
    endpoint: &Endpoint,
    headers: &HeaderMap,
    body: &[u8],
    extraction: &ExtractionPolicy,
    flags: FlagPolicy,
) -> Result<ResponseDocument, AppError> {
    let fields = read_fields(state, endpoint, headers, body, extraction)?;
    let outcome = parse_flag(FLAG_FIELD, fields.get(FLAG_FIELD), flags)?;
    Ok(validation_dialog(outcome).into())
}

pub async fn validar_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = validate(
        &state,
        &VALIDATE,
        &headers,
        &body,
        &ExtractionPolicy::standard(),
        FlagPolicy::Strict,
    );
    respond(&state, &VALIDATE, &headers, start, result)
}

pub async fn validar_item_legado(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = validate(
        &state,
        &VALIDATE_LEGACY,
        &headers,
        &body,
        &ExtractionPolicy::exhaustive(),
        FlagPolicy::DefaultToZero,
    );
    respond(&state, &VALIDATE_LEGACY, &headers, start, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_dialog() {
        let dialog = validation_dialog(Simulation::Stable);
        assert_eq!(dialog.value, "Sucesso");
        assert_eq!(dialog.icon, Icon::Information);
        assert_eq!(dialog.action, "CloseForm");
    }

    #[test]
    fn test_inconsistent_dialog() {
        let dialog = validation_dialog(Simulation::Unstable);
        assert_eq!(dialog.value, "Inconsistente");
        assert_eq!(dialog.icon, Icon::Warning);
        assert_eq!(dialog.short_text, "Verificar");
        assert!(dialog.action.is_empty());
    }
}
