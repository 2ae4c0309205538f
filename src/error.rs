//! Request error taxonomy.
//!
//! Every stage returns `Result<_, AppError>`; errors become a terminal
//! document only at the handler boundary (`handlers::respond`).

use axum::http::StatusCode;
use thiserror::Error;

use crate::upstream::UpstreamError;
use crate::xml::document::{DialogResponse, ResponseDocument, ResponseV2, Schema};
use crate::xml::ParseError;

/// Coarse category of a failed request, used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputAbsent,
    ParseFailure,
    MissingField,
    InvalidValue,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputAbsent => "input_absent",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::Upstream => "upstream_failure",
            ErrorKind::Internal => "internal_failure",
        }
    }
}

/// Errors that can end a terminal request.
#[derive(Debug, Error)]
pub enum AppError {
    /// No payload could be located in the request.
    #[error("no XML payload found in request")]
    InputAbsent {
        /// The endpoint cannot run without a body.
        required: bool,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("required field '{0}' is missing")]
    MissingField(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InputAbsent { .. } => ErrorKind::InputAbsent,
            AppError::Parse(_) => ErrorKind::ParseFailure,
            AppError::MissingField(_) => ErrorKind::MissingField,
            AppError::InvalidValue { .. } => ErrorKind::InvalidValue,
            AppError::Upstream(_) => ErrorKind::Upstream,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status; business failures travel in-band with 200.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InputAbsent { required: true } => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }

    /// Message shown on the terminal.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InputAbsent { .. } => "Nenhum XML encontrado na requisição.".to_string(),
            AppError::Parse(_) => "Não foi possível interpretar o XML recebido.".to_string(),
            AppError::MissingField(field) => format!("Campo obrigatório ausente: {}.", field),
            AppError::InvalidValue { field, reason } => {
                format!("Valor inválido para {}: {}.", field, reason)
            }
            AppError::Upstream(e) => e.user_message(),
            AppError::Internal(_) => "Erro interno ao processar a requisição.".to_string(),
        }
    }

    /// Render as an error document of the given schema.
    pub fn to_document(&self, schema: Schema) -> ResponseDocument {
        let message = self.user_message();
        let detail = self.to_string();
        match schema {
            Schema::V2 => ResponseV2::error(message, detail).into(),
            Schema::Dialog => DialogResponse::error(message, detail).into(),
        }
    }
}
