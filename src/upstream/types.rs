//! Shared upstream types and error definitions.

use thiserror::Error;

/// Errors that can occur while calling a third-party service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection or transport failure.
    #[error("{service} request failed: {message}")]
    Network { service: &'static str, message: String },

    /// The call exceeded its deadline.
    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    /// Non-success HTTP status.
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// The service answered but reported no usable result.
    #[error("{service}: {message}")]
    NotFound { service: &'static str, message: String },

    /// The response body did not match the expected shape.
    #[error("{service} response could not be decoded: {message}")]
    Decode { service: &'static str, message: String },

    /// Missing credentials or client setup failure.
    #[error("{service} is not configured: {message}")]
    NotConfigured { service: &'static str, message: String },
}

impl UpstreamError {
    pub(crate) fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout { service }
        } else if err.is_decode() {
            UpstreamError::Decode {
                service,
                message: err.to_string(),
            }
        } else {
            UpstreamError::Network {
                service,
                message: err.to_string(),
            }
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            UpstreamError::Network { service, .. }
            | UpstreamError::Timeout { service }
            | UpstreamError::Status { service, .. }
            | UpstreamError::NotFound { service, .. }
            | UpstreamError::Decode { service, .. }
            | UpstreamError::NotConfigured { service, .. } => service,
        }
    }

    /// Message shown on the terminal.
    pub fn user_message(&self) -> String {
        match self {
            UpstreamError::NotFound { message, .. } => message.clone(),
            UpstreamError::Timeout { service } => {
                format!("O serviço {} não respondeu a tempo.", service)
            }
            UpstreamError::Status { service, status } => {
                format!("O serviço {} está indisponível (HTTP {}).", service, status)
            }
            UpstreamError::Network { service, .. } => {
                format!("Falha ao contactar o serviço {}.", service)
            }
            UpstreamError::Decode { service, .. } => {
                format!("Resposta inválida do serviço {}.", service)
            }
            UpstreamError::NotConfigured { service, .. } => {
                format!("O serviço {} não está configurado.", service)
            }
        }
    }
}

/// Result type for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Address as mapped onto the terminal's fixed output fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub postal_code: String,
    pub street: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub state_code: String,
}

const BRAZILIAN_STATES: [(&str, &str); 27] = [
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapá"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceará"),
    ("DF", "Distrito Federal"),
    ("ES", "Espírito Santo"),
    ("GO", "Goiás"),
    ("MA", "Maranhão"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Pará"),
    ("PB", "Paraíba"),
    ("PR", "Paraná"),
    ("PE", "Pernambuco"),
    ("PI", "Piauí"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondônia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "São Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

/// Full state name for a two-letter code.
pub fn state_name(code: &str) -> Option<&'static str> {
    BRAZILIAN_STATES
        .iter()
        .find(|(uf, _)| uf.eq_ignore_ascii_case(code.trim()))
        .map(|(_, name)| *name)
}

/// Two-letter code for a full state name (case-insensitive).
pub fn state_code(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    BRAZILIAN_STATES
        .iter()
        .find(|(_, full)| full.to_lowercase() == name)
        .map(|(uf, _)| *uf)
}
