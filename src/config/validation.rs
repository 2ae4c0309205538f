//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending key (e.g. "viacep.base_url").
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.input.form_aliases.iter().any(|a| a.trim().is_empty()) {
        errors.push(ValidationError::new("input.form_aliases", "aliases must not be blank"));
    }

    for (field, value) in [
        ("viacep.base_url", &config.viacep.base_url),
        ("nominatim.base_url", &config.nominatim.base_url),
        ("groq.base_url", &config.groq.base_url),
    ] {
        if let Err(e) = url::Url::parse(value) {
            errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
        }
    }

    for (field, secs) in [
        ("viacep.timeout_secs", config.viacep.timeout_secs),
        ("nominatim.timeout_secs", config.nominatim.timeout_secs),
        ("groq.timeout_secs", config.groq.timeout_secs),
    ] {
        if secs == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if config.nominatim.user_agent.trim().is_empty() {
        errors.push(ValidationError::new(
            "nominatim.user_agent",
            "a client-identifying User-Agent is required",
        ));
    }

    if config.groq.model.trim().is_empty() {
        errors.push(ValidationError::new("groq.model", "must not be empty"));
    }

    if config.groq.api_key_env.trim().is_empty() {
        errors.push(ValidationError::new("groq.api_key_env", "must name an environment variable"));
    }

    if !(0.0..=2.0).contains(&config.groq.temperature) {
        errors.push(ValidationError::new("groq.temperature", "must be between 0 and 2"));
    }

    let search = &config.postal_search;
    if search.max_matches == 0 {
        errors.push(ValidationError::new("postal_search.max_matches", "must be at least 1"));
    }
    if search.probe_timeout_ms == 0 {
        errors.push(ValidationError::new("postal_search.probe_timeout_ms", "must be greater than 0"));
    }
    for suffix in &search.suffixes {
        if suffix.len() != 3 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            errors.push(ValidationError::new(
                "postal_search.suffixes",
                format!("'{}' is not a three-digit suffix", suffix),
            ));
        }
    }

    const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
    if !LOG_LEVELS.contains(&config.observability.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not one of {}", config.observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
