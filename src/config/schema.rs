//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the terminal gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Where payloads are looked for in a request.
    pub input: InputConfig,

    /// Response encoding options.
    pub response: ResponseConfig,

    /// ViaCEP postal-code service.
    pub viacep: ViaCepConfig,

    /// Nominatim reverse geocoding service.
    pub nominatim: NominatimConfig,

    /// Groq chat-completion service.
    pub groq: GroqConfig,

    /// Nearby-address postal search heuristic.
    pub postal_search: PostalSearchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Payload location settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    /// Form field names that may hold the XML payload, in priority order.
    /// Compared case-insensitively.
    pub form_aliases: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            form_aliases: ["xml", "xmldata", "xml_data", "dados", "data", "payload", "request"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Response encoding settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResponseConfig {
    /// Prefix UTF-16 bodies with a byte order mark.
    pub byte_order_mark: bool,
}

/// ViaCEP settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViaCepConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ViaCepConfig {
    fn default() -> Self {
        Self {
            base_url: "https://viacep.com.br".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Nominatim settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NominatimConfig {
    pub base_url: String,

    /// Client identification required by the Nominatim usage policy.
    pub user_agent: String,

    /// Fixed delay before each call, to stay under the public rate limit.
    pub request_delay_ms: u64,

    pub timeout_secs: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "terminal-gateway/0.1".to_string(),
            request_delay_ms: 1000,
            timeout_secs: 10,
        }
    }
}

/// Groq settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GroqConfig {
    pub base_url: String,
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Instruction placed before the user's text.
    pub prompt_prefix: String,

    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            prompt_prefix: "Corrija a ortografia e a gramática do texto a seguir, mantendo o \
                            sentido original. Responda apenas com o texto corrigido:\n\n"
                .to_string(),
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

/// Nearby-address search settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PostalSearchConfig {
    /// Timeout for each sibling-code probe in milliseconds.
    pub probe_timeout_ms: u64,

    /// Maximum accepted addresses, the original one included.
    pub max_matches: usize,

    /// Three-digit endings combined with the 5-digit prefix to form probes.
    pub suffixes: Vec<String>,

    /// Street words that mark an address as too generic to trust alone.
    pub generic_keywords: Vec<String>,
}

impl Default for PostalSearchConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 3000,
            max_matches: 8,
            suffixes: [
                "000", "001", "010", "020", "050", "100", "110", "200", "300", "400", "500",
                "700", "900",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            generic_keywords: ["avenida", "rodovia", "estrada", "alameda"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.postal_search.suffixes.len(), 13);
        assert_eq!(config.postal_search.max_matches, 8);
        assert!(!config.response.byte_order_mark);
    }

    #[test]
    fn test_partial_section_override() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [nominatim]
            request_delay_ms = 0

            [viacep]
            base_url = "http://127.0.0.1:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.nominatim.request_delay_ms, 0);
        assert_eq!(config.nominatim.user_agent, "terminal-gateway/0.1");
        assert_eq!(config.viacep.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.viacep.timeout_secs, 10);
    }
}
