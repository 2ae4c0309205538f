//! ViaCEP postal-code client.
//!
//! # Responsibilities
//! - Look up one 8-digit code (`GET /ws/{cep}/json/`)
//! - Translate the `"erro": true` sentinel into `NotFound`
//! - Offer a short-deadline probe for the nearby-address search

use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::config::ViaCepConfig;
use crate::observability::metrics;
use crate::upstream::types::{state_name, Address, UpstreamError, UpstreamResult};

const SERVICE: &str = "viacep";

/// ViaCEP JSON body. Every member is optional; error replies carry only `erro`.
#[derive(Debug, Default, Deserialize)]
struct ViaCepResponse {
    cep: Option<String>,
    logradouro: Option<String>,
    complemento: Option<String>,
    bairro: Option<String>,
    localidade: Option<String>,
    uf: Option<String>,
    estado: Option<String>,
    erro: Option<serde_json::Value>,
}

impl ViaCepResponse {
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn into_address(self, requested: &str) -> Address {
        let state_code = self.uf.unwrap_or_default();
        let state = self
            .estado
            .filter(|s| !s.trim().is_empty())
            .or_else(|| state_name(&state_code).map(str::to_string))
            .unwrap_or_default();
        Address {
            postal_code: self
                .cep
                .map(|c| c.chars().filter(char::is_ascii_digit).collect())
                .unwrap_or_else(|| requested.to_string()),
            street: self.logradouro.unwrap_or_default(),
            complement: self.complemento.unwrap_or_default(),
            neighborhood: self.bairro.unwrap_or_default(),
            city: self.localidade.unwrap_or_default(),
            state,
            state_code,
        }
    }
}

/// Client for the ViaCEP web service.
#[derive(Clone)]
pub struct ViaCepClient {
    http: reqwest::Client,
    base_url: String,
}

impl ViaCepClient {
    pub fn new(config: &ViaCepConfig) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::NotConfigured {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up a normalized 8-digit code.
    pub async fn lookup(&self, cep: &str) -> UpstreamResult<Address> {
        self.fetch(cep, None).await
    }

    /// Look up a code with a tighter deadline than the client default.
    pub async fn probe(&self, cep: &str, timeout: Duration) -> UpstreamResult<Address> {
        self.fetch(cep, Some(timeout)).await
    }

    async fn fetch(&self, cep: &str, timeout: Option<Duration>) -> UpstreamResult<Address> {
        let start = Instant::now();
        let result = self.fetch_inner(cep, timeout).await;
        metrics::record_upstream(SERVICE, result.is_ok(), start);
        result
    }

    async fn fetch_inner(&self, cep: &str, timeout: Option<Duration>) -> UpstreamResult<Address> {
        let url = format!("{}/ws/{}/json/", self.base_url, cep);
        tracing::debug!(%url, "Querying ViaCEP");

        let mut request = self.http.get(&url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body: ViaCepResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        if body.is_error() {
            return Err(UpstreamError::NotFound {
                service: SERVICE,
                message: format!("CEP {} não encontrado.", cep),
            });
        }

        Ok(body.into_address(cep))
    }
}

impl std::fmt::Debug for ViaCepClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViaCepClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_sentinel_variants() {
        let bool_flag: ViaCepResponse = serde_json::from_str(r#"{"erro": true}"#).unwrap();
        assert!(bool_flag.is_error());
        let string_flag: ViaCepResponse = serde_json::from_str(r#"{"erro": "true"}"#).unwrap();
        assert!(string_flag.is_error());
        let ok: ViaCepResponse = serde_json::from_str(r#"{"cep": "01310-000"}"#).unwrap();
        assert!(!ok.is_error());
    }

    #[test]
    fn test_maps_response_to_address() {
        let body: ViaCepResponse = serde_json::from_str(
            r#"{"cep":"01310-000","logradouro":"Avenida Paulista","complemento":"de 612 a 1510 - lado par","bairro":"Bela Vista","localidade":"São Paulo","uf":"SP"}"#,
        )
        .unwrap();
        let address = body.into_address("01310000");
        assert_eq!(address.postal_code, "01310000");
        assert_eq!(address.street, "Avenida Paulista");
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.state_code, "SP");
        assert_eq!(address.state, "São Paulo");
    }

    #[test]
    fn test_missing_members_default_to_empty() {
        let body: ViaCepResponse =
            serde_json::from_str(r#"{"logradouro":"Rua X","localidade":"SP","uf":"SP"}"#).unwrap();
        let address = body.into_address("01310000");
        assert_eq!(address.postal_code, "01310000");
        assert_eq!(address.complement, "");
        assert_eq!(address.neighborhood, "");
    }

    #[test]
    fn test_client_creation_trims_base_url() {
        let config = ViaCepConfig {
            base_url: "http://localhost:1/".into(),
            timeout_secs: 1,
        };
        let client = ViaCepClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:1");
    }
}
