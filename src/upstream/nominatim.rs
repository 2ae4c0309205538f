//! Nominatim reverse geocoding client.
//!
//! # Responsibilities
//! - Call `GET /reverse?format=jsonv2&lat=..&lon=..&addressdetails=1`
//! - Send the client-identifying User-Agent required by the usage policy
//! - Flatten the address hierarchy onto the terminal's address fields

use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::config::NominatimConfig;
use crate::observability::metrics;
use crate::upstream::types::{state_code, Address, UpstreamError, UpstreamResult};

const SERVICE: &str = "nominatim";

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    error: Option<String>,
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    road: Option<String>,
    pedestrian: Option<String>,
    footway: Option<String>,
    house_number: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    quarter: Option<String>,
    city_district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    #[serde(rename = "ISO3166-2-lvl4")]
    iso_subdivision: Option<String>,
}

fn first(candidates: [Option<String>; 4]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .unwrap_or_default()
}

impl NominatimAddress {
    fn into_address(self) -> Address {
        let state = self.state.unwrap_or_default();
        let state_code = self
            .iso_subdivision
            .as_deref()
            .and_then(|iso| iso.rsplit_once('-'))
            .map(|(_, code)| code.to_string())
            .or_else(|| state_code(&state).map(str::to_string))
            .unwrap_or_default();
        Address {
            postal_code: self.postcode.unwrap_or_default(),
            street: first([self.road, self.pedestrian, self.footway, None]),
            complement: self.house_number.unwrap_or_default(),
            neighborhood: first([
                self.suburb,
                self.neighbourhood,
                self.quarter,
                self.city_district,
            ]),
            city: first([self.city, self.town, self.village, self.municipality]),
            state,
            state_code,
        }
    }
}

/// Client for a Nominatim instance.
#[derive(Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimClient {
    pub fn new(config: &NominatimConfig) -> UpstreamResult<Self> {
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
            user_agent: config.user_agent.clone(),
        })
    }

    /// Resolve coordinates to an address.
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> UpstreamResult<Address> {
        let start = Instant::now();
        let result = self.reverse_inner(latitude, longitude).await;
        metrics::record_upstream(SERVICE, result.is_ok(), start);
        result
    }

    async fn reverse_inner(&self, latitude: f64, longitude: f64) -> UpstreamResult<Address> {
        let mut url = url::Url::parse(&format!("{}/reverse", self.base_url)).map_err(|e| {
            UpstreamError::NotConfigured {
                service: SERVICE,
                message: format!("invalid base URL '{}': {}", self.base_url, e),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("format", "jsonv2")
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string())
            .append_pair("addressdetails", "1");

        tracing::debug!(%url, "Querying Nominatim");

        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body: ReverseResponse = response.json().await.map_err(|e| UpstreamError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        if let Some(error) = body.error {
            return Err(UpstreamError::NotFound {
                service: SERVICE,
                message: format!("Endereço não encontrado para as coordenadas ({}).", error),
            });
        }

        body.address
            .map(NominatimAddress::into_address)
            .ok_or_else(|| UpstreamError::NotFound {
                service: SERVICE,
                message: "Endereço não encontrado para as coordenadas.".to_string(),
            })
    }
}

impl std::fmt::Debug for NominatimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NominatimClient")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
