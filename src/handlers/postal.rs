//! Postal-code lookup endpoints.
//!
//! # Responsibilities
//! - `/consultar-cep`: one ViaCEP lookup mapped onto the address fields
//! - `/consultar-cep/proximos`: the same lookup, widened to sibling codes
//!   when the address alone is too generic to identify a place
//!
//! # Design Decisions
//! - The code is normalized and checked before any upstream call
//! - The nearby search is a heuristic over codes sharing the 5-digit prefix,
//!   not a geographic radius search
//! - Probes run one after another with a short deadline; a failed probe is
//!   skipped, never fatal

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::config::PostalSearchConfig;
use crate::error::AppError;
use crate::handlers::{read_fields, required, respond, Endpoint};
use crate::http::request::InputPolicy;
use crate::http::response::Charset;
use crate::http::server::AppState;
use crate::upstream::{Address, ViaCepClient};
use crate::xml::document::RESULT_SELECTION;
use crate::xml::{ExtractionPolicy, ResponseDocument, ResponseV2, Row, Schema};

const LOOKUP: Endpoint = Endpoint {
    name: "consultar_cep",
    schema: Schema::V2,
    charset: Charset::Utf16,
    input: InputPolicy::REQUIRED,
};

const NEARBY: Endpoint = Endpoint {
    name: "consultar_cep_proximos",
    schema: Schema::V2,
    charset: Charset::Utf16,
    input: InputPolicy::REQUIRED,
};

const CEP_FIELD: &str = "CEP";
const ADDRESS_TABLE: &str = "ENDERECOS";
const ADDRESS_COUNT_FIELD: &str = "QTD_ENDERECOS";

/// Words too common in Brazilian addresses to relate two places.
const STOP_WORDS: &[&str] = &[
    "rua", "avenida", "travessa", "alameda", "estrada", "rodovia", "praca", "praça", "largo",
    "vila", "dos", "das", "del", "com", "sem", "para",
];

pub async fn consultar_cep(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = lookup(&state, &headers, &body).await;
    respond(&state, &LOOKUP, &headers, start, result)
}

pub async fn consultar_cep_proximos(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = lookup_nearby(&state, &headers, &body).await;
    respond(&state, &NEARBY, &headers, start, result)
}

async fn lookup(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ResponseDocument, AppError> {
    let fields = read_fields(state, &LOOKUP, headers, body, &ExtractionPolicy::standard())?;
    let cep = normalize_cep(required(&fields, CEP_FIELD)?)?;
    let address = state.viacep.lookup(&cep).await?;
    Ok(address_response(&address).into())
}

async fn lookup_nearby(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ResponseDocument, AppError> {
    let fields = read_fields(state, &NEARBY, headers, body, &ExtractionPolicy::standard())?;
    let cep = normalize_cep(required(&fields, CEP_FIELD)?)?;
    let address = state.viacep.lookup(&cep).await?;

    let search = &state.config.postal_search;
    if !needs_search(&cep, &address, &search.generic_keywords) {
        return Ok(address_response(&address).into());
    }

    let matches = search_nearby(&state.viacep, search, &cep, address).await;
    if matches.len() > 1 {
        Ok(selection_response(&matches).into())
    } else {
        // At least the original address is always present.
        let single = matches
            .first()
            .ok_or_else(|| AppError::Internal("nearby search lost the original address".into()))?;
        Ok(address_response(single).into())
    }
}

/// Strip formatting and require exactly eight digits.
pub fn normalize_cep(raw: &str) -> Result<String, AppError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 8 {
        return Err(AppError::invalid(
            CEP_FIELD,
            format!("'{}' não possui 8 dígitos", raw.trim()),
        ));
    }
    Ok(digits)
}

/// Whether an address is too generic to return on its own.
pub fn needs_search(cep: &str, address: &Address, generic_keywords: &[String]) -> bool {
    if cep.ends_with("000") || address.complement.trim().is_empty() {
        return true;
    }
    let street = address.street.to_lowercase();
    generic_keywords
        .iter()
        .any(|keyword| street.contains(&keyword.to_lowercase()))
}

/// Codes sharing the 5-digit prefix, in configured suffix order, without `cep`.
pub fn candidate_codes(cep: &str, suffixes: &[String]) -> Vec<String> {
    let prefix = &cep[..cep.len().min(5)];
    let mut seen = HashSet::new();
    suffixes
        .iter()
        .map(|suffix| format!("{}{}", prefix, suffix))
        .filter(|candidate| candidate != cep && seen.insert(candidate.clone()))
        .collect()
}

fn significant_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 3 && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Whether `candidate` plausibly lies near `original`.
pub fn is_related(original: &Address, candidate: &Address) -> bool {
    if !same_text(&original.city, &candidate.city)
        || !same_text(&original.state_code, &candidate.state_code)
    {
        return false;
    }
    let shares = |a: &str, b: &str| !significant_tokens(a).is_disjoint(&significant_tokens(b));
    shares(&original.neighborhood, &candidate.neighborhood)
        || shares(&original.street, &candidate.street)
}

/// Probe sibling codes and collect related addresses, the original first.
pub async fn search_nearby(
    client: &ViaCepClient,
    config: &PostalSearchConfig,
    cep: &str,
    original: Address,
) -> Vec<Address> {
    let probe_timeout = Duration::from_millis(config.probe_timeout_ms);
    let mut matches = vec![original];

    for candidate in candidate_codes(cep, &config.suffixes) {
        if matches.len() >= config.max_matches {
            break;
        }
        match client.probe(&candidate, probe_timeout).await {
            Ok(address) => {
                let duplicate = matches.iter().any(|m| m.postal_code == address.postal_code);
                if !duplicate && is_related(&matches[0], &address) {
                    tracing::debug!(cep = %candidate, "Nearby address accepted");
                    matches.push(address);
                }
            }
            Err(e) => {
                tracing::debug!(cep = %candidate, error = %e, "Nearby probe skipped");
            }
        }
    }

    tracing::info!(cep, matches = matches.len(), "Nearby postal search finished");
    matches
}

/// Single-address reply.
pub fn address_response(address: &Address) -> ResponseV2 {
    ResponseV2::new("Endereço encontrado.")
        .with_field("CEP", &address.postal_code)
        .with_field("LOGRADOURO", &address.street)
        .with_field("COMPLEMENTO", &address.complement)
        .with_field("BAIRRO", &address.neighborhood)
        .with_field("CIDADE", &address.city)
        .with_field("ESTADO", &address.state)
        .with_field("UF", &address.state_code)
}

/// Selection-list reply, one row per address.
pub fn selection_response(addresses: &[Address]) -> ResponseV2 {
    let rows = addresses
        .iter()
        .map(|address| {
            let mut row = Row::new();
            row.insert("CEP", &address.postal_code);
            row.insert("LOGRADOURO", &address.street);
            row.insert("COMPLEMENTO", &address.complement);
            row.insert("BAIRRO", &address.neighborhood);
            row.insert("CIDADE", &address.city);
            row.insert("UF", &address.state_code);
            row
        })
        .collect();

    ResponseV2::new(format!(
        "Foram encontrados {} endereços próximos. Selecione um.",
        addresses.len()
    ))
    .with_field(ADDRESS_COUNT_FIELD, addresses.len().to_string())
    .with_table(ADDRESS_TABLE, rows)
    .with_value(RESULT_SELECTION)
}
