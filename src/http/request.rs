//! Request handling: payload location and request identifiers.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Locate the XML payload in a form field or the raw body
//! - Decode UTF-16 (BOM), UTF-8 and, when allowed, Latin-1 bodies
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Decoding rules are per endpoint (`InputPolicy`), not global

use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// How an endpoint treats its request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPolicy {
    /// Decode bodies that are not valid UTF-8 as Latin-1 instead of rejecting them.
    pub latin1_fallback: bool,
    /// A missing payload is a malformed request (400) rather than an in-band error.
    pub require_body: bool,
}

impl InputPolicy {
    /// UTF-8 or UTF-16 only, body required.
    pub const STRICT: InputPolicy = InputPolicy {
        latin1_fallback: false,
        require_body: true,
    };

    /// Any supported encoding, body required.
    pub const REQUIRED: InputPolicy = InputPolicy {
        latin1_fallback: true,
        require_body: true,
    };

    /// Any supported encoding; a missing body is reported in-band.
    pub const LENIENT: InputPolicy = InputPolicy {
        latin1_fallback: true,
        require_body: false,
    };
}

/// Locate the XML payload of a request.
///
/// Returns `None` when nothing non-blank could be found.
pub fn resolve_input(
    content_type: Option<&str>,
    body: &[u8],
    aliases: &[String],
    policy: InputPolicy,
) -> Option<String> {
    if is_form(content_type) {
        if let Some(payload) = from_form(body, aliases) {
            return Some(payload);
        }
    }

    decode_body(body, policy.latin1_fallback).filter(|text| !text.trim().is_empty())
}

fn is_form(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

fn from_form(body: &[u8], aliases: &[String]) -> Option<String> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let aliased = aliases.iter().find_map(|alias| {
        pairs
            .iter()
            .find(|(name, value)| name.eq_ignore_ascii_case(alias) && !value.trim().is_empty())
    });

    if let Some((name, value)) = aliased {
        tracing::debug!(field = %name, "Payload found in form field");
        return Some(value.clone());
    }

    pairs
        .into_iter()
        .find(|(_, value)| !value.trim().is_empty())
        .map(|(name, value)| {
            tracing::debug!(field = %name, "Payload taken from first non-empty form field");
            value
        })
}

/// Decode a raw body following its byte order mark.
pub fn decode_body(body: &[u8], latin1_fallback: bool) -> Option<String> {
    if let Some(rest) = body.strip_prefix(UTF16LE_BOM) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = body.strip_prefix(UTF16BE_BOM) {
        return decode_utf16(rest, u16::from_be_bytes);
    }

    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    match std::str::from_utf8(body) {
        Ok(text) => Some(text.to_string()),
        Err(e) if latin1_fallback => {
            tracing::debug!(error = %e, "Body is not UTF-8, decoding as Latin-1");
            Some(body.iter().map(|&b| b as char).collect())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Body is not UTF-8");
            None
        }
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}
