//! Reverse geocoding endpoint (`/geocodificar-reverso`).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use std::time::{Duration, Instant};

use crate::error::AppError;
use crate::handlers::{read_fields, respond, Endpoint};
use crate::http::request::InputPolicy;
use crate::http::response::Charset;
use crate::http::server::AppState;
use crate::xml::{ExtractionPolicy, ResponseDocument, ResponseV2, Schema};

const ENDPOINT: Endpoint = Endpoint {
    name: "geocodificar_reverso",
    schema: Schema::V2,
    charset: Charset::Utf16,
    input: InputPolicy::REQUIRED,
};

/// Fields that may hold the coordinates, in priority order.
const COORDINATE_FIELDS: &[&str] = &["LATLONG", "COORDENADAS", "LOCALIZACAO"];

pub async fn geocodificar_reverso(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = reverse(&state, &headers, &body).await;
    respond(&state, &ENDPOINT, &headers, start, result)
}

async fn reverse(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ResponseDocument, AppError> {
    let fields = read_fields(state, &ENDPOINT, headers, body, &ExtractionPolicy::standard())?;
    let (field, raw) = fields
        .first_of(COORDINATE_FIELDS)
        .ok_or_else(|| AppError::MissingField(COORDINATE_FIELDS.join(" / ")))?;
    let (latitude, longitude) = parse_coordinates(field, raw)?;

    let delay = state.config.nominatim.request_delay_ms;
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let address = state.nominatim.reverse(latitude, longitude).await?;
    Ok(ResponseV2::new("Endereço encontrado.")
        .with_field("LOGRADOURO", address.street)
        .with_field("COMPLEMENTO", address.complement)
        .with_field("BAIRRO", address.neighborhood)
        .with_field("CIDADE", address.city)
        .with_field("ESTADO", address.state)
        .with_field("UF", address.state_code)
        .with_field("CEP", address.postal_code)
        .with_field("LATITUDE", latitude.to_string())
        .with_field("LONGITUDE", longitude.to_string())
        .into())
}

/// Parse `"lat,lon[,ignored…]"` and range-check both parts.
pub fn parse_coordinates(field: &str, raw: &str) -> Result<(f64, f64), AppError> {
    let mut parts = raw.split(',').map(str::trim);
    let (Some(lat), Some(lon)) = (parts.next(), parts.next()) else {
        return Err(AppError::invalid(field, "use o formato latitude,longitude"));
    };

    let parse = |text: &str, name: &str| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| AppError::invalid(field, format!("{} '{}' não é numérica", name, text)))
    };
    let latitude = parse(lat, "latitude")?;
    let longitude = parse(lon, "longitude")?;

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::invalid(field, "latitude fora do intervalo [-90, 90]"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::invalid(field, "longitude fora do intervalo [-180, 180]"));
    }
    Ok((latitude, longitude))
}
