//! Weight simulation endpoints.
//!
//! # Responsibilities
//! - Turn the `TSTPESO*` flag into one stable or two diverging weights
//! - Address scale 1 or 2 through the `balanca` query parameter
//! - Record the last reading per scale for `/simular-peso/ultimo/{balanca}`
//!
//! # Design Decisions
//! - Flag handling is chosen per endpoint: `Strict` rejects anything but
//!   `0`/`1`, `DefaultToZero` treats it as `0` and logs a warning
//! - Weights are whole grams in [500, 500000], printed with a comma and
//!   three decimals (`"12,345"`)

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use rand::Rng;
use serde::Deserialize;
use std::time::{Instant, UNIX_EPOCH};

use crate::error::AppError;
use crate::handlers::{read_fields, respond, Endpoint};
use crate::http::request::InputPolicy;
use crate::http::response::Charset;
use crate::http::server::AppState;
use crate::state::Reading;
use crate::xml::{ExtractionPolicy, FieldSet, ResponseDocument, ResponseV2, Row, Schema};

const SIMULATE: Endpoint = Endpoint {
    name: "simular_peso",
    schema: Schema::V2,
    charset: Charset::Utf16,
    input: InputPolicy::REQUIRED,
};

const SIMULATE_SCALE: Endpoint = Endpoint {
    name: "simular_peso_balanca",
    schema: Schema::V2,
    charset: Charset::Utf16,
    input: InputPolicy::REQUIRED,
};

const SIMULATE_TABLE: Endpoint = Endpoint {
    name: "simular_peso_tabela",
    schema: Schema::V2,
    charset: Charset::Utf16,
    input: InputPolicy::REQUIRED,
};

const SIMULATE_LEGACY: Endpoint = Endpoint {
    name: "simular_peso_legado",
    schema: Schema::V2,
    charset: Charset::LegacyUtf8,
    input: InputPolicy::LENIENT,
};

const LAST_READING: Endpoint = Endpoint {
    name: "simular_peso_ultimo",
    schema: Schema::V2,
    charset: Charset::Utf16,
    input: InputPolicy::LENIENT,
};

const WEIGHINGS_TABLE: &str = "PESAGENS";

const MIN_GRAMS: u32 = 500;
const MAX_GRAMS: u32 = 500_000;

/// How a flag value outside `0`/`1` is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagPolicy {
    Strict,
    DefaultToZero,
}

/// Requested simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Simulation {
    /// Flag `0`: terminal and scale agree.
    Stable,
    /// Flag `1`: terminal and scale disagree.
    Unstable,
}

/// Interpret a flag field under `policy`.
pub fn parse_flag(
    field: &str,
    value: Option<&str>,
    policy: FlagPolicy,
) -> Result<Simulation, AppError> {
    match (value.map(str::trim), policy) {
        (Some("0"), _) => Ok(Simulation::Stable),
        (Some("1"), _) => Ok(Simulation::Unstable),
        (None, FlagPolicy::Strict) => Err(AppError::MissingField(field.to_string())),
        (Some(other), FlagPolicy::Strict) => Err(AppError::invalid(
            field,
            format!("'{}' não é 0 nem 1", other),
        )),
        (other, FlagPolicy::DefaultToZero) => {
            tracing::warn!(field, value = ?other, "Invalid weight flag, assuming 0");
            Ok(Simulation::Stable)
        }
    }
}

/// One of the two simulated scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    One,
    Two,
}

impl Scale {
    /// Parse a `balanca` value; absent means scale 1.
    pub fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value.map(str::trim) {
            None | Some("") | Some("balanca1") => Ok(Scale::One),
            Some("balanca2") => Ok(Scale::Two),
            Some(other) => Err(AppError::invalid(
                "balanca",
                format!("'{}' não é balanca1 nem balanca2", other),
            )),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Scale::One => "balanca1",
            Scale::Two => "balanca2",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Scale::One => "1",
            Scale::Two => "2",
        }
    }

    fn ids(&self) -> WeightIds {
        WeightIds::with_suffix(self.suffix())
    }
}

/// Field ids used by one endpoint variant.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WeightIds {
    flag: String,
    weight: String,
    scale_weight: String,
}

impl WeightIds {
    fn with_suffix(suffix: &str) -> Self {
        Self {
            flag: format!("TSTPESO{}", suffix),
            weight: format!("PESO{}", suffix),
            scale_weight: format!("PESOBALANCA{}", suffix),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScaleQuery {
    balanca: Option<String>,
}

/// Format whole grams as kilograms with a comma separator.
pub fn format_weight(grams: u32) -> String {
    format!("{},{:03}", grams / 1000, grams % 1000)
}

/// Draw the (terminal, scale) weight pair for `simulation`.
pub fn generate_weights<R: Rng>(simulation: Simulation, rng: &mut R) -> (String, String) {
    let weight = rng.gen_range(MIN_GRAMS..=MAX_GRAMS);
    let scale_weight = match simulation {
        Simulation::Stable => weight,
        Simulation::Unstable => loop {
            let candidate = rng.gen_range(MIN_GRAMS..=MAX_GRAMS);
            if candidate != weight {
                break candidate;
            }
        },
    };
    (format_weight(weight), format_weight(scale_weight))
}

fn weights_response(ids: &WeightIds, weight: &str, scale_weight: &str) -> ResponseV2 {
    ResponseV2::new("Peso simulado.")
        .with_field(ids.weight.as_str(), weight)
        .with_field(ids.scale_weight.as_str(), scale_weight)
}

fn simulate_flag(
    fields: &FieldSet,
    ids: &WeightIds,
    policy: FlagPolicy,
) -> Result<ResponseV2, AppError> {
    let simulation = parse_flag(&ids.flag, fields.get(&ids.flag), policy)?;
    let (weight, scale_weight) = generate_weights(simulation, &mut rand::thread_rng());
    tracing::debug!(flag = %ids.flag, ?simulation, %weight, %scale_weight, "Weights simulated");
    Ok(weights_response(ids, &weight, &scale_weight))
}

pub async fn simular_peso(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = read_fields(&state, &SIMULATE, &headers, &body, &ExtractionPolicy::standard())
        .and_then(|fields| simulate_flag(&fields, &WeightIds::with_suffix(""), FlagPolicy::Strict))
        .map(ResponseDocument::from);
    respond(&state, &SIMULATE, &headers, start, result)
}

pub async fn simular_peso_legado(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = read_fields(
        &state,
        &SIMULATE_LEGACY,
        &headers,
        &body,
        &ExtractionPolicy::exhaustive(),
    )
    .and_then(|fields| {
        simulate_flag(&fields, &WeightIds::with_suffix(""), FlagPolicy::DefaultToZero)
    })
    .map(ResponseDocument::from);
    respond(&state, &SIMULATE_LEGACY, &headers, start, result)
}

pub async fn simular_peso_balanca(
    State(state): State<AppState>,
    Query(query): Query<ScaleQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = simulate_scale(&state, query.balanca.as_deref(), &headers, &body);
    respond(&state, &SIMULATE_SCALE, &headers, start, result)
}

fn simulate_scale(
    state: &AppState,
    balanca: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ResponseDocument, AppError> {
    let scale = Scale::parse(balanca)?;
    let ids = scale.ids();
    let policy = ExtractionPolicy::standard().with_visibility();
    let fields = read_fields(state, &SIMULATE_SCALE, headers, body, &policy)?;

    let visibility = format!("{}_IsVisible", ids.flag);
    if fields
        .get(&visibility)
        .is_some_and(|v| v.eq_ignore_ascii_case("false"))
    {
        return Err(AppError::invalid(
            ids.flag.as_str(),
            format!("{} desabilitada", scale.key()),
        ));
    }

    Ok(simulate_flag(&fields, &ids, FlagPolicy::DefaultToZero)?.into())
}

pub async fn simular_peso_tabela(
    State(state): State<AppState>,
    Query(query): Query<ScaleQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = simulate_table(&state, query.balanca.as_deref(), &headers, &body);
    respond(&state, &SIMULATE_TABLE, &headers, start, result)
}

fn simulate_table(
    state: &AppState,
    balanca: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ResponseDocument, AppError> {
    let scale = Scale::parse(balanca)?;
    let ids = scale.ids();
    let fields = read_fields(
        state,
        &SIMULATE_TABLE,
        headers,
        body,
        &ExtractionPolicy::guarded(2),
    )?;

    let rows = fields
        .table(WEIGHINGS_TABLE)
        .ok_or_else(|| AppError::MissingField(WEIGHINGS_TABLE.to_string()))?;
    let (response, reading) = weigh_current_row(rows, &ids)?;

    state.readings.record(scale.key(), reading);
    Ok(response.into())
}

/// Simulate the current row of `rows`, returning the reply and the reading.
fn weigh_current_row(rows: &[Row], ids: &WeightIds) -> Result<(ResponseV2, Reading), AppError> {
    let current = rows
        .iter()
        .position(|row| row.current)
        .ok_or_else(|| AppError::invalid(WEIGHINGS_TABLE, "nenhuma linha atual"))?;

    let simulation = parse_flag(&ids.flag, rows[current].get(&ids.flag), FlagPolicy::Strict)?;
    let (weight, scale_weight) = generate_weights(simulation, &mut rand::thread_rng());

    let mut updated = rows.to_vec();
    updated[current].insert(ids.weight.as_str(), weight.as_str());
    updated[current].insert(ids.scale_weight.as_str(), scale_weight.as_str());

    let response = weights_response(ids, &weight, &scale_weight).with_table(WEIGHINGS_TABLE, updated);
    Ok((response, Reading::new(weight, scale_weight)))
}

pub async fn ultimo_peso(
    State(state): State<AppState>,
    Path(balanca): Path<String>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let result = last_reading(&state, &balanca);
    respond(&state, &LAST_READING, &headers, start, result)
}

fn last_reading(state: &AppState, balanca: &str) -> Result<ResponseDocument, AppError> {
    let scale = Scale::parse(Some(balanca))?;
    let ids = scale.ids();
    let reading = state.readings.get(scale.key()).ok_or_else(|| {
        AppError::invalid("balanca", format!("nenhuma leitura registrada para {}", scale.key()))
    })?;

    let recorded_at = reading
        .recorded_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    Ok(weights_response(&ids, &reading.weight, &reading.scale_weight)
        .with_field("REGISTRADO_EM", recorded_at.to_string())
        .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grams(formatted: &str) -> u32 {
        let (kg, g) = formatted.split_once(',').unwrap();
        assert_eq!(g.len(), 3);
        kg.parse::<u32>().unwrap() * 1000 + g.parse::<u32>().unwrap()
    }

    #[test]
    fn test_format_weight() {
        assert_eq!(format_weight(500), "0,500");
        assert_eq!(format_weight(12_045), "12,045");
        assert_eq!(format_weight(500_000), "500,000");
    }

    #[test]
    fn test_stable_weights_are_equal_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let (weight, scale_weight) = generate_weights(Simulation::Stable, &mut rng);
            assert_eq!(weight, scale_weight);
            assert!((MIN_GRAMS..=MAX_GRAMS).contains(&grams(&weight)));
        }
    }

    #[test]
    fn test_unstable_weights_differ() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let (weight, scale_weight) = generate_weights(Simulation::Unstable, &mut rng);
            assert_ne!(weight, scale_weight);
            assert!((MIN_GRAMS..=MAX_GRAMS).contains(&grams(&scale_weight)));
        }
    }

    #[test]
    fn test_strict_flag() {
        assert_eq!(
            parse_flag("TSTPESO", Some(" 1 "), FlagPolicy::Strict).unwrap(),
            Simulation::Unstable
        );
        assert!(matches!(
            parse_flag("TSTPESO", Some("2"), FlagPolicy::Strict),
            Err(AppError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_flag("TSTPESO", None, FlagPolicy::Strict),
            Err(AppError::MissingField(_))
        ));
    }

    #[test]
    fn test_lenient_flag_defaults_to_zero() {
        for value in [None, Some(""), Some("x"), Some("0")] {
            assert_eq!(
                parse_flag("TSTPESO1", value, FlagPolicy::DefaultToZero).unwrap(),
                Simulation::Stable
            );
        }
        assert_eq!(
            parse_flag("TSTPESO1", Some("1"), FlagPolicy::DefaultToZero).unwrap(),
            Simulation::Unstable
        );
    }

    #[test]
    fn test_scale_parsing() {
        assert_eq!(Scale::parse(None).unwrap(), Scale::One);
        assert_eq!(Scale::parse(Some("balanca2")).unwrap(), Scale::Two);
        assert!(Scale::parse(Some("balanca3")).is_err());
        assert_eq!(Scale::Two.ids(), WeightIds::with_suffix("2"));
        assert_eq!(Scale::Two.ids().scale_weight, "PESOBALANCA2");
    }

    #[test]
    fn test_weigh_current_row_updates_only_that_row() {
        let mut first = Row::new();
        first.insert("SEQ", "1");
        let mut second = Row::new();
        second.insert("SEQ", "2");
        second.insert("TSTPESO1", "0");
        second.current = true;

        let ids = Scale::One.ids();
        let (response, reading) = weigh_current_row(&[first, second], &ids).unwrap();
        let table = &response.tables[0];
        assert_eq!(table.id, "PESAGENS");
        assert!(table.rows[0].get("PESO1").is_none());
        assert_eq!(table.rows[1].get("PESO1"), Some(reading.weight.as_str()));
        assert_eq!(response.field("PESO1"), response.field("PESOBALANCA1"));
        assert_eq!(reading.weight, reading.scale_weight);
    }

    #[test]
    fn test_weigh_requires_current_row_and_flag() {
        let ids = Scale::One.ids();
        let mut row = Row::new();
        row.insert("TSTPESO1", "0");
        assert!(matches!(
            weigh_current_row(&[row.clone()], &ids),
            Err(AppError::InvalidValue { .. })
        ));

        let mut current = Row::new();
        current.current = true;
        assert!(matches!(
            weigh_current_row(&[current], &ids),
            Err(AppError::MissingField(_))
        ));
    }
}
