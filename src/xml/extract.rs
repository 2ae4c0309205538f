//! Field extraction from terminal payloads.
//!
//! # Data Flow
//! ```text
//! Document (parser.rs)
//!     → ExtractionPolicy picks tag conventions and fallback mode
//!     → every Field in document order   → scalar entries (last wins)
//!     → every TableField / Row          → ordered row maps
//!     → FieldSet
//! ```
//!
//! # Design Decisions
//! - Tag casing variants are explicit `TagConvention`s tried in order, never
//!   ad-hoc conditionals inside the walk
//! - Endpoints disagree on when alternate casings are considered, so the
//!   caller selects a `FallbackMode`
//! - `Field` elements are collected anywhere in the tree, including inside
//!   table rows

use std::collections::HashMap;

use crate::xml::parser::{Document, Element};

/// Child element carrying the visibility side channel.
const VISIBILITY_TAG: &str = "IsVisible";

/// Marker identifying the active row of a table.
const CURRENT_ROW_MARKER: &str = "IsCurrentRow";

/// One naming convention for the Field/Value protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagConvention {
    pub field: &'static str,
    pub table: &'static str,
    pub row: &'static str,
    /// Identifier children, tried in order.
    pub id_tags: &'static [&'static str],
    /// Value children, tried in order.
    pub value_tags: &'static [&'static str],
}

impl TagConvention {
    /// `Field` / `TableField` / `Row` with `ID` then `Id`.
    pub const STANDARD: TagConvention = TagConvention {
        field: "Field",
        table: "TableField",
        row: "Row",
        id_tags: &["ID", "Id"],
        value_tags: &["Value", "value"],
    };

    /// Standard element names, also accepting a lowercase `id` child.
    pub const STANDARD_WITH_LOWER_ID: TagConvention = TagConvention {
        field: "Field",
        table: "TableField",
        row: "Row",
        id_tags: &["ID", "Id", "id"],
        value_tags: &["Value", "value"],
    };

    /// Lowercase element names as emitted by older terminal scripts.
    pub const LOWERCASE: TagConvention = TagConvention {
        field: "field",
        table: "tableField",
        row: "row",
        id_tags: &["ID", "Id", "id"],
        value_tags: &["Value", "value"],
    };

    fn resolve_id<'a>(&self, element: &'a Element) -> Option<&'a str> {
        self.id_tags
            .iter()
            .find_map(|tag| element.child_text(tag))
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    fn resolve_value<'a>(&self, element: &'a Element) -> Option<&'a str> {
        self.value_tags.iter().find_map(|tag| element.child_text(tag))
    }
}

/// When conventions after the first one are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    /// Only the first convention is used.
    Never,
    /// All conventions are tried for every element, in one document-order pass.
    EveryConvention,
    /// The first convention runs alone; the others only fill in missing ids
    /// when it produced fewer than this many fields.
    WhenFewerThan(usize),
}

/// Caller-selected extraction rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPolicy {
    pub conventions: Vec<TagConvention>,
    pub fallback: FallbackMode,
    /// Record `"{id}_IsVisible"` for fields that carry an `IsVisible` child.
    pub track_visibility: bool,
}

impl ExtractionPolicy {
    pub fn standard() -> Self {
        Self {
            conventions: vec![TagConvention::STANDARD],
            fallback: FallbackMode::Never,
            track_visibility: false,
        }
    }

    pub fn exhaustive() -> Self {
        Self {
            conventions: vec![TagConvention::STANDARD_WITH_LOWER_ID, TagConvention::LOWERCASE],
            fallback: FallbackMode::EveryConvention,
            track_visibility: false,
        }
    }

    pub fn guarded(minimum: usize) -> Self {
        Self {
            conventions: vec![TagConvention::STANDARD, TagConvention::LOWERCASE],
            fallback: FallbackMode::WhenFewerThan(minimum),
            track_visibility: false,
        }
    }

    pub fn with_visibility(mut self) -> Self {
        self.track_visibility = true;
        self
    }
}

/// One row of a `TableField`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
    pub attributes: Vec<(String, String)>,
    pub current: bool,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field, keeping the position of the first occurrence.
    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) {
        let id = id.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == id) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((id, value)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A value in a `FieldSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    Table(Vec<Row>),
}

/// Extracted fields, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: HashMap<String, FieldValue>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_scalar(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(id.into(), FieldValue::Scalar(value.into()));
    }

    pub fn insert_table(&mut self, id: impl Into<String>, rows: Vec<Row>) {
        self.entries.insert(id.into(), FieldValue::Table(rows));
    }

    /// Scalar value for `id`.
    pub fn get(&self, id: &str) -> Option<&str> {
        match self.entries.get(id) {
            Some(FieldValue::Scalar(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// First scalar present among `ids`, with the id that matched.
    pub fn first_of<'a>(&'a self, ids: &[&'a str]) -> Option<(&'a str, &'a str)> {
        ids.iter().find_map(|id| self.get(id).map(|v| (*id, v)))
    }

    /// Rows of the table `id`.
    pub fn table(&self, id: &str) -> Option<&[Row]> {
        match self.entries.get(id) {
            Some(FieldValue::Table(rows)) => Some(rows.as_slice()),
            _ => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extract every field and table from `document` under `policy`.
pub fn extract(document: &Document, policy: &ExtractionPolicy) -> FieldSet {
    let Some((primary, rest)) = policy.conventions.split_first() else {
        return FieldSet::new();
    };

    match policy.fallback {
        FallbackMode::Never => extract_with(document, std::slice::from_ref(primary), policy),
        FallbackMode::EveryConvention => extract_with(document, &policy.conventions, policy),
        FallbackMode::WhenFewerThan(minimum) => {
            let mut fields = extract_with(document, std::slice::from_ref(primary), policy);
            if fields.len() < minimum && !rest.is_empty() {
                tracing::debug!(
                    extracted = fields.len(),
                    minimum,
                    "Falling back to alternate tag conventions"
                );
                let alternate = extract_with(document, rest, policy);
                for (id, value) in alternate.entries {
                    fields.entries.entry(id).or_insert(value);
                }
            }
            fields
        }
    }
}

fn extract_with(
    document: &Document,
    conventions: &[TagConvention],
    policy: &ExtractionPolicy,
) -> FieldSet {
    let mut set = FieldSet::new();
    let mut tables: Vec<(String, Vec<Row>)> = Vec::new();

    for element in document.elements() {
        if let Some(convention) = conventions.iter().find(|c| c.field == element.name) {
            let Some(id) = convention.resolve_id(element) else {
                continue;
            };
            if let Some(value) = convention.resolve_value(element) {
                set.insert_scalar(id, value);
            }
            if policy.track_visibility {
                if let Some(visible) = element.child_text(VISIBILITY_TAG) {
                    set.insert_scalar(format!("{id}_{VISIBILITY_TAG}"), visible.trim());
                }
            }
        } else if let Some(convention) = conventions.iter().find(|c| c.table == element.name) {
            if let Some(id) = convention.resolve_id(element) {
                tables.push((id.to_string(), extract_rows(element, convention)));
            }
        }
    }

    for (id, rows) in tables {
        set.insert_table(id, rows);
    }
    set
}

fn extract_rows(table: &Element, convention: &TagConvention) -> Vec<Row> {
    table
        .descendants()
        .filter(|e| e.name == convention.row)
        .map(|row_element| {
            let mut row = Row::new();
            row.attributes = row_element.attributes.clone();
            row.current = is_current_row(row_element);
            for field in row_element.descendants().filter(|e| e.name == convention.field) {
                if let (Some(id), Some(value)) =
                    (convention.resolve_id(field), convention.resolve_value(field))
                {
                    row.insert(id, value);
                }
            }
            row
        })
        .collect()
}

fn is_current_row(row: &Element) -> bool {
    let marker = row
        .attributes
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(CURRENT_ROW_MARKER))
        .map(|(_, v)| v.as_str())
        .or_else(|| {
            row.children
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(CURRENT_ROW_MARKER))
                .map(|c| c.text.as_str())
        });
    matches!(marker.map(str::trim), Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parser::parse_document;

    fn fields(xml: &str, policy: &ExtractionPolicy) -> FieldSet {
        extract(&parse_document(xml).unwrap(), policy)
    }

    #[test]
    fn test_extracts_scalar_field() {
        let set = fields(
            "<Request><Fields><Field><ID>CEP</ID><Value>01310000</Value></Field></Fields></Request>",
            &ExtractionPolicy::standard(),
        );
        assert_eq!(set.get("CEP"), Some("01310000"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_last_duplicate_wins() {
        let set = fields(
            "<R><Field><ID>X</ID><Value>first</Value></Field><Field><ID>X</ID><Value>second</Value></Field></R>",
            &ExtractionPolicy::standard(),
        );
        assert_eq!(set.get("X"), Some("second"));
    }

    #[test]
    fn test_id_fallback_order() {
        let set = fields(
            "<R><Field><Id>A</Id><Value>1</Value></Field><Field><ID>B</ID><Id>ignored</Id><Value>2</Value></Field></R>",
            &ExtractionPolicy::standard(),
        );
        assert_eq!(set.get("A"), Some("1"));
        assert_eq!(set.get("B"), Some("2"));
        assert!(!set.contains("ignored"));
    }

    #[test]
    fn test_lowercase_id_only_with_extended_convention() {
        let xml = "<R><Field><id>A</id><Value>1</Value></Field></R>";
        assert!(fields(xml, &ExtractionPolicy::standard()).is_empty());
        assert_eq!(fields(xml, &ExtractionPolicy::exhaustive()).get("A"), Some("1"));
    }

    #[test]
    fn test_field_without_id_or_value_is_ignored() {
        let set = fields(
            "<R><Field><Value>1</Value></Field><Field><ID>B</ID></Field><Field><ID>C</ID><Value/></Field></R>",
            &ExtractionPolicy::standard(),
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("C"), Some(""));
    }

    #[test]
    fn test_exhaustive_mixes_casings_in_document_order() {
        let set = fields(
            "<R><field><id>X</id><value>lower</value></field><Field><ID>X</ID><Value>upper</Value></Field></R>",
            &ExtractionPolicy::exhaustive(),
        );
        assert_eq!(set.get("X"), Some("upper"));
    }

    #[test]
    fn test_guarded_skips_fallback_when_enough_fields() {
        let xml = "<R><Field><ID>A</ID><Value>1</Value></Field><Field><ID>B</ID><Value>2</Value></Field><field><id>C</id><value>3</value></field></R>";
        let set = fields(xml, &ExtractionPolicy::guarded(2));
        assert_eq!(set.len(), 2);
        assert!(!set.contains("C"));

        let xml = "<R><Field><ID>A</ID><Value>1</Value></Field><field><id>C</id><value>3</value></field><field><id>A</id><value>9</value></field></R>";
        let set = fields(xml, &ExtractionPolicy::guarded(2));
        assert_eq!(set.get("C"), Some("3"));
        assert_eq!(set.get("A"), Some("1"));
    }

    #[test]
    fn test_extracts_table_rows_in_order() {
        let xml = r#"<R>
            <TableField><ID>PESAGENS</ID><Rows>
                <Row><Fields><Field><ID>SEQ</ID><Value>1</Value></Field></Fields></Row>
                <Row IsCurrentRow="true"><Fields><Field><ID>SEQ</ID><Value>2</Value></Field><Field><ID>TSTPESO1</ID><Value>1</Value></Field></Fields></Row>
            </Rows></TableField>
        </R>"#;
        let set = fields(xml, &ExtractionPolicy::standard());
        let rows = set.table("PESAGENS").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("SEQ"), Some("1"));
        assert!(!rows[0].current);
        assert!(rows[1].current);
        assert_eq!(rows[1].get("TSTPESO1"), Some("1"));
        // Row fields are also visible at the top level, last one wins.
        assert_eq!(set.get("SEQ"), Some("2"));
    }

    #[test]
    fn test_current_row_marker_as_child_element() {
        let xml = "<R><TableField><ID>T</ID><Rows><Row><IsCurrentRow>1</IsCurrentRow></Row></Rows></TableField></R>";
        let set = fields(xml, &ExtractionPolicy::standard());
        assert!(set.table("T").unwrap()[0].current);
    }

    #[test]
    fn test_tracks_visibility_when_requested() {
        let xml = "<R><Field><ID>TSTPESO1</ID><Value>1</Value><IsVisible>false</IsVisible></Field></R>";
        let set = fields(xml, &ExtractionPolicy::standard().with_visibility());
        assert_eq!(set.get("TSTPESO1_IsVisible"), Some("false"));

        let set = fields(xml, &ExtractionPolicy::standard());
        assert!(!set.contains("TSTPESO1_IsVisible"));
    }

    #[test]
    fn test_first_of_respects_order() {
        let mut set = FieldSet::new();
        set.insert_scalar("COORDENADAS", "1,2");
        set.insert_scalar("LOCALIZACAO", "3,4");
        assert_eq!(
            set.first_of(&["LATLONG", "COORDENADAS", "LOCALIZACAO"]),
            Some(("COORDENADAS", "1,2"))
        );
    }

    #[test]
    fn test_row_insert_overwrites_in_place() {
        let mut row = Row::new();
        row.insert("A", "1");
        row.insert("B", "2");
        row.insert("A", "3");
        let collected: Vec<_> = row.fields().collect();
        assert_eq!(collected, vec![("A", "3"), ("B", "2")]);
    }
}
