//! XML serialization for terminal responses.
//!
//! The XML declaration is written as literal text ahead of the serializer
//! output so its casing and placement never depend on the writer.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use thiserror::Error;

use crate::xml::document::{
    DialogResponse, OutputField, OutputTable, ResponseDocument, ResponseV2, XSD_NS, XSI_NS,
};

/// Declaration prepended to every response, newline included.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-16\"?>\n";

/// Serialization failure.
#[derive(Debug, Error)]
pub enum XmlWriteError {
    #[error("XML write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    pub fn into_string(self) -> Result<String, XmlWriteError> {
        let buf = self.writer.into_inner().into_inner();
        Ok(String::from_utf8(buf)?)
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, XmlWriteError> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, XmlWriteError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer.write_event(Event::Start(elem))?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, XmlWriteError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// Write `<name>text</name>`, or `<name/>` when the text is empty.
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, XmlWriteError> {
        if text.is_empty() {
            self.writer.write_event(Event::Empty(BytesStart::new(name)))?;
            return Ok(self);
        }
        self.start_element(name)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end_element(name)
    }

    fn field(&mut self, id: &str, value: &str) -> Result<&mut Self, XmlWriteError> {
        self.start_element("Field")?;
        self.text_element("ID", id)?;
        self.text_element("Value", value)?;
        self.end_element("Field")
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a response document, declaration included.
pub fn render(document: &ResponseDocument) -> Result<String, XmlWriteError> {
    let mut w = XmlWriter::new();
    match document {
        ResponseDocument::V2(doc) => write_v2(&mut w, doc)?,
        ResponseDocument::Dialog(doc) => write_dialog(&mut w, doc)?,
    }
    let body = w.into_string()?;

    let mut out = String::with_capacity(XML_DECLARATION.len() + body.len());
    out.push_str(XML_DECLARATION);
    out.push_str(&body);
    Ok(out)
}

/// Encode text as UTF-16 little-endian, optionally preceded by a BOM.
pub fn encode_utf16(text: &str, byte_order_mark: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() * 2 + 2);
    if byte_order_mark {
        bytes.extend_from_slice(&[0xFF, 0xFE]);
    }
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn namespaces() -> [(&'static str, &'static str); 2] {
    [("xmlns:xsi", XSI_NS), ("xmlns:xsd", XSD_NS)]
}

fn write_v2(w: &mut XmlWriter, doc: &ResponseV2) -> Result<(), XmlWriteError> {
    w.start_element_with_attrs("ResponseV2", &namespaces())?;

    w.start_element("MessageV2")?;
    w.text_element("Text", &doc.message)?;
    w.end_element("MessageV2")?;

    w.start_element("ReturnValueV2")?;
    w.start_element("Fields")?;
    for OutputField { id, value } in &doc.fields {
        w.field(id, value)?;
    }
    for table in &doc.tables {
        write_table(w, table)?;
    }
    w.end_element("Fields")?;
    w.text_element("ShortText", &doc.short_text)?;
    w.text_element("LongText", &doc.long_text)?;
    w.text_element("Value", &doc.value)?;
    w.end_element("ReturnValueV2")?;

    w.end_element("ResponseV2")?;
    Ok(())
}

fn write_table(w: &mut XmlWriter, table: &OutputTable) -> Result<(), XmlWriteError> {
    w.start_element("TableField")?;
    w.text_element("ID", &table.id)?;
    w.start_element("Rows")?;
    for row in &table.rows {
        if row.current {
            w.start_element_with_attrs("Row", &[("IsCurrentRow", "true")])?;
        } else {
            w.start_element("Row")?;
        }
        w.start_element("Fields")?;
        for (id, value) in row.fields() {
            w.field(id, value)?;
        }
        w.end_element("Fields")?;
        w.end_element("Row")?;
    }
    w.end_element("Rows")?;
    w.end_element("TableField")?;
    Ok(())
}

fn write_dialog(w: &mut XmlWriter, doc: &DialogResponse) -> Result<(), XmlWriteError> {
    w.start_element_with_attrs("Response", &namespaces())?;

    w.start_element("Message")?;
    w.text_element("Text", &doc.text)?;
    w.text_element("Icon", doc.icon.as_str())?;
    w.text_element("ButtonText", &doc.button_text)?;
    w.end_element("Message")?;

    w.start_element("ReturnValue")?;
    w.text_element("ShortText", &doc.short_text)?;
    w.text_element("LongText", &doc.long_text)?;
    w.text_element("Value", &doc.value)?;
    w.text_element("Action", &doc.action)?;
    w.end_element("ReturnValue")?;

    w.end_element("Response")?;
    Ok(())
}

/// Build a Field/Value request document, as a terminal would send it.
pub fn request_payload<'a, I>(fields: I) -> Result<String, XmlWriteError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut w = XmlWriter::new();
    w.start_element("Request")?;
    w.start_element("Fields")?;
    for (id, value) in fields {
        w.field(id, value)?;
    }
    w.end_element("Fields")?;
    w.end_element("Request")?;
    w.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::document::{DialogResponse, Icon};
    use crate::xml::extract::{extract, ExtractionPolicy, Row};
    use crate::xml::parser::parse_document;

    #[test]
    fn test_render_starts_with_literal_declaration() {
        let doc = ResponseDocument::from(ResponseV2::new("ok"));
        let xml = render(&doc).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-16\"?>\n<ResponseV2"));
        assert!(xml.contains("xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\""));
        assert!(xml.contains("xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\""));
    }

    #[test]
    fn test_empty_texts_are_present() {
        let doc = ResponseDocument::from(ResponseV2::new("").with_short_text(""));
        let xml = render(&doc).unwrap();
        assert!(xml.contains("<Text/>"));
        assert!(xml.contains("<ShortText/>"));
        assert!(xml.contains("<LongText/>"));
        assert!(xml.contains("<Value>0</Value>"));
        assert!(xml.contains("<Fields>"));
    }

    #[test]
    fn test_v2_element_order() {
        let doc = ResponseDocument::from(
            ResponseV2::new("msg")
                .with_field("CEP", "01310000")
                .with_long_text("long"),
        );
        let xml = render(&doc).unwrap();
        let fields = xml.find("<Fields>").unwrap();
        let short = xml.find("<ShortText>").unwrap();
        let long = xml.find("<LongText>").unwrap();
        let value = xml.find("<Value>0</Value>").unwrap();
        assert!(xml.find("<MessageV2>").unwrap() < fields);
        assert!(fields < short && short < long && long < value);
    }

    #[test]
    fn test_dialog_layout() {
        let doc = ResponseDocument::Dialog(DialogResponse {
            text: "Item validado".into(),
            icon: Icon::Information,
            button_text: "OK".into(),
            short_text: "OK".into(),
            long_text: String::new(),
            value: "Sucesso".into(),
            action: "CloseForm".into(),
        });
        let xml = render(&doc).unwrap();
        assert!(xml.contains("<Response xmlns:xsi="));
        assert!(xml.contains("<Icon>Information</Icon>"));
        assert!(xml.contains("<Action>CloseForm</Action>"));
        assert!(xml.contains("<LongText/>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let doc = ResponseDocument::from(ResponseV2::new("a < b & c"));
        let xml = render(&doc).unwrap();
        assert!(xml.contains("<Text>a &lt; b &amp; c</Text>"));
    }

    #[test]
    fn test_table_round_trips_through_extractor() {
        let mut current = Row::new();
        current.insert("SEQ", "2");
        current.insert("PESO1", "12,345");
        current.current = true;
        let mut other = Row::new();
        other.insert("SEQ", "1");

        let doc = ResponseDocument::from(
            ResponseV2::new("").with_table("PESAGENS", vec![other, current]),
        );
        let xml = render(&doc).unwrap();
        let parsed = parse_document(&xml).unwrap();
        let set = extract(&parsed, &ExtractionPolicy::standard());
        let rows = set.table("PESAGENS").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].current);
        assert_eq!(rows[1].get("PESO1"), Some("12,345"));
    }

    #[test]
    fn test_encode_utf16_little_endian() {
        assert_eq!(encode_utf16("<a", false), vec![b'<', 0, b'a', 0]);
        assert_eq!(encode_utf16("a", true), vec![0xFF, 0xFE, b'a', 0]);
    }

    #[test]
    fn test_request_payload_is_extractable() {
        let xml = request_payload([("CEP", "01310-000"), ("TSTWS", "0")]).unwrap();
        let set = extract(&parse_document(&xml).unwrap(), &ExtractionPolicy::standard());
        assert_eq!(set.get("CEP"), Some("01310-000"));
        assert_eq!(set.get("TSTWS"), Some("0"));
    }
}
