//! Typed response documents understood by the terminal.
//!
//! Two fixed schemas exist:
//! - `ResponseV2` carries fields back to the terminal form
//! - `Response` is a dialog (message box + action code)

use crate::xml::extract::Row;
use crate::xml::writer::{self, XmlWriteError};

pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// `Value` of a successful `ResponseV2`.
pub const RESULT_OK: &str = "0";
/// `Value` of a failed `ResponseV2`.
pub const RESULT_ERROR: &str = "1";
/// `Value` of a `ResponseV2` that asks the terminal to pick one of several rows.
pub const RESULT_SELECTION: &str = "2";

/// Short text used on every error document.
pub const SHORT_TEXT_ERROR: &str = "Erro";

/// Which schema a document (or an endpoint) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    V2,
    Dialog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputField {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTable {
    pub id: String,
    pub rows: Vec<Row>,
}

/// Field-carrying reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseV2 {
    pub message: String,
    pub fields: Vec<OutputField>,
    pub tables: Vec<OutputTable>,
    pub short_text: String,
    pub long_text: String,
    pub value: String,
}

impl ResponseV2 {
    /// A successful reply with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: Vec::new(),
            tables: Vec::new(),
            short_text: "OK".to_string(),
            long_text: String::new(),
            value: RESULT_OK.to_string(),
        }
    }

    /// An error reply.
    pub fn error(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            short_text: SHORT_TEXT_ERROR.to_string(),
            long_text: detail.into(),
            value: RESULT_ERROR.to_string(),
            ..Self::new(message)
        }
    }

    pub fn with_field(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(OutputField {
            id: id.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_table(mut self, id: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.push(OutputTable { id: id.into(), rows });
        self
    }

    pub fn with_short_text(mut self, text: impl Into<String>) -> Self {
        self.short_text = text.into();
        self
    }

    pub fn with_long_text(mut self, text: impl Into<String>) -> Self {
        self.long_text = text.into();
        self
    }

    /// Result code; always rendered as text.
    pub fn with_value(mut self, value: impl ToString) -> Self {
        self.value = value.to_string();
        self
    }

    /// Value of an output field, if present.
    pub fn field(&self, id: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.value.as_str())
    }
}

/// Icon shown in a dialog reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Information,
    Warning,
    Error,
}

impl Icon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Icon::Information => "Information",
            Icon::Warning => "Warning",
            Icon::Error => "Error",
        }
    }
}

/// Dialog-style reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogResponse {
    pub text: String,
    pub icon: Icon,
    pub button_text: String,
    pub short_text: String,
    pub long_text: String,
    pub value: String,
    pub action: String,
}

impl DialogResponse {
    pub fn error(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            icon: Icon::Error,
            button_text: "OK".to_string(),
            short_text: SHORT_TEXT_ERROR.to_string(),
            long_text: detail.into(),
            value: SHORT_TEXT_ERROR.to_string(),
            action: String::new(),
        }
    }
}

/// Any reply sent to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseDocument {
    V2(ResponseV2),
    Dialog(DialogResponse),
}

impl ResponseDocument {
    /// Serialized XML, declaration included.
    pub fn to_xml(&self) -> Result<String, XmlWriteError> {
        writer::render(self)
    }

    /// Serialized XML encoded as UTF-16LE.
    pub fn to_utf16(&self, byte_order_mark: bool) -> Result<Vec<u8>, XmlWriteError> {
        Ok(writer::encode_utf16(&self.to_xml()?, byte_order_mark))
    }
}

impl From<ResponseV2> for ResponseDocument {
    fn from(doc: ResponseV2) -> Self {
        ResponseDocument::V2(doc)
    }
}

impl From<DialogResponse> for ResponseDocument {
    fn from(doc: DialogResponse) -> Self {
        ResponseDocument::Dialog(doc)
    }
}
