//! Terminal XML protocol.
//!
//! # Data Flow
//! ```text
//! payload string
//!     → parser.rs (tolerant tree building)
//!     → extract.rs (FieldSet under an ExtractionPolicy)
//!     → [endpoint business logic]
//!     → document.rs (ResponseV2 / Response)
//!     → writer.rs (literal declaration + UTF-16LE bytes)
//! ```

pub mod document;
pub mod extract;
pub mod parser;
pub mod writer;

pub use document::{DialogResponse, Icon, ResponseDocument, ResponseV2, Schema};
pub use extract::{extract, ExtractionPolicy, FallbackMode, FieldSet, FieldValue, Row, TagConvention};
pub use parser::{parse_document, Document, Element, ParseError};
pub use writer::XmlWriteError;
