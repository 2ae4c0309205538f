//! Response encoding.
//!
//! # Responsibilities
//! - Encode a `ResponseDocument` as UTF-16LE bytes
//! - Attach the content type the endpoint advertises
//! - Fall back to a fixed document if serialization itself fails
//!
//! # Design Decisions
//! - The body is always UTF-16; legacy endpoints advertise `charset=utf-8`
//!   because deployed terminals were built against that header

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::xml::ResponseDocument;

/// Last-resort body when a document cannot be serialized.
const FALLBACK_XML: &str = "<?xml version=\"1.0\" encoding=\"utf-16\"?>\n\
<ResponseV2 xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\"><MessageV2><Text>Erro interno ao processar a requisição.</Text></MessageV2>\
<ReturnValueV2><Fields/><ShortText>Erro</ShortText><LongText/><Value>1</Value></ReturnValueV2></ResponseV2>";

/// Content type advertised for an encoded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf16,
    /// Legacy label; the body is still UTF-16.
    LegacyUtf8,
}

impl Charset {
    pub fn content_type(&self) -> &'static str {
        match self {
            Charset::Utf16 => "application/xml; charset=utf-16",
            Charset::LegacyUtf8 => "application/xml; charset=utf-8",
        }
    }
}

/// Build the HTTP response for `document`.
pub fn xml_response(
    status: StatusCode,
    document: &ResponseDocument,
    charset: Charset,
    byte_order_mark: bool,
) -> Response {
    let (status, bytes) = match document.to_utf16(byte_order_mark) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response document");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                crate::xml::writer::encode_utf16(FALLBACK_XML, byte_order_mark),
            )
        }
    };

    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(charset.content_type()))],
        Body::from(bytes),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::ResponseV2;

    #[test]
    fn test_content_type_and_status() {
        let doc = ResponseDocument::from(ResponseV2::new("ok"));
        let response = xml_response(StatusCode::OK, &doc, Charset::Utf16, false);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml; charset=utf-16"
        );

        let response = xml_response(StatusCode::BAD_REQUEST, &doc, Charset::LegacyUtf8, false);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml; charset=utf-8"
        );
    }

    #[test]
    fn test_fallback_document_matches_schema() {
        use crate::xml::document::{XSD_NS, XSI_NS};

        let doc = crate::xml::parse_document(FALLBACK_XML).unwrap();
        assert_eq!(doc.root().unwrap().name, "ResponseV2");
        let root_tag = format!(
            "<ResponseV2 xmlns:xsi=\"{}\" xmlns:xsd=\"{}\">",
            XSI_NS, XSD_NS
        );
        assert!(FALLBACK_XML.contains(&root_tag));
    }
}
