//! Response body decoding
//!
//! Decoding never fails a call: bodies that are not valid JSON (REST) or not
//! a SOAP envelope (SOAP) come back as the raw text.

use polycall_domain::{PolycallError, ResponseBody, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::{Map, Value};
use tracing::debug;

/// Turn a protocol client's body into the generic result value.
pub fn decode_body(body: ResponseBody) -> Value {
    match body {
        ResponseBody::Empty => Value::Null,
        ResponseBody::Grpc(message) => Value::Object(message),
        ResponseBody::Rest(bytes) if bytes.is_empty() => Value::Null,
        ResponseBody::Soap(bytes) if bytes.is_empty() => Value::Null,
        ResponseBody::Rest(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            debug!(error = %err, "response body is not JSON, returning raw text");
            raw_text(&bytes)
        }),
        ResponseBody::Soap(bytes) => match decode_soap_envelope(&bytes) {
            Ok(fields) => Value::Object(fields),
            Err(err) => {
                debug!(error = %err, "response body is not a SOAP envelope, returning raw text");
                raw_text(&bytes)
            }
        },
    }
}

fn raw_text(bytes: &[u8]) -> Value {
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

/// Flatten the contents of `Envelope/Body` into `{element: text}`.
///
/// Only leaf elements with non-blank text are kept; nesting is dropped and a
/// repeated element name keeps the last value. An empty body yields an empty
/// map.
///
/// # Errors
/// Returns `PolycallError::Decode` for malformed XML or when the document
/// root is not an `Envelope` element.
pub fn decode_soap_envelope(xml: &[u8]) -> Result<Map<String, Value>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut fields = Map::new();
    let mut depth = 0usize;
    let mut saw_envelope = false;
    let mut body_depth: Option<usize> = None;
    let mut current = String::new();
    let mut text = String::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| PolycallError::Decode(format!("invalid SOAP XML: {err}")))?;

        match event {
            Event::Start(start) => {
                depth += 1;
                let name = local_name(start.local_name().as_ref());
                if depth == 1 {
                    if name != "Envelope" {
                        return Err(PolycallError::Decode(format!(
                            "expected SOAP Envelope root, found <{name}>"
                        )));
                    }
                    saw_envelope = true;
                } else if depth == 2 && body_depth.is_none() && name == "Body" {
                    body_depth = Some(depth);
                } else if body_depth.is_some_and(|body| depth > body) {
                    current = name;
                    text.clear();
                }
            }
            Event::Empty(empty) => {
                if depth == 0 {
                    let name = local_name(empty.local_name().as_ref());
                    if name != "Envelope" {
                        return Err(PolycallError::Decode(format!(
                            "expected SOAP Envelope root, found <{name}/>"
                        )));
                    }
                    saw_envelope = true;
                }
                current.clear();
                text.clear();
            }
            Event::Text(content) => {
                if !current.is_empty() {
                    let unescaped = content
                        .unescape()
                        .map_err(|err| PolycallError::Decode(format!("invalid SOAP text: {err}")))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(content) => {
                if !current.is_empty() {
                    text.push_str(&String::from_utf8_lossy(&content));
                }
            }
            Event::End(_) => {
                if body_depth.is_some_and(|body| depth > body) && !current.is_empty() {
                    let value = text.trim();
                    if !value.is_empty() {
                        let name = std::mem::take(&mut current);
                        fields.insert(name, Value::String(value.to_string()));
                    }
                }
                if body_depth == Some(depth) {
                    body_depth = None;
                }
                current.clear();
                text.clear();
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_envelope {
        return Err(PolycallError::Decode("document has no SOAP Envelope".into()));
    }
    Ok(fields)
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const TEMP_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <CelsiusToFahrenheitResponse xmlns="https://www.w3schools.com/xml/">
      <CelsiusToFahrenheitResult>212</CelsiusToFahrenheitResult>
      <Unit>F &amp; more</Unit>
    </CelsiusToFahrenheitResponse>
  </soap:Body>
</soap:Envelope>"#;

    #[test]
    fn flattens_soap_body_leaves() {
        let fields = decode_soap_envelope(TEMP_RESPONSE.as_bytes()).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["CelsiusToFahrenheitResult"], json!("212"));
        assert_eq!(fields["Unit"], json!("F & more"));
    }

    #[test]
    fn empty_body_yields_empty_map() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body/></soap:Envelope>"#;
        assert!(decode_soap_envelope(xml.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_envelope_documents() {
        let err = decode_soap_envelope(b"<html><body>oops</body></html>").unwrap_err();
        assert!(matches!(err, PolycallError::Decode(_)));
        assert!(decode_soap_envelope(b"not xml at all").is_err());
    }

    #[test]
    fn rest_body_falls_back_to_raw_text() {
        assert_eq!(decode_body(ResponseBody::Rest(br#"{"a":1}"#.to_vec())), json!({ "a": 1 }));
        assert_eq!(decode_body(ResponseBody::Rest(b"plain text".to_vec())), json!("plain text"));
        assert_eq!(decode_body(ResponseBody::Rest(Vec::new())), Value::Null);
    }

    #[test]
    fn soap_body_falls_back_to_raw_text() {
        let decoded = decode_body(ResponseBody::Soap(TEMP_RESPONSE.as_bytes().to_vec()));
        assert_eq!(decoded["CelsiusToFahrenheitResult"], json!("212"));
        assert_eq!(decode_body(ResponseBody::Soap(b"<broken".to_vec())), json!("<broken"));
    }

    #[test]
    fn grpc_map_passes_through() {
        let mut message = Map::new();
        message.insert("user_id".into(), json!("42"));
        assert_eq!(decode_body(ResponseBody::Grpc(message)), json!({ "user_id": "42" }));
        assert_eq!(decode_body(ResponseBody::Empty), Value::Null);
    }
}
