//! Per-call request and result shapes

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    PARAM_BODY, PARAM_HEADERS, PARAM_METHOD, PARAM_SOAP_ACTION, RESULT_BODY, RESULT_ERROR,
    RESULT_HEADERS, RESULT_STATUS_CODE,
};
use crate::errors::PolycallError;

/// Response headers, one entry per header name.
pub type HeaderMultimap = BTreeMap<String, Vec<String>>;

/// Request payload handed to a protocol client
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Sent verbatim.
    Bytes(Vec<u8>),
    /// Sent verbatim.
    Text(String),
    /// Structured payload; each protocol encodes it its own way.
    Json(Value),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Map a generic `body` parameter. Strings stay raw, `null` is no body.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(text) => Self::Text(text),
            other => Self::Json(other),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Caller-supplied parameters for one logical call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallParams {
    /// HTTP verb, SOAP operation or gRPC method override.
    pub method: Option<String>,
    pub body: RequestBody,
    /// REST/SOAP request headers.
    pub headers: BTreeMap<String, String>,
    /// SOAP only; emitted as a quoted `SOAPAction` header.
    pub soap_action: Option<String>,
}

impl CallParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the generic parameter map (`method`, `body`, `headers`,
    /// `soapAction`). Values of the wrong type are ignored, as are header
    /// values that are not strings.
    pub fn from_map(params: &Map<String, Value>) -> Self {
        let method = params.get(PARAM_METHOD).and_then(Value::as_str).map(str::to_string);
        let body = params.get(PARAM_BODY).cloned().map(RequestBody::from_value).unwrap_or_default();
        let headers = params
            .get(PARAM_HEADERS)
            .and_then(Value::as_object)
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(|(name, value)| {
                        value.as_str().map(|value| (name.clone(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let soap_action =
            params.get(PARAM_SOAP_ACTION).and_then(Value::as_str).map(str::to_string);

        Self { method, body, headers, soap_action }
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn soap_action(mut self, action: impl Into<String>) -> Self {
        self.soap_action = Some(action.into());
        self
    }
}

/// Protocol-agnostic request for a single attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRequest {
    /// `None` means the attempt has no deadline.
    pub deadline: Option<Duration>,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl CallRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response payload as produced by a protocol client, before decoding
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    Empty,
    /// JSON (or arbitrary) bytes from a REST exchange.
    Rest(Vec<u8>),
    /// XML bytes from a SOAP exchange.
    Soap(Vec<u8>),
    /// Already-decoded gRPC response message.
    Grpc(Map<String, Value>),
}

/// What a protocol client returns for an attempt that produced a response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolResponse {
    pub status_code: u16,
    pub headers: HeaderMultimap,
    pub body: ResponseBody,
    /// Set when the response itself signals failure (HTTP >= 400, SOAP fault,
    /// gRPC status).
    pub error: Option<PolycallError>,
}

/// Normalized outcome of a call, identical in shape for every protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    /// HTTP status, synthesized 200/500 for gRPC, 0 when nothing was received.
    pub status_code: u16,
    pub body: Value,
    pub headers: HeaderMultimap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResult {
    /// Result for an attempt that never produced a response.
    pub fn failed(error: &PolycallError) -> Self {
        Self { error: Some(error.to_string()), ..Self::default() }
    }

    /// The generic result map (`statusCode`, `body`, `headers`, `error`).
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(RESULT_STATUS_CODE.to_string(), Value::from(self.status_code));
        map.insert(RESULT_BODY.to_string(), self.body.clone());
        let headers = self
            .headers
            .iter()
            .map(|(name, values)| {
                (name.clone(), Value::Array(values.iter().cloned().map(Value::String).collect()))
            })
            .collect();
        map.insert(RESULT_HEADERS.to_string(), Value::Object(headers));
        if let Some(error) = &self.error {
            map.insert(RESULT_ERROR.to_string(), Value::String(error.clone()));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn params_from_map_reads_known_keys() {
        let params = CallParams::from_map(&as_map(json!({
            "method": "POST",
            "body": { "user_id": "42" },
            "headers": { "X-Trace": "abc", "X-Count": 3 },
            "soapAction": "urn:GetUser"
        })));

        assert_eq!(params.method.as_deref(), Some("POST"));
        assert_eq!(params.body, RequestBody::Json(json!({ "user_id": "42" })));
        assert_eq!(params.headers.len(), 1);
        assert_eq!(params.headers.get("X-Trace").map(String::as_str), Some("abc"));
        assert_eq!(params.soap_action.as_deref(), Some("urn:GetUser"));
    }

    #[test]
    fn params_from_empty_map_are_default() {
        assert_eq!(CallParams::from_map(&Map::new()), CallParams::default());
    }

    #[test]
    fn string_body_stays_raw() {
        let params = CallParams::from_map(&as_map(json!({ "body": "<xml/>" })));
        assert_eq!(params.body, RequestBody::Text("<xml/>".into()));
        let params = CallParams::from_map(&as_map(json!({ "body": null })));
        assert!(params.body.is_empty());
    }

    #[test]
    fn request_header_lookup_ignores_case() {
        let mut request = CallRequest::default();
        request.headers.insert("content-type".into(), "text/plain".into());
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
        assert_eq!(request.header("Accept"), None);
    }

    #[test]
    fn result_map_has_uniform_keys() {
        let mut headers = HeaderMultimap::new();
        headers.insert("content-type".into(), vec!["application/json".into()]);
        let result = CallResult {
            status_code: 200,
            body: json!({ "ok": true }),
            headers,
            error: None,
        };

        let map = result.to_map();
        assert_eq!(map["statusCode"], json!(200));
        assert_eq!(map["body"], json!({ "ok": true }));
        assert_eq!(map["headers"], json!({ "content-type": ["application/json"] }));
        assert!(!map.contains_key("error"));

        let failed = CallResult::failed(&PolycallError::Transport("refused".into()));
        let map = failed.to_map();
        assert_eq!(map["statusCode"], json!(0));
        assert_eq!(map["body"], Value::Null);
        assert_eq!(map["error"], json!("Transport error: refused"));
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = CallResult { status_code: 404, ..CallResult::default() };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["statusCode"], json!(404));
        assert!(json.get("error").is_none());
    }
}
