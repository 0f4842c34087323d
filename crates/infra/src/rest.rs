//! REST and form-encoded HTTP driver

use async_trait::async_trait;
use polycall_core::ProtocolClient;
use polycall_domain::constants::{CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, DEFAULT_HTTP_METHOD};
use polycall_domain::{
    CallRequest, ConnectionConfig, Endpoint, PolycallError, Protocol, ProtocolResponse,
    RequestBody, ResponseBody, Result,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::errors::InfraError;
use crate::http::{header_map, header_multimap, HttpClientBuilder};

/// Driver for `rest` and `form` endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    endpoint: Endpoint,
    url: Url,
    http: Client,
}

impl RestClient {
    /// # Errors
    /// `Validation` for an unparseable URL, `ClientInit` for TLS problems.
    pub fn new(endpoint: &Endpoint, config: &ConnectionConfig) -> Result<Self> {
        let url = parse_url(&endpoint.url)?;
        let http = HttpClientBuilder::from_connection(config)?.build()?;
        Ok(Self { endpoint: endpoint.clone(), url, http })
    }

    fn is_form(&self) -> bool {
        self.endpoint.protocol == Protocol::FormUrlEncoded
    }
}

#[async_trait]
impl ProtocolClient for RestClient {
    fn protocol(&self) -> Protocol {
        self.endpoint.protocol
    }

    #[instrument(
        skip_all,
        fields(endpoint = %self.endpoint.friendly_name, method = %request.method)
    )]
    async fn call(&self, request: CallRequest) -> Result<ProtocolResponse> {
        let verb = if request.method.is_empty() { DEFAULT_HTTP_METHOD } else { &request.method };
        let method = Method::from_bytes(verb.as_bytes())
            .map_err(|_| PolycallError::Validation(format!("invalid HTTP method: {verb}")))?;

        let body = if self.is_form() {
            encode_form_body(&request.body)?
        } else {
            encode_body(&request.body)?
        };

        let mut builder = self
            .http
            .request(method.clone(), self.url.clone())
            .headers(header_map(&request.headers)?);
        if let Some(bytes) = body {
            if request.header(CONTENT_TYPE.as_str()).is_none() {
                let content_type =
                    if self.is_form() { CONTENT_TYPE_FORM } else { CONTENT_TYPE_JSON };
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            builder = builder.body(bytes);
        }
        if let Some(deadline) = request.deadline {
            builder = builder.timeout(deadline);
        }

        debug!(%method, url = %self.url, "sending HTTP request");
        let response =
            builder.send().await.map_err(|err| PolycallError::from(InfraError::from(err)))?;
        read_response(response).await
    }
}

/// Turn a reqwest response into a `ProtocolResponse`, flagging status >= 400.
pub(crate) async fn read_response(response: reqwest::Response) -> Result<ProtocolResponse> {
    let status = response.status().as_u16();
    let headers = header_multimap(response.headers());
    debug!(status, "received HTTP response");

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(err) => {
            return Ok(ProtocolResponse {
                status_code: status,
                headers,
                body: ResponseBody::Empty,
                error: Some(InfraError::from(err).into()),
            });
        }
    };

    let error = (status >= 400).then(|| http_status_error(status, &bytes));
    Ok(ProtocolResponse { status_code: status, headers, body: ResponseBody::Rest(bytes), error })
}

pub(crate) fn http_status_error(status: u16, body: &[u8]) -> PolycallError {
    PolycallError::Protocol(format!("HTTP {status}: {}", String::from_utf8_lossy(body)))
}

pub(crate) fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw.trim())
        .map_err(|err| PolycallError::Validation(format!("invalid endpoint URL {raw}: {err}")))
}

fn encode_body(body: &RequestBody) -> Result<Option<Vec<u8>>> {
    match body {
        RequestBody::Empty => Ok(None),
        RequestBody::Bytes(bytes) => Ok(Some(bytes.clone())),
        RequestBody::Text(text) => Ok(Some(text.clone().into_bytes())),
        RequestBody::Json(value) => serde_json::to_vec(value)
            .map(Some)
            .map_err(|err| PolycallError::Encode(format!("failed to marshal request body: {err}"))),
    }
}

/// Objects become `key=value` pairs (arrays repeat the key); strings and
/// bytes are assumed to be encoded already.
fn encode_form_body(body: &RequestBody) -> Result<Option<Vec<u8>>> {
    let fields = match body {
        RequestBody::Json(Value::Object(fields)) => fields,
        RequestBody::Json(other) => {
            return Err(PolycallError::Encode(format!(
                "unsupported form body type: {}",
                json_type_name(other)
            )));
        }
        raw => return encode_body(raw),
    };

    let mut form = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        match value {
            Value::Array(items) => {
                for item in items {
                    form.append_pair(key, &form_value(item));
                }
            }
            other => {
                form.append_pair(key, &form_value(other));
            }
        }
    }
    Ok(Some(form.finish().into_bytes()))
}

fn form_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
