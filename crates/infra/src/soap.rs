//! SOAP 1.1 driver
//!
//! Requests are always POSTed. A JSON object body is wrapped into an envelope
//! whose operation element is named after the call's method; strings and
//! bytes are sent as-is. A `Fault` in the response body is reported even when
//! the HTTP status is 2xx.

use async_trait::async_trait;
use polycall_core::ProtocolClient;
use polycall_domain::constants::{
    CONTENT_TYPE_SOAP, DEFAULT_SOAP_NAMESPACE, SOAP_ENVELOPE_NAMESPACE,
};
use polycall_domain::{
    CallRequest, ConnectionConfig, Endpoint, PolycallError, Protocol, ProtocolResponse,
    RequestBody, ResponseBody, Result,
};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::errors::InfraError;
use crate::http::{header_map, HttpClientBuilder};
use crate::rest::{parse_url, read_response};

const SOAP_ACTION: HeaderName = HeaderName::from_static("soapaction");

/// Driver for `soap` endpoints.
#[derive(Debug, Clone)]
pub struct SoapClient {
    endpoint: Endpoint,
    url: Url,
    namespace: String,
    http: Client,
}

impl SoapClient {
    /// # Errors
    /// `Validation` for an unparseable URL, `ClientInit` for TLS problems.
    pub fn new(endpoint: &Endpoint, config: &ConnectionConfig) -> Result<Self> {
        let url = parse_url(&endpoint.url)?;
        let http = HttpClientBuilder::from_connection(config)?.build()?;
        let namespace = endpoint
            .wsdl_url
            .as_deref()
            .filter(|wsdl| !wsdl.trim().is_empty())
            .map_or_else(|| DEFAULT_SOAP_NAMESPACE.to_string(), namespace_from_wsdl);
        Ok(Self { endpoint: endpoint.clone(), url, namespace, http })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl ProtocolClient for SoapClient {
    fn protocol(&self) -> Protocol {
        Protocol::Soap
    }

    #[instrument(
        skip_all,
        fields(endpoint = %self.endpoint.friendly_name, operation = %request.method)
    )]
    async fn call(&self, request: CallRequest) -> Result<ProtocolResponse> {
        let operation = request.method.as_str();
        let payload = match &request.body {
            RequestBody::Bytes(bytes) => bytes.clone(),
            RequestBody::Text(text) => text.clone().into_bytes(),
            RequestBody::Empty => {
                build_envelope(operation, &self.namespace, &Map::new())?.into_bytes()
            }
            RequestBody::Json(Value::Object(params)) => {
                build_envelope(operation, &self.namespace, params)?.into_bytes()
            }
            RequestBody::Json(_) => {
                return Err(PolycallError::Encode(
                    "SOAP body must be a JSON object, raw XML text or bytes".into(),
                ));
            }
        };

        let mut headers = header_map(&request.headers)?;
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_SOAP));
        }
        if !headers.contains_key(&SOAP_ACTION) {
            let action = HeaderValue::from_str(&format!("\"{operation}\"")).map_err(|_| {
                PolycallError::Validation(format!("invalid SOAP operation name: {operation}"))
            })?;
            headers.insert(SOAP_ACTION, action);
        }

        let mut builder = self.http.post(self.url.clone()).headers(headers).body(payload);
        if let Some(deadline) = request.deadline {
            builder = builder.timeout(deadline);
        }

        debug!(url = %self.url, "sending SOAP request");
        let response =
            builder.send().await.map_err(|err| PolycallError::from(InfraError::from(err)))?;
        let mut response = read_response(response).await?;

        if let ResponseBody::Rest(bytes) = std::mem::take(&mut response.body) {
            if let Some(fault) = extract_fault(&bytes) {
                debug!(code = %fault.code, "SOAP fault received");
                response.error = Some(PolycallError::Protocol(fault.to_string()));
            }
            response.body = ResponseBody::Soap(bytes);
        }
        Ok(response)
    }
}

/// Guess the target namespace from a WSDL location: drop a trailing
/// `?wsdl`/`?WSDL` and keep everything up to the last `/`.
pub fn namespace_from_wsdl(wsdl_url: &str) -> String {
    let trimmed = wsdl_url
        .strip_suffix("?wsdl")
        .or_else(|| wsdl_url.strip_suffix("?WSDL"))
        .unwrap_or(wsdl_url);
    match trimmed.rfind('/') {
        Some(idx) if idx > 0 => trimmed[..=idx].to_string(),
        _ => format!("{trimmed}/"),
    }
}

/// Build a SOAP 1.1 envelope around `<operation xmlns="namespace">`.
///
/// # Errors
/// Returns `PolycallError::Validation` when parameters are given without an
/// operation name.
pub fn build_envelope(
    operation: &str,
    namespace: &str,
    params: &Map<String, Value>,
) -> Result<String> {
    let mut content = String::new();
    if operation.is_empty() {
        if !params.is_empty() {
            return Err(PolycallError::Validation(
                "SOAP operation name is required to build an envelope".into(),
            ));
        }
    } else {
        content.push_str(&format!("<{operation} xmlns=\"{}\">", escape(namespace)));
        for (key, value) in params {
            content.push_str(&format!("<{key}>{}</{key}>", escape(element_text(value).as_str())));
        }
        content.push_str(&format!("</{operation}>"));
    }

    Ok(format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="{SOAP_ENVELOPE_NAMESPACE}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <soap:Body>
    {content}
  </soap:Body>
</soap:Envelope>"#
    ))
}

fn element_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `Envelope/Body/Fault` contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapFault {
    pub code: String,
    pub string: String,
    pub detail: String,
}

impl std::fmt::Display for SoapFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SOAP fault: [{}] {} - {}", self.code, self.string, self.detail)
    }
}

#[derive(Clone, Copy)]
enum FaultField {
    Code,
    String,
    Detail,
}

/// Find a fault in a SOAP response. Anything that is not a well-formed
/// envelope yields `None`.
pub fn extract_fault(xml: &[u8]) -> Option<SoapFault> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut fault: Option<SoapFault> = None;
    let mut field: Option<(FaultField, usize)> = None;

    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                path.push(name);
                let depth = path.len();
                if depth == 1 && path[0] != "Envelope" {
                    return None;
                }
                if depth == 3 && path[1] == "Body" && path[2] == "Fault" {
                    fault.get_or_insert_with(SoapFault::default);
                } else if depth == 4 && fault.is_some() && path[2] == "Fault" {
                    field = match path[3].as_str() {
                        "faultcode" => Some((FaultField::Code, depth)),
                        "faultstring" => Some((FaultField::String, depth)),
                        "detail" => Some((FaultField::Detail, depth)),
                        _ => None,
                    };
                }
            }
            Event::Empty(empty) => {
                if path.is_empty() && empty.local_name().as_ref() != b"Envelope" {
                    return None;
                }
                if path.len() == 2 && path[1] == "Body" && empty.local_name().as_ref() == b"Fault" {
                    fault.get_or_insert_with(SoapFault::default);
                }
            }
            Event::Text(text) => {
                if let (Some((kind, _)), Some(fault)) = (field, fault.as_mut()) {
                    let text = text.unescape().ok()?;
                    let target = match kind {
                        FaultField::Code => &mut fault.code,
                        FaultField::String => &mut fault.string,
                        FaultField::Detail => &mut fault.detail,
                    };
                    target.push_str(&text);
                }
            }
            Event::End(_) => {
                if field.is_some_and(|(_, depth)| depth == path.len()) {
                    field = None;
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    fault.map(|mut fault| {
        fault.code = fault.code.trim().to_string();
        fault.string = fault.string.trim().to_string();
        fault.detail = fault.detail.trim().to_string();
        fault
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const FAULT: &str = r#"<?xml version="1.0"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>Server was unable to process request</faultstring>
      <detail>Celsius must be a number</detail>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

    fn client_for(server: &MockServer) -> SoapClient {
        let endpoint = Endpoint::soap("Temps", format!("{}/xml/tempconvert.asmx", server.uri()))
            .with_wsdl_url("https://www.w3schools.com/xml/tempconvert.asmx?wsdl");
        SoapClient::new(&endpoint, &ConnectionConfig::default()).expect("soap client")
    }

    #[test]
    fn namespace_is_derived_from_wsdl_location() {
        assert_eq!(
            namespace_from_wsdl("https://www.w3schools.com/xml/tempconvert.asmx?wsdl"),
            "https://www.w3schools.com/xml/"
        );
        assert_eq!(
            namespace_from_wsdl("http://example.com/Service.svc?WSDL"),
            "http://example.com/"
        );
        assert_eq!(namespace_from_wsdl("service"), "service/");
    }

    #[test]
    fn default_namespace_without_wsdl() {
        let endpoint = Endpoint::soap("Temps", "https://example.com/svc.asmx");
        let client = SoapClient::new(&endpoint, &ConnectionConfig::default()).unwrap();
        assert_eq!(client.namespace(), "http://tempuri.org/");
    }

    #[test]
    fn envelope_escapes_parameter_values() {
        let params = json!({ "Celsius": "1 < 2 & 3", "Scale": 2 });
        let envelope =
            build_envelope("Convert", "http://tempuri.org/", params.as_object().unwrap()).unwrap();

        assert!(envelope.contains(r#"<Convert xmlns="http://tempuri.org/">"#));
        assert!(envelope.contains("<Celsius>1 &lt; 2 &amp; 3</Celsius>"));
        assert!(envelope.contains("<Scale>2</Scale>"));
        assert!(envelope.contains("<soap:Body>"));
    }

    #[test]
    fn envelope_without_operation_requires_empty_params() {
        let params = json!({ "a": 1 });
        assert!(build_envelope("", "ns", params.as_object().unwrap()).is_err());
        let empty = build_envelope("", "ns", &Map::new()).unwrap();
        assert!(empty.contains("<soap:Body>"));
    }

    #[test]
    fn fault_fields_are_extracted() {
        let fault = extract_fault(FAULT.as_bytes()).unwrap();
        assert_eq!(fault.code, "soap:Server");
        assert_eq!(
            fault.to_string(),
            "SOAP fault: [soap:Server] Server was unable to process request - Celsius must be a number"
        );
        assert!(extract_fault(b"<Envelope><Body><Result>1</Result></Body></Envelope>").is_none());
        assert!(extract_fault(b"not xml").is_none());
    }

    #[tokio::test]
    async fn posts_envelope_with_soap_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "text/xml; charset=utf-8"))
            .and(header("soapaction", "\"CelsiusToFahrenheit\""))
            .and(body_string_contains(
                r#"<CelsiusToFahrenheit xmlns="https://www.w3schools.com/xml/"><Celsius>100</Celsius></CelsiusToFahrenheit>"#,
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\"><soap:Body><R>212</R></soap:Body></soap:Envelope>",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = CallRequest {
            method: "CelsiusToFahrenheit".into(),
            body: RequestBody::Json(json!({ "Celsius": "100" })),
            ..CallRequest::default()
        };

        let response = client.call(request).await.unwrap();
        assert_eq!(response.status_code, 200);
        assert!(response.error.is_none());
        assert!(matches!(response.body, ResponseBody::Soap(_)));
    }

    #[tokio::test]
    async fn explicit_soap_action_header_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("soapaction", "\"urn:Explicit\""))
            .and(body_string_contains("<raw/>"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut request = CallRequest {
            method: "Ignored".into(),
            body: RequestBody::Text("<raw/>".into()),
            ..CallRequest::default()
        };
        request.headers.insert("SOAPAction".into(), "\"urn:Explicit\"".into());

        client.call(request).await.unwrap();
    }

    #[tokio::test]
    async fn fault_with_200_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FAULT))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = CallRequest { method: "Convert".into(), ..CallRequest::default() };
        let response = client.call(request).await.unwrap();

        assert_eq!(response.status_code, 200);
        let error = response.error.unwrap();
        assert!(error.to_string().starts_with("SOAP fault: [soap:Server]"));
    }

    #[tokio::test]
    async fn http_error_without_fault_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client.call(CallRequest::default()).await.unwrap();

        assert_eq!(response.error, Some(PolycallError::Protocol("HTTP 503: unavailable".into())));
        assert_eq!(response.body, ResponseBody::Soap(b"unavailable".to_vec()));
    }

    #[tokio::test]
    async fn non_object_json_body_is_an_encode_error() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let request =
            CallRequest { body: RequestBody::Json(json!([1, 2, 3])), ..CallRequest::default() };

        let err = client.call(request).await.unwrap_err();
        assert!(matches!(err, PolycallError::Encode(_)));
    }
}
