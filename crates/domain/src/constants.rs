//! Domain constants
//!
//! Centralized location for the defaults and wire-level names shared by the
//! orchestrator and the protocol clients.

use std::time::Duration;

// Deadlines
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const GRPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout value (milliseconds) meaning "no deadline".
pub const UNBOUNDED_TIMEOUT_MS: i64 = -1;

// Generic parameter map keys
pub const PARAM_METHOD: &str = "method";
pub const PARAM_BODY: &str = "body";
pub const PARAM_HEADERS: &str = "headers";
pub const PARAM_SOAP_ACTION: &str = "soapAction";

// Generic result map keys
pub const RESULT_STATUS_CODE: &str = "statusCode";
pub const RESULT_BODY: &str = "body";
pub const RESULT_HEADERS: &str = "headers";
pub const RESULT_ERROR: &str = "error";

// HTTP
pub const DEFAULT_HTTP_METHOD: &str = "GET";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_SOAP: &str = "text/xml; charset=utf-8";

// SOAP
pub const SOAP_ACTION_HEADER: &str = "SOAPAction";
pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const DEFAULT_SOAP_NAMESPACE: &str = "http://tempuri.org/";

// gRPC synthesized status codes
pub const GRPC_STATUS_OK: u16 = 200;
pub const GRPC_STATUS_ERROR: u16 = 500;
