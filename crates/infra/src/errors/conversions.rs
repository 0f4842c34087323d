//! Conversions from external infrastructure errors into domain errors.

use polycall_domain::PolycallError;
use prost_reflect::DescriptorError;
use reqwest::Error as HttpError;
use tonic::transport::Error as TransportError;
use tonic::{Code, Status};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub PolycallError);

impl From<InfraError> for PolycallError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<PolycallError> for InfraError {
    fn from(value: PolycallError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoPolycallError {
    fn into_polycall(self) -> PolycallError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → PolycallError */
/* -------------------------------------------------------------------------- */

impl IntoPolycallError for HttpError {
    fn into_polycall(self) -> PolycallError {
        if self.is_timeout() {
            return PolycallError::Timeout(format!("HTTP request timed out: {self}"));
        }

        if self.is_builder() {
            return PolycallError::ClientInit(format!("failed to build HTTP request: {self}"));
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return PolycallError::Transport(format!("HTTP connection failure: {self}"));
        }

        if self.is_body() || self.is_decode() {
            return PolycallError::Transport(format!("failed to read HTTP response body: {self}"));
        }

        PolycallError::Transport(format!("request failed: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_polycall())
    }
}

/* -------------------------------------------------------------------------- */
/* tonic::Status → PolycallError */
/* -------------------------------------------------------------------------- */

impl IntoPolycallError for Status {
    fn into_polycall(self) -> PolycallError {
        let message = format!("rpc error: code = {:?} desc = {}", self.code(), self.message());
        match self.code() {
            Code::DeadlineExceeded => PolycallError::Timeout(message),
            _ => PolycallError::Protocol(message),
        }
    }
}

impl From<Status> for InfraError {
    fn from(value: Status) -> Self {
        InfraError(value.into_polycall())
    }
}

/* -------------------------------------------------------------------------- */
/* tonic::transport::Error → PolycallError */
/* -------------------------------------------------------------------------- */

impl IntoPolycallError for TransportError {
    fn into_polycall(self) -> PolycallError {
        PolycallError::Transport(format!("gRPC transport error: {self}"))
    }
}

impl From<TransportError> for InfraError {
    fn from(value: TransportError) -> Self {
        InfraError(value.into_polycall())
    }
}

/* -------------------------------------------------------------------------- */
/* Descriptor decoding (server reflection) → PolycallError */
/* -------------------------------------------------------------------------- */

impl IntoPolycallError for prost::DecodeError {
    fn into_polycall(self) -> PolycallError {
        PolycallError::ClientInit(format!("failed to decode file descriptor: {self}"))
    }
}

impl From<prost::DecodeError> for InfraError {
    fn from(value: prost::DecodeError) -> Self {
        InfraError(value.into_polycall())
    }
}

impl IntoPolycallError for DescriptorError {
    fn into_polycall(self) -> PolycallError {
        PolycallError::ClientInit(format!("failed to build descriptor pool: {self}"))
    }
}

impl From<DescriptorError> for InfraError {
    fn from(value: DescriptorError) -> Self {
        InfraError(value.into_polycall())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
