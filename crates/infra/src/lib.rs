//! # Polycall Infrastructure
//!
//! Network-backed implementations of the `polycall-core` ports.
//!
//! This crate contains:
//! - Protocol clients for REST (JSON and form bodies), SOAP and gRPC
//! - The default client factory and process-wide orchestrator
//! - TLS material loading shared by the HTTP and gRPC clients
//! - Endpoint catalog loading (TOML/JSON)
//! - Tracing subscriber installation for binaries
//!
//! ## Architecture
//! - Implements traits defined in `polycall-core`
//! - Contains all I/O: sockets, certificate files, configuration files

pub mod config;
pub mod errors;
pub mod factory;
pub mod grpc;
pub mod http;
pub mod observability;
pub mod rest;
pub mod soap;
pub mod tls;

// Re-export commonly used items
pub use config::EndpointCatalog;
pub use errors::InfraError;
pub use factory::{call_endpoint, default_orchestrator, DefaultClientFactory};
pub use grpc::GrpcClient;
pub use http::HttpClientBuilder;
pub use observability::init_tracing;
pub use rest::RestClient;
pub use soap::SoapClient;
pub use tls::TlsMaterial;
