//! Shared HTTP plumbing for the REST and SOAP drivers

pub mod client;

pub use client::{header_map, header_multimap, HttpClientBuilder};
