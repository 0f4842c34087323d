//! Endpoint catalog: configuration files naming the endpoints a binary can
//! call and the connection settings they share.

pub mod catalog;
pub mod loader;

pub use catalog::EndpointCatalog;
pub use loader::{load, load_from_file, parse_catalog, probe_config_paths, CONFIG_ENV_VAR};
