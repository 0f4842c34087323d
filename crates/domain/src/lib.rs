//! # Polycall Domain
//!
//! Data types and errors shared by every Polycall crate.
//!
//! This crate contains:
//! - Endpoint descriptors and connection settings
//! - Per-call request/response shapes and the uniform `CallResult`
//! - The `PolycallError` taxonomy
//! - Domain constants (defaults, parameter and result keys)
//!
//! ## Architecture
//! - No dependencies on other Polycall crates
//! - No I/O

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
