//! # Polycall Core
//!
//! Protocol-independent call logic - no network or file system access.
//!
//! This crate contains:
//! - The client cache and its fingerprint
//! - The timeout-only retry state machine
//! - Response body normalization
//! - The call orchestrator
//! - Port traits the infrastructure layer implements
//!
//! ## Architecture Principles
//! - Only depends on `polycall-domain`
//! - Protocol clients arrive through [`ClientFactory`]
//! - Backoff waits go through [`Sleeper`] so tests never sleep

pub mod cache;
pub mod decode;
pub mod fingerprint;
pub mod orchestrator;
pub mod ports;
pub mod retry;

pub use cache::{CachedClient, CallerCache};
pub use decode::{decode_body, decode_soap_envelope};
pub use fingerprint::Fingerprint;
pub use orchestrator::CallOrchestrator;
pub use ports::{ClientFactory, ProtocolClient, Sleeper, TokioSleeper};
pub use retry::{backoff_before, AttemptOutcome, RetryPolicy, RetryState, Transition};
