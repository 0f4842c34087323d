//! Domain data types

pub mod call;
pub mod connection;
pub mod endpoint;

pub use call::{
    CallParams, CallRequest, CallResult, HeaderMultimap, ProtocolResponse, RequestBody,
    ResponseBody,
};
pub use connection::ConnectionConfig;
pub use endpoint::{Endpoint, Protocol, Timeout};
