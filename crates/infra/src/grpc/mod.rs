//! Dynamic gRPC driver built on server reflection

mod client;
mod codec;
mod convert;
mod method;
mod reflection;

#[cfg(test)]
mod fixtures;

pub use client::GrpcClient;
pub use codec::DynamicCodec;
pub use convert::{message_to_map, request_message};
pub use method::MethodPath;
pub use reflection::{build_pool, find_method, resolve_method};
