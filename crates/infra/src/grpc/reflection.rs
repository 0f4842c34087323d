//! Method lookup through the server reflection service (v1alpha)
//!
//! The file declaring the service is requested by symbol; any dependency the
//! server did not send along is then requested by file name.

use std::collections::{BTreeMap, HashSet};

use polycall_domain::{PolycallError, Result};
use prost::Message;
use prost_reflect::{DescriptorPool, MethodDescriptor};
use prost_types::FileDescriptorProto;
use tonic::transport::Channel;
use tonic_reflection::pb::v1alpha::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::v1alpha::server_reflection_request::MessageRequest;
use tonic_reflection::pb::v1alpha::server_reflection_response::MessageResponse;
use tonic_reflection::pb::v1alpha::ServerReflectionRequest;
use tracing::debug;

use super::method::MethodPath;
use crate::errors::InfraError;

/// Upper bound on dependency lookup rounds.
const MAX_DEPENDENCY_ROUNDS: usize = 16;

/// Ask the server for the descriptor of `method`.
///
/// # Errors
/// Returns `PolycallError::ClientInit` when reflection is unavailable, the
/// descriptors are unusable, or the method does not exist.
pub async fn resolve_method(channel: Channel, method: &MethodPath) -> Result<MethodDescriptor> {
    let mut client = ServerReflectionClient::new(channel);
    let mut files = BTreeMap::new();

    let initial =
        fetch(&mut client, MessageRequest::FileContainingSymbol(method.service.clone())).await?;
    collect(&mut files, &initial)?;

    let mut requested = HashSet::new();
    for _ in 0..MAX_DEPENDENCY_ROUNDS {
        let missing = missing_dependencies(&files, &requested);
        if missing.is_empty() {
            break;
        }
        for name in missing {
            requested.insert(name.clone());
            debug!(file = %name, "fetching descriptor dependency");
            match fetch(&mut client, MessageRequest::FileByFilename(name.clone())).await {
                Ok(encoded) => collect(&mut files, &encoded)?,
                Err(err) => debug!(file = %name, error = %err, "dependency not served"),
            }
        }
    }

    let pool = build_pool(files.into_values())?;
    find_method(&pool, method)
}

async fn fetch(
    client: &mut ServerReflectionClient<Channel>,
    request: MessageRequest,
) -> Result<Vec<Vec<u8>>> {
    let request = ServerReflectionRequest { host: String::new(), message_request: Some(request) };
    let mut stream = client
        .server_reflection_info(tokio_stream::once(request))
        .await
        .map_err(reflection_error)?
        .into_inner();

    let response = stream
        .message()
        .await
        .map_err(reflection_error)?
        .ok_or_else(|| {
            PolycallError::ClientInit("reflection stream closed without a response".into())
        })?;

    match response.message_response {
        Some(MessageResponse::FileDescriptorResponse(files)) => {
            if files.file_descriptor_proto.is_empty() {
                return Err(PolycallError::ClientInit("no file descriptor returned".into()));
            }
            Ok(files.file_descriptor_proto)
        }
        Some(MessageResponse::ErrorResponse(err)) => Err(PolycallError::ClientInit(format!(
            "reflection error {}: {}",
            err.error_code, err.error_message
        ))),
        _ => Err(PolycallError::ClientInit("unexpected reflection response type".into())),
    }
}

fn reflection_error(status: tonic::Status) -> PolycallError {
    let inner = PolycallError::from(InfraError::from(status));
    PolycallError::ClientInit(format!("failed to get method descriptor: {inner}"))
}

fn collect(files: &mut BTreeMap<String, FileDescriptorProto>, encoded: &[Vec<u8>]) -> Result<()> {
    for bytes in encoded {
        let file = FileDescriptorProto::decode(bytes.as_slice())
            .map_err(|err| PolycallError::from(InfraError::from(err)))?;
        files.entry(file.name().to_string()).or_insert(file);
    }
    Ok(())
}

fn missing_dependencies(
    files: &BTreeMap<String, FileDescriptorProto>,
    requested: &HashSet<String>,
) -> Vec<String> {
    let mut missing: Vec<String> = files
        .values()
        .flat_map(|file| file.dependency.iter())
        .filter(|dep| !files.contains_key(*dep) && !requested.contains(*dep))
        .cloned()
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

/// Load decoded files into a pool, dependencies first.
///
/// # Errors
/// Returns `PolycallError::ClientInit` when the files do not form a valid
/// set, including when a dependency is missing.
pub fn build_pool(files: impl IntoIterator<Item = FileDescriptorProto>) -> Result<DescriptorPool> {
    let by_name: BTreeMap<String, FileDescriptorProto> =
        files.into_iter().map(|file| (file.name().to_string(), file)).collect();

    let mut ordered = Vec::with_capacity(by_name.len());
    let mut visited = HashSet::new();
    for name in by_name.keys() {
        visit(name, &by_name, &mut visited, &mut ordered);
    }

    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_protos(ordered)
        .map_err(|err| PolycallError::from(InfraError::from(err)))?;
    Ok(pool)
}

fn visit(
    name: &str,
    by_name: &BTreeMap<String, FileDescriptorProto>,
    visited: &mut HashSet<String>,
    ordered: &mut Vec<FileDescriptorProto>,
) {
    if !visited.insert(name.to_string()) {
        return;
    }
    let Some(file) = by_name.get(name) else {
        return;
    };
    for dep in &file.dependency {
        visit(dep, by_name, visited, ordered);
    }
    ordered.push(file.clone());
}

/// # Errors
/// Returns `PolycallError::ClientInit` when the service or method is absent.
pub fn find_method(pool: &DescriptorPool, method: &MethodPath) -> Result<MethodDescriptor> {
    let service = pool.get_service_by_name(&method.service).ok_or_else(|| {
        PolycallError::ClientInit(format!("service {} not found via reflection", method.service))
    })?;
    let found = service.methods().find(|candidate| candidate.name() == method.method);
    found.ok_or_else(|| PolycallError::ClientInit(format!("method {} not found", method.path())))
}
