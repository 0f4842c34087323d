//! Hand-built descriptors and a reflection-enabled test server.

use std::convert::Infallible;
use std::net::SocketAddr;

use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};
use tokio::net::TcpListener;
use tonic::body::BoxBody;
use tonic::codegen::{http, Body, BoxFuture, Context, Poll, Service, StdError};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;
use tonic::Status;

use super::codec::DynamicCodec;

fn field(name: &str, json_name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        json_name: Some(json_name.into()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..FieldDescriptorProto::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto { name: Some(name.into()), field: fields, ..DescriptorProto::default() }
}

/// `common/status.proto`: a dependency of `users.proto`.
pub fn common_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("common/status.proto".into()),
        package: Some("common".into()),
        message_type: vec![message("Status", vec![field("code", "code", 1, Type::Int32)])],
        syntax: Some("proto3".into()),
        ..FileDescriptorProto::default()
    }
}

/// `users.proto` with `users.UserService/GetUser`.
pub fn users_file() -> FileDescriptorProto {
    let mut status = field("status", "status", 4, Type::Message);
    status.type_name = Some(".common.Status".into());

    FileDescriptorProto {
        name: Some("users.proto".into()),
        package: Some("users".into()),
        dependency: vec!["common/status.proto".into()],
        message_type: vec![
            message("GetUserRequest", vec![field("user_id", "userId", 1, Type::String)]),
            message(
                "GetUserResponse",
                vec![
                    field("display_name", "displayName", 1, Type::String),
                    field("age", "age", 2, Type::Int32),
                    field("active", "active", 3, Type::Bool),
                    status,
                ],
            ),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("UserService".into()),
            method: vec![MethodDescriptorProto {
                name: Some("GetUser".into()),
                input_type: Some(".users.GetUserRequest".into()),
                output_type: Some(".users.GetUserResponse".into()),
                ..MethodDescriptorProto::default()
            }],
            ..ServiceDescriptorProto::default()
        }],
        syntax: Some("proto3".into()),
        ..FileDescriptorProto::default()
    }
}

pub fn pool() -> DescriptorPool {
    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_protos([common_file(), users_file()]).unwrap();
    pool
}

/// Serve `users.UserService` with v1alpha reflection on an ephemeral port.
///
/// `GetUser` answers with `display_name = "user-<user_id>"` and `age = 42`,
/// leaving `active` and `status` unset.
pub async fn serve_users() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let incoming = TcpIncoming::from_listener(listener, true, None).unwrap();

    let reflection = tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(FileDescriptorSet { file: vec![common_file(), users_file()] })
        .build_v1alpha()
        .unwrap();
    let pool = pool();
    let users = UserService {
        request: pool.get_message_by_name("users.GetUserRequest").unwrap(),
        response: pool.get_message_by_name("users.GetUserResponse").unwrap(),
    };

    tokio::spawn(
        Server::builder().add_service(reflection).add_service(users).serve_with_incoming(incoming),
    );
    addr
}

#[derive(Debug, Clone)]
struct UserService {
    request: MessageDescriptor,
    response: MessageDescriptor,
}

impl NamedService for UserService {
    const NAME: &'static str = "users.UserService";
}

impl<B> Service<http::Request<B>> for UserService
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            let mut grpc = Grpc::new(DynamicCodec::new(service.request));
            Ok(grpc.unary(GetUser(service.response), req).await)
        })
    }
}

struct GetUser(MessageDescriptor);

impl UnaryService<DynamicMessage> for GetUser {
    type Response = DynamicMessage;
    type Future = BoxFuture<tonic::Response<DynamicMessage>, Status>;

    fn call(&mut self, request: tonic::Request<DynamicMessage>) -> Self::Future {
        let descriptor = self.0.clone();
        Box::pin(async move {
            let user_id = request
                .get_ref()
                .get_field_by_name("user_id")
                .and_then(|value| value.as_str().map(str::to_owned))
                .unwrap_or_default();

            let mut reply = DynamicMessage::new(descriptor);
            reply.set_field_by_name("display_name", Value::String(format!("user-{user_id}")));
            reply.set_field_by_name("age", Value::I32(42));
            Ok(tonic::Response::new(reply))
        })
    }
}
