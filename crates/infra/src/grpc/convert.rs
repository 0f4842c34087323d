//! JSON ⇄ dynamic protobuf message conversion

use polycall_domain::{PolycallError, RequestBody, Result};
use prost_reflect::{
    DeserializeOptions, DynamicMessage, MessageDescriptor, ReflectMessage, SerializeOptions,
};
use serde_json::{Map, Value};

/// Build the request message. JSON bodies use the proto3 JSON mapping and
/// unknown fields are dropped; bytes are taken as an already-encoded message.
///
/// # Errors
/// Returns `PolycallError::Encode` when the body does not fit the message.
pub fn request_message(
    descriptor: &MessageDescriptor,
    body: &RequestBody,
) -> Result<DynamicMessage> {
    let options = DeserializeOptions::new().deny_unknown_fields(false);

    match body {
        RequestBody::Empty => Ok(DynamicMessage::new(descriptor.clone())),
        RequestBody::Json(value) => {
            DynamicMessage::deserialize_with_options(descriptor.clone(), value.clone(), &options)
                .map_err(encode_error)
        }
        RequestBody::Text(text) => {
            let mut deserializer = serde_json::Deserializer::from_str(text);
            let message = DynamicMessage::deserialize_with_options(
                descriptor.clone(),
                &mut deserializer,
                &options,
            )
            .map_err(encode_error)?;
            deserializer.end().map_err(encode_error)?;
            Ok(message)
        }
        RequestBody::Bytes(bytes) => {
            DynamicMessage::decode(descriptor.clone(), bytes.as_slice()).map_err(encode_error)
        }
    }
}

fn encode_error(err: impl std::fmt::Display) -> PolycallError {
    PolycallError::Encode(format!("failed to convert request to protobuf: {err}"))
}

/// Render a response message as a JSON object, keeping proto field names and
/// default-valued fields. Unset message fields appear as `null`; unset oneof
/// members are left out.
///
/// # Errors
/// Returns `PolycallError::Decode` when serialization fails.
pub fn message_to_map(message: &DynamicMessage) -> Result<Map<String, Value>> {
    let options = SerializeOptions::new().skip_default_fields(false).use_proto_field_name(true);
    let value = message
        .serialize_with_options(serde_json::value::Serializer, &options)
        .map_err(|err| PolycallError::Decode(format!("failed to convert response to map: {err}")))?;

    let mut map = match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            return Ok(map);
        }
    };

    let descriptor = message.descriptor();
    for field in descriptor.fields() {
        if field.containing_oneof().is_none() && !map.contains_key(field.name()) {
            map.insert(field.name().to_string(), Value::Null);
        }
    }
    Ok(map)
}
