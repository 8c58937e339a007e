//! graphql-ws message types: envelope, discriminator, and payloads.
//!
//! Every frame on the wire is a JSON text message of the shape
//! `{ "id"?: string, "type": string, "payload"?: any }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only subprotocol a peer may negotiate.
pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-ws";

/// Top-level graphql-ws message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMessage {
    /// Operation id. Present on `start`, `stop`, `data`, `error`, `complete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    /// Variant-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Discriminator for graphql-ws message types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Client → Server connection handshake, may carry an auth token.
    ConnectionInit,
    /// Server → Client handshake accepted.
    ConnectionAck,
    /// Server → Client connection-level failure.
    ConnectionError,
    /// Client → Server request to close the connection.
    ConnectionTerminate,
    /// Client → Server start an operation.
    Start,
    /// Server → Client operation result.
    Data,
    /// Server → Client operation failure.
    Error,
    /// Server → Client operation finished.
    Complete,
    /// Client → Server stop an operation.
    Stop,
    /// Server → Client keep-alive.
    #[serde(rename = "ka")]
    KeepAlive,
}

/// Payload of a `connection_init` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    /// Token handed to the connection-level authenticator.
    #[serde(rename = "authToken", default)]
    pub auth_token: String,
}

/// Payload of a `start` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartPayload {
    /// GraphQL document source text.
    pub query: String,
    /// Variables for the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    /// Operation to run when the document defines several.
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

/// Payload of a `data` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPayload {
    /// Execution result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Execution errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
}

impl OperationMessage {
    fn new(msg_type: MessageType, id: Option<&str>, payload: Option<Value>) -> Self {
        Self {
            id: id.map(str::to_string),
            msg_type,
            payload,
        }
    }

    /// `connection_ack`.
    #[must_use]
    pub fn ack() -> Self {
        Self::new(MessageType::ConnectionAck, None, None)
    }

    /// `ka`.
    #[must_use]
    pub fn keep_alive() -> Self {
        Self::new(MessageType::KeepAlive, None, None)
    }

    /// `connection_error` with a plain string payload.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::new(
            MessageType::ConnectionError,
            None,
            Some(Value::String(message.into())),
        )
    }

    /// `data` for the given operation.
    #[must_use]
    pub fn data(op_id: &str, payload: &DataPayload) -> Self {
        let payload = serde_json::to_value(payload).unwrap_or_default();
        Self::new(MessageType::Data, Some(op_id), Some(payload))
    }

    /// `error` for the given operation; each message becomes `{ "message": .. }`.
    #[must_use]
    pub fn error<I, S>(op_id: &str, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let errors = messages
            .into_iter()
            .map(|m| serde_json::json!({ "message": m.into() }))
            .collect();
        Self::new(MessageType::Error, Some(op_id), Some(Value::Array(errors)))
    }

    /// `complete` for the given operation.
    #[must_use]
    pub fn complete(op_id: &str) -> Self {
        Self::new(MessageType::Complete, Some(op_id), None)
    }

    /// Decodes the payload as `T`, treating a missing payload as `null`.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the payload does not match `T`.
    pub fn decode_payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone().unwrap_or(Value::Null))
    }
}
