//! Wire-level envelopes exchanged between pool processes
//!
//! Envelopes are serialized with [`serde_json`]; the bus itself only ever sees
//! the resulting byte frames. Field names follow the wire contract of the
//! hosting environment (camelCase).

use crate::error::WireError;
use crate::registry::Topic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Question sent to every targeted process of an aggregate operation
///
/// The correlation id is freshly generated per `dispatch` call so that
/// concurrent aggregate operations issued by the same process never
/// cross-consume each other's responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Topic identifying the request/response contract
    pub topic: Topic,
    /// Per-call id responses are correlated by
    pub correlation_id: Uuid,
    /// Opaque question payload, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Answer (or refusal) of one targeted process
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Reply channel this envelope was published on, named after the
    /// correlation id of the originating request
    pub channel: String,
    /// The verdict of the responding process
    pub payload: ResponseBody,
}

/// Verdict carried by a [`ResponseEnvelope`]
///
/// A process that cannot serve a request (no handler bound for the topic, or
/// the handler itself failed) sends an explicit negative acknowledgement so
/// the caller can tell "declined" apart from "never answered".
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// Successful answer produced by the handler
    Answer(Value),
    /// The process could not (or would not) answer
    Declined(WireError),
}
