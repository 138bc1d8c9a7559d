//! Contract of the external directory & transport collaborator
//!
//! The pool supervisor owning the processes is not part of this crate. The
//! correlation protocol only requires the capabilities below from it: a list of
//! living process descriptors with stable identities, best-effort delivery of
//! one-shot frames to a specific identity, named channels to subscribe to, and
//! explicit connect/disconnect lifecycle calls. There are no delivery guarantees
//! beyond best-effort and no back-pressure.

use crate::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable numeric identity of a process within the pool
///
/// Assigned by the hosting environment at process start and immutable for the
/// process's lifetime.
pub type ProcessIdentity = u32;

/// Channel namespace shared by process inboxes and per-call reply channels
pub const PROCESS_CHANNEL_PREFIX: &str = "process:";

/// Living process as enumerated by the directory
///
/// Supplied by the collaborator, never mutated by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    /// Stable numeric identity
    pub identity: ProcessIdentity,
    /// Name the process was declared under; distinct pools carry distinct names
    pub name: String,
}

impl ProcessDescriptor {
    /// Creates a new descriptor from raw parts
    pub fn new<S: Into<String>>(identity: ProcessIdentity, name: S) -> Self {
        Self {
            identity,
            name: name.into(),
        }
    }
}

/// Name of the channel on which a process receives request frames
pub fn inbound_channel(identity: ProcessIdentity) -> String {
    format!("{}{}", PROCESS_CHANNEL_PREFIX, identity)
}

/// Name of the channel on which replies to one aggregate operation arrive
pub fn reply_channel(correlation_id: &Uuid) -> String {
    format!("{}{}", PROCESS_CHANNEL_PREFIX, correlation_id)
}

/// Handle to the directory & transport service backing one process
///
/// All frame payloads are opaque bytes; serialization is the concern of the
/// protocol layer on top. Implementations route [`send_to`](ProcessBus::send_to)
/// frames to the [`inbound_channel`] of the target identity.
#[async_trait]
pub trait ProcessBus: Send + Sync {
    /// Opens the connection; must be called before any other operation
    async fn connect(&self) -> EmptyResult;

    /// Enumerates the living processes of the pool
    async fn list(&self) -> Result<Vec<ProcessDescriptor>, BoxedError>;

    /// Subscribes to a named channel, yielding every frame published on it
    ///
    /// The subscription stays live until the stream is dropped or the handle
    /// is disconnected, whichever comes first.
    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, Vec<u8>>, BoxedError>;

    /// Delivers a one-shot frame to the inbox of a specific process
    async fn send_to(&self, target: ProcessIdentity, frame: Vec<u8>) -> EmptyResult;

    /// Publishes a frame to every subscriber of a named channel
    async fn publish(&self, channel: &str, frame: Vec<u8>) -> EmptyResult;

    /// Tears the connection down, ending all subscriptions held by this handle
    ///
    /// Infallible by contract; called on every exit path of an aggregate
    /// operation.
    async fn disconnect(&self);
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derive_channel_names_from_the_shared_prefix() {
        let correlation_id = Uuid::nil();

        assert_eq!(inbound_channel(7), "process:7");
        assert_eq!(
            reply_channel(&correlation_id),
            "process:00000000-0000-0000-0000-000000000000"
        );
    }
}
