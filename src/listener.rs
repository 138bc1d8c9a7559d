//! Answering side of the request/response protocol

use crate::bus::{inbound_channel, reply_channel, ProcessBus, ProcessIdentity};
use crate::envelope::{RequestEnvelope, ResponseBody, ResponseEnvelope};
use crate::error::WireError;
use crate::registry::HandlerRegistry;
use crate::EmptyResult;
use futures::StreamExt;
use log::{debug, warn};
use std::sync::Arc;

/// Consumes requests addressed to this process and publishes the answers
///
/// Subscribed once, at process start, to the inbound channel of the process's
/// own identity. Every arriving [`RequestEnvelope`] is looked up in the shared
/// [`HandlerRegistry`]; the handler's answer (or an explicit negative
/// acknowledgement when the topic is unbound or the handler fails) is
/// published to the reply channel named after the request's correlation id.
///
/// Failures to answer an individual request never terminate the listener;
/// delivery is best-effort and undeliverable responses are only logged.
pub struct InboundRequestListener<B> {
    bus: B,
    registry: Arc<HandlerRegistry>,
    identity: ProcessIdentity,
}

impl<B> InboundRequestListener<B>
where
    B: ProcessBus,
{
    /// Creates a new listener for the given process identity
    pub fn new(bus: B, registry: Arc<HandlerRegistry>, identity: ProcessIdentity) -> Self {
        Self {
            bus,
            registry,
            identity,
        }
    }

    /// Serves inbound requests until the subscription ends
    ///
    /// Runs for the lifetime of the process under normal circumstances; the
    /// connection is torn down when the inbound stream terminates.
    pub async fn run(&self) -> EmptyResult {
        self.bus.connect().await?;

        // Teardown has to happen whether the subscription ends or never opens.
        let result = self.serve().await;
        self.bus.disconnect().await;
        result
    }

    async fn serve(&self) -> EmptyResult {
        let mut requests = self.bus.subscribe(&inbound_channel(self.identity)).await?;
        debug!("listening for requests addressed to process {}", self.identity);

        while let Some(frame) = requests.next().await {
            match serde_json::from_slice::<RequestEnvelope>(&frame) {
                Ok(request) => self.answer(request).await,
                Err(e) => warn!("discarding unparseable request frame: {}", e),
            }
        }

        Ok(())
    }

    async fn answer(&self, request: RequestEnvelope) {
        let channel = reply_channel(&request.correlation_id);

        let payload = match self.registry.invoke(&request.topic, request.payload) {
            Some(invocation) => match invocation.await {
                Ok(value) => ResponseBody::Answer(value),
                Err(e) => {
                    warn!("handler for `{}` failed: {}", request.topic, e);
                    ResponseBody::Declined(WireError::from_boxed(e))
                }
            },
            None => {
                warn!(
                    "no handler bound for `{}` on process {}",
                    request.topic, self.identity
                );
                ResponseBody::Declined(WireError::from_message(format!(
                    "no handler bound for `{}`",
                    request.topic
                )))
            }
        };

        let envelope = ResponseEnvelope {
            channel: channel.clone(),
            payload,
        };

        // ResponseEnvelope serialization is infallible for the types involved,
        // delivery is not.
        match serde_json::to_vec(&envelope) {
            Ok(frame) => {
                if let Err(e) = self.bus.publish(&channel, frame).await {
                    warn!("response for `{}` undeliverable: {}", request.topic, e);
                }
            }
            Err(e) => warn!("response for `{}` unserializable: {}", request.topic, e),
        }
    }
}
