//! Collection of the remote answers belonging to one aggregate operation

use crate::dispatcher::DispatchError;
use crate::envelope::{ResponseBody, ResponseEnvelope};
use futures::stream::BoxStream;
use futures::StreamExt;
use log::trace;
use serde_json::Value;

/// Tracks the outstanding remote targets of a single `dispatch` call
///
/// Owns the reply-channel subscription for the call's correlation id and counts
/// arriving responses against the number of targets the request was scattered
/// to. Completes exactly once, when the outstanding count reaches zero. Frames
/// are counted by arrival, not by sender; the per-call correlation id already
/// guarantees that only responses to this operation reach the channel.
///
/// Dropping the correlator drops the subscription with it, so an aggregate that
/// settles early (timeout, transport failure, decline) leaves no listener
/// behind.
pub struct ResponseCorrelator {
    responses: BoxStream<'static, Vec<u8>>,
    outstanding: usize,
}

impl ResponseCorrelator {
    /// Creates a correlator over an already-subscribed reply channel
    pub fn new(responses: BoxStream<'static, Vec<u8>>, outstanding: usize) -> Self {
        Self {
            responses,
            outstanding,
        }
    }

    /// Awaits one response per outstanding target and hands back their payloads
    ///
    /// Fails with [`DispatchError::Declined`] on the first negative
    /// acknowledgement and with [`DispatchError::Transport`] when a frame can
    /// not be parsed or the reply channel closes while targets are still
    /// outstanding. Already-collected answers are discarded in both cases.
    pub async fn collect(mut self) -> Result<Vec<Value>, DispatchError> {
        let mut answers = Vec::with_capacity(self.outstanding);

        while self.outstanding > 0 {
            let frame = self.responses.next().await.ok_or_else(|| {
                DispatchError::Transport("reply channel closed with responses outstanding".into())
            })?;

            let envelope: ResponseEnvelope = serde_json::from_slice(&frame)
                .map_err(|e| DispatchError::Transport(Box::new(e)))?;

            match envelope.payload {
                ResponseBody::Answer(value) => {
                    self.outstanding -= 1;
                    trace!(
                        "collected response on {}, {} outstanding",
                        envelope.channel,
                        self.outstanding
                    );
                    answers.push(value);
                }
                ResponseBody::Declined(error) => return Err(DispatchError::Declined(error)),
            }
        }

        Ok(answers)
    }
}
