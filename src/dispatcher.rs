//! Scatter-gather entry point of the correlation protocol

use crate::bus::{reply_channel, ProcessBus, ProcessDescriptor, ProcessIdentity};
use crate::correlator::ResponseCorrelator;
use crate::envelope::RequestEnvelope;
use crate::error::WireError;
use crate::registry::{HandlerRegistry, Topic};
use crate::BoxedError;
use futures::future;
use log::debug;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

/// Deadline applied to an aggregate operation when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Predicate selecting the processes an aggregate operation targets
pub type ProcessFilter = Box<dyn Fn(&ProcessDescriptor) -> bool + Send + Sync>;

/// Error type for aggregate operations
///
/// There is no partial-success mode: every variant discards any answers that
/// were already collected.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The calling process has no handler bound for the topic; detected
    /// pre-flight, before any transport I/O
    #[error("no handler registered for topic `{0}`")]
    HandlerNotFound(Topic),
    /// Connecting, listing, subscribing or sending failed, or a response
    /// frame was not receivable
    #[error("transport operation failed")]
    Transport(#[source] BoxedError),
    /// The deadline elapsed with at least one target still unanswered
    #[error("aggregate deadline of {0:?} elapsed with responses outstanding")]
    Timeout(Duration),
    /// A targeted process (or the local handler) answered negatively
    #[error("a targeted process declined the request")]
    Declined(#[source] WireError),
}

/// Configuration surface of a single [`dispatch`](Dispatcher::dispatch) call
pub struct DispatchOptions {
    /// Target selection predicate; `None` selects every process sharing the
    /// caller's declared name, so distinct pools don't cross-talk by default
    pub filter: Option<ProcessFilter>,
    /// Deadline for the whole aggregate, measured from the start of the call
    pub timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            filter: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DispatchOptions {
    /// Replaces the target selection predicate
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ProcessDescriptor) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Replaces the aggregate deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fans a request out to all matching pool processes and gathers the answers
///
/// One `dispatch` call resolves the target set from the directory, answers the
/// "self" partition synchronously through the shared [`HandlerRegistry`],
/// scatters request envelopes to the remote partition, and races the whole
/// exchange, transport calls included, against a single deadline. A fresh
/// connection handle is cloned off the supplied bus for every call and torn
/// down on every exit path;
/// implementations of [`ProcessBus`] must hand out independent sessions on
/// clone.
pub struct Dispatcher<B> {
    bus: B,
    registry: Arc<HandlerRegistry>,
    identity: ProcessIdentity,
    name: String,
}

impl<B> Dispatcher<B>
where
    B: ProcessBus + Clone,
{
    /// Creates a dispatcher for the process with the given identity and name
    pub fn new<S: Into<String>>(
        bus: B,
        registry: Arc<HandlerRegistry>,
        identity: ProcessIdentity,
        name: S,
    ) -> Self {
        Self {
            bus,
            registry,
            identity,
            name: name.into(),
        }
    }

    /// Asks every process matching the filter the question behind `topic` and
    /// collects all answers within the configured deadline
    ///
    /// Fails fast with [`DispatchError::HandlerNotFound`] when the caller
    /// itself has no handler bound for the topic, before the transport is
    /// contacted and regardless of whether the filter would select the caller.
    ///
    /// On success the returned `Vec` holds exactly one answer per selected
    /// process; its element order is unspecified and must be treated as an
    /// unordered multiset.
    pub async fn dispatch(
        &self,
        topic: &str,
        payload: Option<Value>,
        options: DispatchOptions,
    ) -> Result<Vec<Value>, DispatchError> {
        if !self.registry.contains(topic) {
            return Err(DispatchError::HandlerNotFound(topic.to_owned()));
        }

        let deadline = Instant::now() + options.timeout;
        let session = self.bus.clone();

        // The deadline covers every transport call; only teardown runs
        // outside it.
        let result = timeout_at(deadline, async {
            session.connect().await.map_err(DispatchError::Transport)?;
            self.scatter(&session, topic, payload, &options).await
        })
        .await
        .unwrap_or(Err(DispatchError::Timeout(options.timeout)));

        session.disconnect().await;
        result
    }

    async fn scatter(
        &self,
        session: &B,
        topic: &str,
        payload: Option<Value>,
        options: &DispatchOptions,
    ) -> Result<Vec<Value>, DispatchError> {
        let descriptors = session.list().await.map_err(DispatchError::Transport)?;

        let matched: Vec<ProcessDescriptor> = descriptors
            .into_iter()
            .filter(|descriptor| match &options.filter {
                Some(filter) => filter(descriptor),
                None => descriptor.name == self.name,
            })
            .collect();

        let selected_self = matched
            .iter()
            .any(|descriptor| descriptor.identity == self.identity);
        let targets: Vec<ProcessIdentity> = matched
            .iter()
            .map(|descriptor| descriptor.identity)
            .filter(|&identity| identity != self.identity)
            .collect();

        debug!(
            "scattering `{}` to {} remote target(s), self selected: {}",
            topic,
            targets.len(),
            selected_self
        );

        // The registry is append-only, so the pre-flight check in `dispatch`
        // still holds here.
        let local_invocation = match selected_self {
            true => self.registry.invoke(topic, payload.clone()),
            false => None,
        };

        // Subscribe before sending so no reply can slip past the correlator.
        let correlator = match targets.is_empty() {
            true => None,
            false => {
                let correlation_id = Uuid::new_v4();
                let responses = session
                    .subscribe(&reply_channel(&correlation_id))
                    .await
                    .map_err(DispatchError::Transport)?;

                let envelope = RequestEnvelope {
                    topic: topic.to_owned(),
                    correlation_id,
                    payload,
                };
                let frame = serde_json::to_vec(&envelope)
                    .map_err(|e| DispatchError::Transport(Box::new(e)))?;

                for target in &targets {
                    session
                        .send_to(*target, frame.clone())
                        .await
                        .map_err(DispatchError::Transport)?;
                }

                Some(ResponseCorrelator::new(responses, targets.len()))
            }
        };

        let local = async move {
            match local_invocation {
                Some(invocation) => invocation
                    .await
                    .map(Some)
                    .map_err(|e| DispatchError::Declined(WireError::from_boxed(e))),
                None => Ok(None),
            }
        };

        let remote = async move {
            match correlator {
                Some(correlator) => correlator.collect().await,
                None => Ok(Vec::new()),
            }
        };

        let (own_answer, mut answers) = future::try_join(local, remote).await?;

        if let Some(answer) = own_answer {
            answers.push(answer);
        }

        Ok(answers)
    }
}
