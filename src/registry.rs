//! Process-local binding of topics to handler functions
//!
//! The registry is the single mutable piece of process-wide state in this crate.
//! It is written by [`register`](HandlerRegistry::register) and read by
//! [`invoke`](HandlerRegistry::invoke); bindings are never removed for the life
//! of the process and registering a topic twice silently replaces the earlier
//! handler (last-writer-wins).

use crate::BoxedError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

/// Opaque string identifying a request/response contract
///
/// Keys are process-global and case-sensitive, there is no namespacing.
pub type Topic = String;

/// Future resolving to the answer of a single handler invocation
pub type HandlerFuture = BoxFuture<'static, Result<Value, BoxedError>>;

/// Process-local function answering requests for one topic
///
/// Blanket-implemented for async closures taking the optional request payload.
pub trait Handler: Send + Sync {
    /// Produces the answer for a single request
    fn handle(&self, payload: Option<Value>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Option<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxedError>> + Send + 'static,
{
    fn handle(&self, payload: Option<Value>) -> HandlerFuture {
        (self)(payload).boxed()
    }
}

/// Mapping from [`Topic`] to the handler answering requests for it
///
/// Shared by reference between the [`Dispatcher`](crate::dispatcher::Dispatcher)
/// (which consults it for the synchronous local answer) and the
/// [`InboundRequestListener`](crate::listener::InboundRequestListener) (which
/// consults it for requests arriving from peers).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<Topic, Box<dyn Handler>>>,
}

impl HandlerRegistry {
    /// Creates a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a handler to a topic, silently replacing any earlier binding
    pub fn register<T, F, Fut>(&self, topic: T, handler: F)
    where
        T: Into<Topic>,
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxedError>> + Send + 'static,
    {
        self.handlers
            .write()
            .expect("handler registry lock poisoned")
            .insert(topic.into(), Box::new(handler));
    }

    /// Returns whether a handler is bound for the given topic
    ///
    /// Purely local lookup, no I/O.
    pub fn contains(&self, topic: &str) -> bool {
        self.handlers
            .read()
            .expect("handler registry lock poisoned")
            .contains_key(topic)
    }

    /// Starts the bound handler for a topic, handing back its answer future
    ///
    /// Returns `None` when no handler is bound. The returned future owns the
    /// invocation and may be awaited after the registry lock has been released.
    pub fn invoke(&self, topic: &str, payload: Option<Value>) -> Option<HandlerFuture> {
        self.handlers
            .read()
            .expect("handler registry lock poisoned")
            .get(topic)
            .map(|handler| handler.handle(payload))
    }
}
