//! Scatter-gather request/response between processes of a supervised worker pool.
//!
//! Every process in the pool may ask "all processes matching a predicate" a question
//! identified by a topic and collect the answers, its own included, within a single
//! bounded time window. The pool itself (supervision, process enumeration, envelope
//! delivery) is an external collaborator modelled by the [`ProcessBus`](bus::ProcessBus)
//! trait; this crate contributes the correlation protocol on top of it:
//!
//! - [`HandlerRegistry`](registry::HandlerRegistry) binds topics to process-local handlers
//! - [`InboundRequestListener`](listener::InboundRequestListener) answers requests arriving
//!   from peers
//! - [`ResponseCorrelator`](correlator::ResponseCorrelator) gathers the replies of one
//!   aggregate operation
//! - [`Dispatcher`](dispatcher::Dispatcher) fans a request out, merges the synchronous
//!   local answer with the asynchronous remote ones and settles the aggregate under one
//!   deadline
//!
//! A complete in-process bus implementation backed by tokio channels is available in the
//! [`implementation`] module.
//!
//! ```ignore
//! let registry = Arc::new(HandlerRegistry::new());
//! registry.register("ping", |_payload| async { Ok(json!("pong")) });
//!
//! let dispatcher = Dispatcher::new(bus, registry, identity, "worker");
//! let answers = dispatcher
//!     .dispatch("ping", None, DispatchOptions::default())
//!     .await?;
//! ```

#![deny(missing_docs)]

pub mod bus;
pub mod correlator;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod implementation;
pub mod listener;
pub mod registry;

pub use bus::{ProcessBus, ProcessDescriptor, ProcessIdentity};
pub use dispatcher::{DispatchError, DispatchOptions, Dispatcher};
pub use error::WireError;
pub use listener::InboundRequestListener;
pub use registry::{HandlerRegistry, Topic};

/// Generic error type
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result with no value and a [`BoxedError`]
pub type EmptyResult = Result<(), BoxedError>;
