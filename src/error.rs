//! Errors that can cross process boundaries

use crate::BoxedError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Type erased, serializable error which retains the error chain information
///
/// Remote handlers run in a different process than the caller that is waiting for
/// their answer. When such a handler fails, the concrete error type can not cross
/// the process boundary, so this structure flattens it into its chain of display
/// messages so that a negative acknowledgement can carry it over the wire and the
/// requesting side can still surface a meaningful trace.
///
/// When the source chain of the converted error already contains a [`WireError`],
/// its causes are spliced in so the top-most instance holds one flat trace.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct WireError {
    causes: Vec<String>,
}

impl WireError {
    /// Creates a new instance from any error type
    pub fn new<E: Error + 'static>(error: E) -> Self {
        (&error as &(dyn Error + 'static)).into()
    }

    /// Creates a new instance from a boxed error type
    pub fn from_boxed(error: BoxedError) -> Self {
        (error.as_ref() as &(dyn Error + 'static)).into()
    }

    /// Creates a new instance from a bare message with no further causes
    pub fn from_message<S: Into<String>>(message: S) -> Self {
        Self {
            causes: vec![message.into()],
        }
    }
}

impl Error for WireError {}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.causes.split_first() {
            Some((first, rest)) => {
                write!(f, "{}", first)?;

                for cause in rest {
                    write!(f, ": {}", cause)?;
                }

                Ok(())
            }
            None => write!(f, "unknown error"),
        }
    }
}

impl From<&(dyn Error + 'static)> for WireError {
    fn from(error: &(dyn Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut current: Option<&(dyn Error + 'static)> = Some(error);

        while let Some(error) = current {
            match error.downcast_ref::<WireError>() {
                Some(wire_error) => causes.extend(wire_error.causes.iter().cloned()),
                None => causes.push(error.to_string()),
            }

            current = error.source();
        }

        Self { causes }
    }
}
