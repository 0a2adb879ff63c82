use std::any::{Any, type_name};

use snafu::{OptionExt, Snafu};

/// The boxed error type run functions report their own failures with.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error a run function or run condition returns.
#[derive(Debug, Snafu)]
pub enum PhaseError {
    /// The context handed to the phase does not provide the capabilities the
    /// phase needs. This is a wiring error of the caller.
    #[snafu(display("phase invoked with an invalid data struct, expected {expected}"))]
    InvalidContext { expected: &'static str },

    #[snafu(display("{message}"))]
    Failed { message: String, source: BoxedError },
}

impl PhaseError {
    /// Wraps an error reported by a phase's collaborators.
    pub fn failed(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Failed {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// The context shared by all phases of one run.
///
/// Every `'static` type is a `RunData`. Phases recover the concrete context
/// with [`downcast_data`] or [`downcast_data_mut`].
pub trait RunData: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> RunData for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Asserts that `data` is a `T`.
pub fn downcast_data<T: Any>(data: &dyn RunData) -> Result<&T, PhaseError> {
    data.as_any()
        .downcast_ref::<T>()
        .context(InvalidContextSnafu {
            expected: type_name::<T>(),
        })
}

/// Asserts that `data` is a `T`, returning it mutably.
pub fn downcast_data_mut<T: Any>(data: &mut dyn RunData) -> Result<&mut T, PhaseError> {
    data.as_any_mut()
        .downcast_mut::<T>()
        .context(InvalidContextSnafu {
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct JoinContext {
        node_name: String,
    }

    #[test]
    fn downcast_to_concrete_context() {
        let mut context = JoinContext {
            node_name: "worker-1".to_owned(),
        };
        let data: &mut dyn RunData = &mut context;

        let context = downcast_data_mut::<JoinContext>(data).expect("context must downcast");
        context.node_name.push_str("-renamed");
        assert_eq!(context.node_name, "worker-1-renamed");
    }

    #[test]
    fn wrong_context_is_rejected() {
        let data: &dyn RunData = &42u8;

        let err = downcast_data::<JoinContext>(data).expect_err("u8 is no join context");
        assert!(matches!(err, PhaseError::InvalidContext { expected } if expected.ends_with("JoinContext")));
    }
}
