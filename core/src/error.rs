// pipette/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipeError {
  /// A value handed to a dynamic constructor or `try_extend` is neither a step nor a pipe.
  #[error("Invalid step: {value} (of type `{type_name}`) is neither a step function nor a pipe")]
  InvalidStep { value: String, type_name: String },

  /// `extend` was called on a pipe that already has listeners.
  #[error("Cannot extend a pipe with {listeners} registered listener(s); clone it before extending")]
  HasListeners { listeners: usize },

  #[error("Payload type mismatch at step {step_index} (expected {expected_type})")]
  PayloadMismatch { step_index: usize, expected_type: String },

  #[error("Error in user-provided step. Source: {source}")]
  StepFailure {
    #[source]
    source: AnyhowError,
  },
}

impl PipeError {
  pub(crate) fn invalid_step<V: std::fmt::Debug + ?Sized>(value: &V) -> Self {
    PipeError::InvalidStep {
      value: format!("{:?}", value),
      type_name: std::any::type_name::<V>().to_string(),
    }
  }
}

// Lets steps that use `PipeError` as their error type bubble up anything with `?`.
impl From<AnyhowError> for PipeError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<PipeError>() {
      Ok(pipe_err) => pipe_err,
      Err(source) => PipeError::StepFailure { source },
    }
  }
}

pub type PipeResult<T, E = PipeError> = std::result::Result<T, E>;
