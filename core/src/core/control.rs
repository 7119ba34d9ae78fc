// pipette/src/core/control.rs

//! Defines the control surface handed to each step.

use crate::core::context::Cursor;
use futures_util::future::BoxFuture;
use std::marker::PhantomData;
use tracing::{event, Level};

/// Handle given to a step for one invocation.
///
/// `Out` is what the step may forward to the next step, `R` is the pipe's reply type and
/// `E` the step error type.
pub struct Control<Out, R, E = crate::error::PipeError> {
  next: Cursor<R, E>,
  _forward: PhantomData<fn(Out)>,
}

impl<Out, R, E> Clone for Control<Out, R, E> {
  fn clone(&self) -> Self {
    Self {
      next: self.next.clone(),
      _forward: PhantomData,
    }
  }
}

impl<Out, R, E> Control<Out, R, E>
where
  Out: Send + 'static,
  R: Send + 'static,
  E: Send + 'static,
{
  pub(crate) fn new(next: Cursor<R, E>) -> Self {
    Self {
      next,
      _forward: PhantomData,
    }
  }

  /// Passes `value` to the next step and resolves once the rest of the chain has finished.
  ///
  /// Errors raised further down the chain come back through the returned future, so a step
  /// can recover from them or propagate them with `?`. Once any step has replied this is a
  /// no-op resolving to `Ok(())`.
  pub fn forward(&self, value: Out) -> BoxFuture<'static, Result<(), E>> {
    self.next.advance(Box::new(value))
  }

  /// Records `value` as the pipe's reply and ends the chain.
  ///
  /// The step itself keeps running; any later `forward` in this invocation does nothing.
  /// Only the first reply of an invocation is kept.
  pub fn reply(&self, value: R) {
    if !self.next.execution().record_reply(value) {
      event!(
        Level::DEBUG,
        step_index = self.next.index().saturating_sub(1),
        "Reply already recorded for this invocation; later reply dropped."
      );
    }
  }

  /// Whether some step of this invocation has already replied.
  pub fn has_replied(&self) -> bool {
    self.next.execution().has_replied()
  }
}
