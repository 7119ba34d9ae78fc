// pipette/src/core/context.rs

//! Per-invocation execution state and the cursor that walks a pipe's step sequence.
//!
//! Every `send`/`blocking_send` builds one `Execution` (reply flag, reply slot and the
//! terminal continuation) and threads it through a `Cursor`. The step sequence itself is
//! shared read-only between all invocations of a pipe.

use crate::error::PipeError;
use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{event, span, Instrument, Level};

/// A value travelling between two steps, with its concrete type erased.
pub type Payload = Box<dyn Any + Send>;

/// The future every step (and the terminal continuation) resolves to.
pub type StepFuture<E> = BoxFuture<'static, Result<(), E>>;

/// A step after type erasure. It receives the erased payload and a cursor positioned
/// at the step that follows it.
pub type ErasedStep<R, E> = Arc<dyn Fn(Payload, Cursor<R, E>) -> StepFuture<E> + Send + Sync>;

/// Runs once the step sequence is exhausted without a reply (listener notification).
pub(crate) type Terminal<E> = Arc<dyn Fn(Payload) -> StepFuture<E> + Send + Sync>;

/// Mutable state owned by a single invocation.
pub(crate) struct Execution<R, E> {
  replied: AtomicBool,
  reply: Mutex<Option<R>>,
  terminal: Terminal<E>,
}

impl<R, E> Execution<R, E> {
  pub(crate) fn new(terminal: Terminal<E>) -> Self {
    Self {
      replied: AtomicBool::new(false),
      reply: Mutex::new(None),
      terminal,
    }
  }

  pub(crate) fn has_replied(&self) -> bool {
    self.replied.load(Ordering::Acquire)
  }

  /// Records `value` as the reply. Returns `false` if a reply was already recorded,
  /// in which case `value` is dropped.
  pub(crate) fn record_reply(&self, value: R) -> bool {
    let mut slot = self.reply.lock();
    if self.replied.swap(true, Ordering::AcqRel) {
      return false;
    }
    *slot = Some(value);
    true
  }

  pub(crate) fn take_reply(&self) -> Option<R> {
    self.reply.lock().take()
  }
}

/// Position inside one invocation: which step runs next, and the execution it belongs to.
///
/// Opaque outside the crate; steps only ever see it through `Control`.
pub struct Cursor<R, E> {
  steps: Arc<[ErasedStep<R, E>]>,
  index: usize,
  execution: Arc<Execution<R, E>>,
}

// Manual impl: deriving would demand `R: Clone` and `E: Clone`.
impl<R, E> Clone for Cursor<R, E> {
  fn clone(&self) -> Self {
    Self {
      steps: Arc::clone(&self.steps),
      index: self.index,
      execution: Arc::clone(&self.execution),
    }
  }
}

impl<R, E> Cursor<R, E>
where
  R: Send + 'static,
  E: Send + 'static,
{
  pub(crate) fn start(steps: Arc<[ErasedStep<R, E>]>, execution: Arc<Execution<R, E>>) -> Self {
    Self {
      steps,
      index: 0,
      execution,
    }
  }

  /// Index of the step this cursor will run next.
  pub(crate) fn index(&self) -> usize {
    self.index
  }

  pub(crate) fn execution(&self) -> &Execution<R, E> {
    &self.execution
  }

  /// Hands `payload` to the step at this position, or to the terminal continuation once
  /// the sequence is exhausted. A no-op once the execution has replied.
  pub(crate) fn advance(&self, payload: Payload) -> StepFuture<E> {
    if self.execution.has_replied() {
      event!(Level::TRACE, step_index = self.index, "Forward after reply ignored.");
      return future::ready(Ok(())).boxed();
    }

    match self.steps.get(self.index) {
      Some(step) => {
        let next = Cursor {
          steps: Arc::clone(&self.steps),
          index: self.index + 1,
          execution: Arc::clone(&self.execution),
        };
        let step_span = span!(Level::DEBUG, "pipe_step", step_index = self.index);
        event!(parent: &step_span, Level::TRACE, "Running step.");
        step(payload, next).instrument(step_span).boxed()
      }
      None => {
        event!(Level::TRACE, num_steps = self.steps.len(), "Step sequence exhausted.");
        (self.execution.terminal)(payload)
      }
    }
  }
}

/// Recovers the concrete value from an erased payload.
///
/// The typed API guarantees the types line up, so a mismatch indicates a bug in the
/// erasure itself and is reported as `PipeError::PayloadMismatch`.
pub(crate) fn downcast_payload<T, E>(payload: Payload, step_index: usize) -> Result<T, E>
where
  T: 'static,
  E: From<PipeError>,
{
  match payload.downcast::<T>() {
    Ok(value) => Ok(*value),
    Err(_) => Err(E::from(PipeError::PayloadMismatch {
      step_index,
      expected_type: std::any::type_name::<T>().to_string(),
    })),
  }
}
