// pipette/src/pipeline/definition.rs

//! Contains the `Pipe<In, Out, R, E>` struct definition and its construction and
//! structural composition (`extend`, `clone`).

use crate::core::context::ErasedStep;
use crate::core::control::Control;
use crate::core::listener::Listener;
use crate::core::step::{IntoSteps, Step};
use crate::error::{PipeError, PipeResult};
use parking_lot::RwLock;
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

/// An ordered sequence of steps plus the listeners observing its output.
///
/// - `In`: payload accepted by `send`.
/// - `Out`: type of the last forwarded value, which listeners receive.
/// - `R`: reply type shared by every step.
/// - `E`: step error type. It must be `From<PipeError>` so that the internal payload
///   guard can report through it.
///
/// The step sequence is immutable and shared between every invocation and every pipe
/// derived through `clone`. Cloning gives a pipe with no listeners.
pub struct Pipe<In, Out, R, E = PipeError>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  /// Ordered, type-erased steps. Execution order is insertion order.
  pub(crate) steps: Arc<[ErasedStep<R, E>]>,

  /// Listeners notified with the last forwarded value when no step replied.
  pub(crate) listeners: Arc<RwLock<Vec<Listener<Out>>>>,

  _io: PhantomData<fn(In) -> Out>,
}

impl<In, Out, R, E> Pipe<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  /// Creates a pipe from a single step function.
  pub fn new<F, Fut>(step_fn: F) -> Self
  where
    F: Fn(In, Control<Out, R, E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
  {
    Self::from(Step::new(step_fn))
  }

  /// Creates a pipe from a value only known at runtime.
  ///
  /// Accepts a `Step<In, Out, R, E>` or a `Pipe<In, Out, R, E>` (whose steps are copied,
  /// not its listeners). Anything else is rejected with `PipeError::InvalidStep`, whose
  /// message shows the value's `Debug` form.
  pub fn try_new<V>(value: V) -> PipeResult<Self>
  where
    V: Any + std::fmt::Debug,
  {
    let any: &dyn Any = &value;
    if let Some(step) = any.downcast_ref::<Step<In, Out, R, E>>() {
      return Ok(Self::from(step.clone()));
    }
    if let Some(pipe) = any.downcast_ref::<Pipe<In, Out, R, E>>() {
      return Ok(pipe.clone());
    }
    let err = PipeError::invalid_step(&value);
    event!(Level::ERROR, error = %err, "Rejected pipe construction.");
    Err(err)
  }

  pub(crate) fn from_steps(steps: Vec<ErasedStep<R, E>>) -> Self {
    Self {
      steps: steps.into(),
      listeners: Arc::new(RwLock::new(Vec::new())),
      _io: PhantomData,
    }
  }

  /// A second handle to this very pipe: same steps and the same listener list.
  pub(crate) fn share(&self) -> Self {
    Self {
      steps: Arc::clone(&self.steps),
      listeners: Arc::clone(&self.listeners),
      _io: PhantomData,
    }
  }

  /// Number of steps in the sequence.
  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn listener_count(&self) -> usize {
    self.listeners.read().len()
  }

  /// Fails if this pipe is already being observed. Extending it would silently change
  /// what its output means to those listeners.
  fn ensure_no_listeners(&self) -> PipeResult<()> {
    let listeners = self.listener_count();
    if listeners > 0 {
      let err = PipeError::HasListeners { listeners };
      event!(Level::ERROR, error = %err, "Rejected extend.");
      return Err(err);
    }
    Ok(())
  }

  // --- Composition ---

  /// Returns a new pipe running this pipe's steps followed by `next`.
  ///
  /// `next` is a bare `Step` or another pipe, whose steps are spliced in flat. Neither
  /// operand is modified and the new pipe starts without listeners. Fails with
  /// `PipeError::HasListeners` if this pipe has listeners; clone it first.
  pub fn extend<S>(&self, next: S) -> PipeResult<Pipe<In, S::Output, R, E>>
  where
    S: IntoSteps<R, E, Input = Out>,
    S::Output: Send + 'static,
  {
    self.ensure_no_listeners()?;
    let steps: Vec<ErasedStep<R, E>> = self.steps.iter().cloned().chain(next.into_steps()).collect();
    event!(Level::DEBUG, num_steps = steps.len(), "Pipe extended.");
    Ok(Pipe::from_steps(steps))
  }

  /// Like `extend`, for a value only known at runtime.
  ///
  /// The value must be a `Step<Out, Next, R, E>` or a `Pipe<Out, Next, R, E>`, otherwise
  /// this fails with `PipeError::InvalidStep`.
  pub fn try_extend<Next, V>(&self, value: V) -> PipeResult<Pipe<In, Next, R, E>>
  where
    Next: Send + 'static,
    V: Any + std::fmt::Debug,
  {
    let any: &dyn Any = &value;
    if let Some(step) = any.downcast_ref::<Step<Out, Next, R, E>>() {
      return self.extend(step.clone());
    }
    if let Some(pipe) = any.downcast_ref::<Pipe<Out, Next, R, E>>() {
      return self.extend(pipe);
    }
    let err = PipeError::invalid_step(&value);
    event!(Level::ERROR, error = %err, "Rejected extend.");
    Err(err)
  }
}

impl<T, R, E> Pipe<T, T, R, E>
where
  T: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  /// A pipe with no steps: every payload goes straight to the listeners.
  pub fn passthrough() -> Self {
    Self::from_steps(Vec::new())
  }
}

impl<In, Out, R, E> From<Step<In, Out, R, E>> for Pipe<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  fn from(step: Step<In, Out, R, E>) -> Self {
    Self::from_steps(step.into_steps())
  }
}

/// Copies the step sequence; the clone starts with no listeners.
impl<In, Out, R, E> Clone for Pipe<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    Self {
      steps: Arc::clone(&self.steps),
      listeners: Arc::new(RwLock::new(Vec::new())),
      _io: PhantomData,
    }
  }
}

impl<In, Out, R, E> std::fmt::Debug for Pipe<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipe")
      .field("num_steps", &self.steps.len())
      .field("num_listeners", &self.listener_count())
      .finish()
  }
}

impl<In, Out, R, E> IntoSteps<R, E> for Pipe<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  type Input = In;
  type Output = Out;

  fn into_steps(self) -> Vec<ErasedStep<R, E>> {
    self.steps.iter().cloned().collect()
  }
}

impl<In, Out, R, E> IntoSteps<R, E> for &Pipe<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  type Input = In;
  type Output = Out;

  fn into_steps(self) -> Vec<ErasedStep<R, E>> {
    self.steps.iter().cloned().collect()
  }
}
