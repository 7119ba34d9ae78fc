// pipette/src/core/step.rs

//! Defines a single step of a pipe, the helpers that build common steps, and the
//! identity check for "is this value usable as a step".

use crate::core::context::{downcast_payload, Cursor, ErasedStep, Payload};
use crate::core::control::Control;
use crate::error::PipeError;
use crate::pipeline::definition::Pipe;
use futures_util::future::{self, BoxFuture, FutureExt};
use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

/// Boxed form of a step handler.
pub type StepFn<In, Out, R, E> = Arc<dyn Fn(In, Control<Out, R, E>) -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

/// A bare step: an async function of the incoming payload and a `Control`.
///
/// The step decides what happens next by calling `control.forward(..)`, `control.reply(..)`,
/// or neither (which ends the chain without a reply).
pub struct Step<In, Out, R, E = PipeError> {
  handler: StepFn<In, Out, R, E>,
}

impl<In, Out, R, E> Clone for Step<In, Out, R, E> {
  fn clone(&self) -> Self {
    Self {
      handler: Arc::clone(&self.handler),
    }
  }
}

impl<In, Out, R, E> std::fmt::Debug for Step<In, Out, R, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Step")
      .field("input", &std::any::type_name::<In>())
      .field("forwards", &std::any::type_name::<Out>())
      .field("replies", &std::any::type_name::<R>())
      .finish()
  }
}

impl<In, Out, R, E> Step<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  pub fn new<F, Fut>(handler_fn: F) -> Self
  where
    F: Fn(In, Control<Out, R, E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
  {
    Self {
      handler: Arc::new(move |input: In, control: Control<Out, R, E>| handler_fn(input, control).boxed()),
    }
  }

  /// Wraps the typed handler so it can sit in a heterogeneous step sequence.
  pub(crate) fn erase(self) -> ErasedStep<R, E> {
    let handler = self.handler;
    Arc::new(move |payload: Payload, next: Cursor<R, E>| {
      match downcast_payload::<In, E>(payload, next.index().saturating_sub(1)) {
        Ok(input) => handler(input, Control::new(next)),
        Err(err) => future::ready(Err(err)).boxed(),
      }
    })
  }
}

/// Builds a step that always forwards whatever `handler_fn` resolves to.
///
/// The step never replies, so it fits a pipe of any reply type.
pub fn forwarding<In, Out, R, E, F, Fut>(handler_fn: F) -> Step<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
  F: Fn(In) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Out, E>> + Send + 'static,
{
  Step::new(move |input: In, control: Control<Out, R, E>| {
    let work = handler_fn(input);
    async move {
      let value = work.await?;
      control.forward(value).await
    }
  })
}

/// Builds a step that always replies with whatever `handler_fn` resolves to.
///
/// The step never forwards; its forward type is `Infallible`.
pub fn replying<In, R, E, F, Fut>(handler_fn: F) -> Step<In, Infallible, R, E>
where
  In: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
  F: Fn(In) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<R, E>> + Send + 'static,
{
  Step::new(move |input: In, control: Control<Infallible, R, E>| {
    let work = handler_fn(input);
    async move {
      control.reply(work.await?);
      Ok(())
    }
  })
}

/// Anything that contributes steps when a pipe is extended: a bare `Step` or a whole `Pipe`,
/// whose steps are spliced in flat.
pub trait IntoSteps<R, E> {
  /// The payload type the first contributed step accepts.
  type Input;
  /// The type the last contributed step forwards.
  type Output;

  fn into_steps(self) -> Vec<ErasedStep<R, E>>;
}

impl<In, Out, R, E> IntoSteps<R, E> for Step<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  type Input = In;
  type Output = Out;

  fn into_steps(self) -> Vec<ErasedStep<R, E>> {
    vec![self.erase()]
  }
}

/// True if `value` can be used as a step of shape `In -> Out` in a pipe replying `R`:
/// either a `Step<In, Out, R, E>` or a `Pipe<In, Out, R, E>`.
pub fn is_step<In, Out, R, E>(value: &dyn Any) -> bool
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  value.is::<Step<In, Out, R, E>>() || value.is::<Pipe<In, Out, R, E>>()
}
