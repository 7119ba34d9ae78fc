// pipette/src/pipeline/execution.rs

//! Contains `Pipe::send` and `Pipe::blocking_send`, which run the step chain for one payload.

use crate::core::context::{downcast_payload, Cursor, Execution, Payload, Terminal};
use crate::core::listener::notify;
use crate::error::PipeError;
use crate::pipeline::definition::Pipe;
use futures_util::future::{self, FutureExt};
use std::sync::Arc;
use tracing::{event, instrument, Instrument, Level};

/// How listeners are notified once the step chain finishes without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
  /// Wait for every listener to settle before the send resolves.
  Blocking,
  /// Start notification in the background and resolve immediately.
  Detached,
}

impl<In, Out, R, E> Pipe<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  /// Runs `payload` through the steps and resolves to the reply, or `None` if no step replied.
  ///
  /// Listeners are notified in the background on the current Tokio runtime; this call does
  /// not wait for them. Outside a runtime they are notified inline instead.
  ///
  /// Errors returned by steps come back unchanged.
  #[instrument(
    name = "Pipe::send",
    skip_all,
    fields(num_steps = self.steps.len(), reply_type = %std::any::type_name::<R>()),
    err(Display)
  )]
  pub async fn send(&self, payload: In) -> Result<Option<R>, E> {
    self.dispatch(payload, Delivery::Detached).await
  }

  /// Like `send`, but resolves only after every listener has finished or failed.
  #[instrument(
    name = "Pipe::blocking_send",
    skip_all,
    fields(num_steps = self.steps.len(), reply_type = %std::any::type_name::<R>()),
    err(Display)
  )]
  pub async fn blocking_send(&self, payload: In) -> Result<Option<R>, E> {
    self.dispatch(payload, Delivery::Blocking).await
  }

  async fn dispatch(&self, payload: In, delivery: Delivery) -> Result<Option<R>, E> {
    event!(Level::DEBUG, ?delivery, "Pipe invocation starting.");

    // Fresh per invocation: concurrent sends never see each other's reply.
    let execution = Arc::new(Execution::new(self.terminal(delivery)));
    let cursor = Cursor::start(Arc::clone(&self.steps), Arc::clone(&execution));

    if let Err(err) = cursor.advance(Box::new(payload)).await {
      event!(Level::ERROR, error = %err, "Step chain failed.");
      return Err(err);
    }

    let reply = execution.take_reply();
    event!(Level::DEBUG, replied = reply.is_some(), "Pipe invocation finished.");
    Ok(reply)
  }

  /// Builds the continuation that runs after the last step: hand the final value to the
  /// listeners registered at that moment.
  fn terminal(&self, delivery: Delivery) -> Terminal<E> {
    let listeners = Arc::clone(&self.listeners);
    let step_index = self.steps.len();

    Arc::new(move |payload: Payload| {
      let value = match downcast_payload::<Out, E>(payload, step_index) {
        Ok(value) => value,
        Err(err) => return future::ready(Err(err)).boxed(),
      };
      // Snapshot so no lock guard lives across an await.
      let subscribers = listeners.read().clone();
      if subscribers.is_empty() {
        event!(Level::TRACE, "No listeners to notify.");
        return future::ready(Ok(())).boxed();
      }

      let fan_out = notify(subscribers, value);
      match delivery {
        Delivery::Blocking => async move {
          fan_out.await;
          Ok(())
        }
        .boxed(),
        Delivery::Detached => match tokio::runtime::Handle::try_current() {
          Ok(handle) => {
            handle.spawn(fan_out.in_current_span());
            future::ready(Ok(())).boxed()
          }
          Err(_) => {
            event!(Level::WARN, "No Tokio runtime available; notifying listeners inline.");
            async move {
              fan_out.await;
              Ok(())
            }
            .boxed()
          }
        },
      }
    })
  }
}
