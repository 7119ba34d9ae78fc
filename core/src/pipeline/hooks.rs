// pipette/src/pipeline/hooks.rs

//! Contains methods for registering listeners on a pipe: plain async closures,
//! `Subscriber` implementations, and routes into other pipes.

use crate::core::listener::{into_listener, FnSubscriber, Subscriber};
use crate::error::PipeError;
use crate::pipeline::definition::Pipe;
use async_trait::async_trait;
use std::future::Future;
use tracing::{event, Level};

impl<In, Out, R, E> Pipe<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  /// Registers an async closure as a listener.
  ///
  /// The listener receives the last forwarded value of every invocation that ends
  /// without a reply. Its error type only needs to convert into `anyhow::Error`;
  /// failures are logged and otherwise ignored.
  ///
  /// Once a pipe has listeners it can no longer be extended. Each listener gets its own
  /// clone of the value, hence `Out: Clone`.
  pub fn subscribe<F, Fut, ListenerErr>(&self, listener_fn: F)
  where
    Out: Clone,
    F: Fn(Out) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenerErr>> + Send + 'static,
    ListenerErr: Into<anyhow::Error> + 'static,
  {
    self.subscribe_with(FnSubscriber::new(listener_fn));
  }

  /// Registers a `Subscriber` implementation as a listener.
  pub fn subscribe_with<S>(&self, subscriber: S)
  where
    Out: Clone,
    S: Subscriber<Out> + 'static,
  {
    let mut listeners = self.listeners.write();
    listeners.push(into_listener(subscriber));
    event!(
      Level::DEBUG,
      num_listeners = listeners.len(),
      listener_type = %std::any::type_name::<S>(),
      "Listener registered."
    );
  }

  /// Sends every value this pipe forwards into `target`.
  ///
  /// Registers a listener on `self`; no steps are copied, and listeners already on `self`
  /// keep being notified. The route follows the live `target`, including listeners added
  /// to it later. Returns `self` so several routes can be chained.
  pub fn route_to<Next, TargetReply, TargetErr>(&self, target: &Pipe<Out, Next, TargetReply, TargetErr>) -> &Self
  where
    Out: Clone,
    Next: Send + 'static,
    TargetReply: Send + 'static,
    TargetErr: std::error::Error + From<PipeError> + Send + Sync + 'static,
  {
    self.subscribe_with(Route { target: target.share() });
    self
  }
}

/// Listener that feeds values into another pipe.
struct Route<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  target: Pipe<In, Out, R, E>,
}

#[async_trait]
impl<In, Out, R, E> Subscriber<In> for Route<In, Out, R, E>
where
  In: Send + 'static,
  Out: Send + 'static,
  R: Send + 'static,
  E: std::error::Error + From<PipeError> + Send + Sync + 'static,
{
  async fn receive(&self, value: In) -> anyhow::Result<()> {
    // The target's reply has no one to go to.
    self.target.send(value).await?;
    Ok(())
  }
}
