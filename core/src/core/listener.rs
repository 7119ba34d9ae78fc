// pipette/src/core/listener.rs

//! Listeners observe the last value a pipe forwards. They run side by side, and
//! nothing they do (failing or panicking included) reaches the pipe or each other.

use async_trait::async_trait;
use futures_util::future::{join_all, BoxFuture, FutureExt};
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{event, Level};

/// A passive observer of a pipe's output.
///
/// Closures are registered through `Pipe::subscribe`; implement this trait directly for
/// listeners that carry their own state.
#[async_trait]
pub trait Subscriber<T>: Send + Sync
where
  T: Send + 'static,
{
  async fn receive(&self, value: T) -> anyhow::Result<()>;
}

/// A registered listener. It takes its own copy of the value when called, so only pipes
/// that actually have listeners need a cloneable output.
pub(crate) type Listener<T> = Arc<dyn Fn(&T) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

pub(crate) fn into_listener<T, S>(subscriber: S) -> Listener<T>
where
  T: Clone + Send + 'static,
  S: Subscriber<T> + 'static,
{
  let subscriber = Arc::new(subscriber);
  Arc::new(move |value: &T| {
    let subscriber = Arc::clone(&subscriber);
    let value = value.clone();
    async move { subscriber.receive(value).await }.boxed()
  })
}

/// Adapts an async closure to `Subscriber`.
pub(crate) struct FnSubscriber<T, F> {
  listener_fn: F,
  _value: PhantomData<fn(T)>,
}

impl<T, F> FnSubscriber<T, F> {
  pub(crate) fn new(listener_fn: F) -> Self {
    Self {
      listener_fn,
      _value: PhantomData,
    }
  }
}

#[async_trait]
impl<T, F, Fut, ListenerErr> Subscriber<T> for FnSubscriber<T, F>
where
  T: Send + 'static,
  F: Fn(T) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<(), ListenerErr>> + Send + 'static,
  ListenerErr: Into<anyhow::Error> + 'static,
{
  async fn receive(&self, value: T) -> anyhow::Result<()> {
    (self.listener_fn)(value).await.map_err(Into::into)
  }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Settlement {
  pub(crate) delivered: usize,
  pub(crate) failed: usize,
}

/// Invokes every listener with its own copy of `value`, all concurrently, and resolves
/// once each of them has either finished or failed.
pub(crate) async fn notify<T>(listeners: Vec<Listener<T>>, value: T) -> Settlement
where
  T: Send + 'static,
{
  let deliveries: Vec<_> = listeners
    .iter()
    .enumerate()
    .map(|(listener_index, listener)| deliver(listener_index, listener(&value)))
    .collect();
  drop(value);

  let settlement = join_all(deliveries)
    .await
    .into_iter()
    .fold(Settlement::default(), |mut acc, ok| {
      if ok {
        acc.delivered += 1;
      } else {
        acc.failed += 1;
      }
      acc
    });

  event!(
    Level::DEBUG,
    delivered = settlement.delivered,
    failed = settlement.failed,
    "Listener fan-out settled."
  );
  settlement
}

/// Runs one listener. Errors and panics are logged and reported as `false`.
async fn deliver(listener_index: usize, reception: BoxFuture<'static, anyhow::Result<()>>) -> bool {
  match AssertUnwindSafe(reception).catch_unwind().await {
    Ok(Ok(())) => true,
    Ok(Err(err)) => {
      event!(Level::WARN, listener_index, error = %err, "Listener failed.");
      false
    }
    Err(_) => {
      event!(Level::WARN, listener_index, "Listener panicked.");
      false
    }
  }
}
