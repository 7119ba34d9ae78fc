// pipette/examples/basic_pipe.rs

use pipette::{forwarding, replying, PipeError, Pipe};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct Order {
  id: u32,
  quantity: u32,
  unit_price_cents: u64,
}

#[tokio::main]
async fn main() -> Result<(), PipeError> {
  // RUST_LOG=pipette=debug shows every step as it runs.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  info!("--- Basic Pipe Example ---");

  // 1. A first step that validates, replying early for orders it rejects.
  let validate = Pipe::<Order, Order, String>::new(|order, control| async move {
    if order.quantity == 0 {
      control.reply(format!("order {} rejected: empty", order.id));
      return Ok(());
    }
    control.forward(order).await
  });

  // 2. Grow it. Every extend returns a new pipe; `validate` stays usable on its own.
  let checkout = validate
    .extend(forwarding(|order: Order| async move {
      Ok::<_, PipeError>(order.quantity as u64 * order.unit_price_cents)
    }))?
    .extend(replying(|total_cents: u64| async move {
      Ok::<_, PipeError>(format!("total: {}.{:02}", total_cents / 100, total_cents % 100))
    }))?;

  // 3. Run it.
  for order in [
    Order { id: 1, quantity: 3, unit_price_cents: 1250 },
    Order { id: 2, quantity: 0, unit_price_cents: 999 },
  ] {
    let reply = checkout.send(order).await?;
    info!(?reply, "Order processed.");
  }

  // `validate` on its own never replies for a good order.
  let reply = validate
    .send(Order { id: 3, quantity: 1, unit_price_cents: 100 })
    .await?;
  info!(?reply, "Validation only.");

  Ok(())
}
