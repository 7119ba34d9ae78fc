// pipette/examples/fan_out.rs

use pipette::{forwarding, Pipe, PipeError};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), PipeError> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  info!("--- Fan-out Example ---");

  let normalize = Pipe::<String, String, ()>::from(forwarding(|raw: String| async move {
    Ok::<_, PipeError>(raw.trim().to_lowercase())
  }));

  // Downstream pipes fed by `route_to`.
  let audit = Pipe::<String, String, ()>::passthrough();
  audit.subscribe(|event: String| async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    info!(%event, "audit log written");
    Ok::<(), PipeError>(())
  });
  let metrics = Pipe::<String, usize, ()>::from(forwarding(|event: String| async move {
    Ok::<_, PipeError>(event.len())
  }));
  metrics.subscribe(|len: usize| async move {
    info!(len, "metric recorded");
    Ok::<(), PipeError>(())
  });

  normalize.route_to(&audit).route_to(&metrics);

  // A listener that fails does not disturb the others.
  normalize.subscribe(|event: String| async move {
    if event.contains("bad") {
      anyhow::bail!("refusing to index '{}'", event);
    }
    Ok(())
  });

  // Waits for the routes and the failing listener; not for the audit pipe's own listener.
  normalize.blocking_send("  User SIGNED In ".to_string()).await?;
  normalize.blocking_send("bad input".to_string()).await?;

  // Fire and forget: listeners keep running after `send` returns.
  normalize.send("Logout".to_string()).await?;
  tokio::time::sleep(Duration::from_millis(100)).await;

  Ok(())
}
