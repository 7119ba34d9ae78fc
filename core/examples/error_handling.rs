// pipette/examples/error_handling.rs

use pipette::{Control, Pipe, PipeError, Step};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum AppError {
  #[error("Pipe error: {0}")]
  Pipe(#[from] PipeError),

  #[error("Inventory service unavailable")]
  InventoryDown,

  #[error("Request failed after downstream error: {0}")]
  Wrapped(String),
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  info!("--- Error Handling Example ---");

  // The first step watches what happens further down the chain.
  let guard = Pipe::<u32, u32, String, AppError>::new(|sku, control| async move {
    match control.forward(sku).await {
      Ok(()) => Ok(()),
      Err(AppError::InventoryDown) => {
        warn!(sku, "Inventory down, serving cached answer.");
        control.reply(format!("sku {}: availability unknown", sku));
        Ok(())
      }
      Err(other) => Err(AppError::Wrapped(other.to_string())),
    }
  });

  let lookup = Step::new(|sku: u32, control: Control<u32, String, AppError>| async move {
    if sku % 2 == 0 {
      return Err(AppError::InventoryDown);
    }
    control.reply(format!("sku {}: in stock", sku));
    Ok(())
  });

  let pipe = match guard.extend(lookup) {
    Ok(pipe) => pipe,
    Err(e) => {
      warn!(error = %e, "Could not build pipe.");
      return;
    }
  };

  for sku in [7, 8] {
    match pipe.send(sku).await {
      Ok(reply) => info!(?reply, "Lookup finished."),
      Err(e) => warn!(error = %e, "Lookup failed."),
    }
  }

  // Composition mistakes surface as PipeError before anything runs.
  pipe.subscribe(|_sku: u32| async move { Ok::<(), AppError>(()) });
  if let Err(e) = pipe.extend(Step::new(|_sku: u32, _control: Control<u32, String, AppError>| async move { Ok(()) })) {
    info!(error = %AppError::from(e), "Observed pipes must be cloned before extending.");
  }
}
