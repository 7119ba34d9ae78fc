// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use once_cell::sync::Lazy;
use pipette::{Control, PipeError, Step};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::Level;

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)] // Clone, PartialEq, Eq for assertions
pub enum TestError {
  #[error("Pipette framework error: {0}")]
  Pipe(String), // Store as String for Eq comparison

  #[error("Test step failed: {0}")]
  Step(String),

  #[error("Recovered from: {0}")]
  Recovered(String),
}

impl From<PipeError> for TestError {
  fn from(pe: PipeError) -> Self {
    TestError::Pipe(pe.to_string())
  }
}

/// Shared log of which steps ran, in order.
pub type Trail = Arc<parking_lot::Mutex<Vec<String>>>;

pub fn new_trail() -> Trail {
  Arc::new(parking_lot::Mutex::new(Vec::new()))
}

// --- Common Step Creators ---

/// Records its name, then forwards `n + amount`.
pub fn add_step(name: &'static str, amount: i32, trail: Trail) -> Step<i32, i32, String, TestError> {
  Step::new(move |n: i32, control: Control<i32, String, TestError>| {
    trail.lock().push(name.to_string());
    async move { control.forward(n + amount).await }
  })
}

/// Records its name, then replies with `"<name>:<n>"`.
pub fn reply_step(name: &'static str, trail: Trail) -> Step<i32, i32, String, TestError> {
  Step::new(move |n: i32, control: Control<i32, String, TestError>| {
    trail.lock().push(name.to_string());
    async move {
      control.reply(format!("{}:{}", name, n));
      Ok(())
    }
  })
}

/// Records its name, then fails.
pub fn failing_step(name: &'static str, message: &'static str, trail: Trail) -> Step<i32, i32, String, TestError> {
  Step::new(move |_n: i32, _control: Control<i32, String, TestError>| {
    trail.lock().push(name.to_string());
    tracing::warn!(target: "test_steps", step = name, "failing with: '{}'", message);
    async move { Err(TestError::Step(message.to_string())) }
  })
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Atomic counters for checking execution counts ---
pub static LISTENER_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static ROUTED_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  LISTENER_EXEC_COUNTER.store(0, Ordering::SeqCst);
  ROUTED_EXEC_COUNTER.store(0, Ordering::SeqCst);
}

/// Short pause used to make listener timing observable.
pub fn millis(ms: u64) -> Duration {
  Duration::from_millis(ms)
}
