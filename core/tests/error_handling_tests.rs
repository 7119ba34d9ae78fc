// tests/error_handling_tests.rs
mod common;
use common::*;
use pipette::{replying, Control, Pipe, PipeError, Step};

#[tokio::test]
async fn test_step_error_propagates_unmodified() {
  setup_tracing();
  let trail = new_trail();
  let pipe = Pipe::from(add_step("good_step", 1, trail.clone()))
    .extend(failing_step("bad_step", "I am a bad step!", trail.clone()))
    .unwrap()
    .extend(add_step("another_step", 1, trail.clone()))
    .unwrap();

  let result = pipe.send(0).await;

  assert!(result.is_err());
  match result.err().unwrap() {
    TestError::Step(msg) => assert_eq!(msg, "I am a bad step!"),
    other => panic!("Expected TestError::Step, got {:?}", other),
  }
  assert_eq!(*trail.lock(), vec!["good_step", "bad_step"]);
}

#[tokio::test]
async fn test_upstream_step_observes_downstream_error_and_rethrows() {
  setup_tracing();
  let trail = new_trail();
  let observed = std::sync::Arc::new(parking_lot::Mutex::new(None));
  let observed_clone = observed.clone();

  let guard = Pipe::<i32, i32, String, TestError>::new(move |n, control| {
    let observed = observed_clone.clone();
    async move {
      match control.forward(n).await {
        Ok(()) => Ok(()),
        Err(err) => {
          *observed.lock() = Some(err.clone());
          Err(TestError::Recovered(err.to_string()))
        }
      }
    }
  });
  let pipe = guard.extend(failing_step("b", "boom from B", trail.clone())).unwrap();

  let result = pipe.send(1).await;

  assert_eq!(*observed.lock(), Some(TestError::Step("boom from B".to_string())));
  assert_eq!(
    result.err(),
    Some(TestError::Recovered("Test step failed: boom from B".to_string()))
  );
}

#[tokio::test]
async fn test_upstream_step_can_recover_with_a_reply() {
  setup_tracing();
  let trail = new_trail();
  let guard = Pipe::<i32, i32, String, TestError>::new(|n, control| async move {
    if let Err(err) = control.forward(n).await {
      control.reply(format!("fallback after: {}", err));
    }
    Ok(())
  });
  let pipe = guard.extend(failing_step("b", "downstream broke", trail.clone())).unwrap();

  assert_eq!(
    pipe.send(1).await.unwrap(),
    Some("fallback after: Test step failed: downstream broke".to_string())
  );
}

#[tokio::test]
async fn test_error_in_middle_skips_listeners() {
  setup_tracing();
  let trail = new_trail();
  let notified = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
  let pipe = Pipe::from(failing_step("bad", "nope", trail.clone()));
  let notified_clone = notified.clone();
  pipe.subscribe(move |_value: i32| {
    let notified = notified_clone.clone();
    async move {
      notified.store(true, std::sync::atomic::Ordering::SeqCst);
      Ok::<(), TestError>(())
    }
  });

  assert!(pipe.blocking_send(1).await.is_err());
  assert!(!notified.load(std::sync::atomic::Ordering::SeqCst));
}

// Test a pipe whose error type IS PipeError.
#[tokio::test]
async fn test_pipe_with_pipe_error_type() {
  setup_tracing();
  let pipe = Pipe::<&'static str, u32, u32>::new(|raw, control| async move {
    let parsed: u32 = raw.parse().map_err(anyhow::Error::from)?;
    control.forward(parsed).await
  })
  .extend(replying(|n: u32| async move { Ok::<_, PipeError>(n + 1) }))
  .unwrap();

  assert_eq!(pipe.send("41").await.unwrap(), Some(42));

  match pipe.send("forty-one").await {
    Err(PipeError::StepFailure { source }) => {
      assert!(source.downcast_ref::<std::num::ParseIntError>().is_some());
    }
    other => panic!("Expected PipeError::StepFailure, got {:?}", other),
  }
}

#[tokio::test]
async fn test_pipe_error_passes_through_anyhow_without_double_wrapping() {
  setup_tracing();
  let pipe = Pipe::<i32, i32, i32>::from(Step::new(|_n: i32, _control: Control<i32, i32, PipeError>| async move {
    let nested: anyhow::Error = PipeError::HasListeners { listeners: 3 }.into();
    Err(PipeError::from(nested))
  }));

  assert!(matches!(
    pipe.send(0).await,
    Err(PipeError::HasListeners { listeners: 3 })
  ));
}

#[test]
fn test_pipe_error_messages() {
  let invalid = PipeError::InvalidStep {
    value: "42".to_string(),
    type_name: "i32".to_string(),
  };
  assert_eq!(
    invalid.to_string(),
    "Invalid step: 42 (of type `i32`) is neither a step function nor a pipe"
  );

  let observed = PipeError::HasListeners { listeners: 2 };
  assert!(observed.to_string().contains("2 registered listener(s)"));
}
