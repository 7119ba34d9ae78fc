use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pipette::{Control, Pipe, PipeError, Step};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime; // To run async code within Criterion

// Using PipeError directly for benchmark simplicity.
type BenchError = PipeError;

// --- Helper: Simple Synchronous Step ---
fn create_sync_increment_step(iterations: u64) -> Step<u64, u64, u64, BenchError> {
  Step::new(move |n: u64, control: Control<u64, u64, BenchError>| {
    let mut value = n;
    for _i in 0..iterations {
      // Simulate some CPU-bound work
      value = value.wrapping_add(1);
    }
    control.forward(value)
  })
}

// --- Helper: Simple Asynchronous Step ---
fn create_async_io_step(delay_micros: u64) -> Step<u64, u64, u64, BenchError> {
  Step::new(move |n: u64, control: Control<u64, u64, BenchError>| async move {
    if delay_micros > 0 {
      tokio::time::sleep(std::time::Duration::from_micros(delay_micros)).await;
    }
    control.forward(n + 1).await
  })
}

fn build_pipe(num_steps: usize, step: impl Fn() -> Step<u64, u64, u64, BenchError>) -> Pipe<u64, u64, u64, BenchError> {
  let mut pipe = Pipe::<u64, u64, u64, BenchError>::passthrough();
  for _ in 0..num_steps {
    pipe = pipe.extend(step()).unwrap();
  }
  pipe
}

// --- Benchmark Functions ---

fn bench_send_sync_steps(c: &mut Criterion) {
  let mut group = c.benchmark_group("SendSyncSteps");
  let rt = Runtime::new().unwrap();

  for num_steps in [1usize, 5, 10].iter() {
    for iterations in [1u64, 100].iter() {
      let pipe = Arc::new(build_pipe(*num_steps, || create_sync_increment_step(*iterations)));

      group.throughput(Throughput::Elements(*num_steps as u64));
      group.bench_with_input(
        BenchmarkId::new(format!("{}steps_{}iter", num_steps, iterations), num_steps),
        num_steps,
        |b, _| {
          b.to_async(&rt).iter(|| {
            let p = pipe.clone();
            async move { p.send(0).await.unwrap() }
          });
        },
      );
    }
  }
  group.finish();
}

fn bench_send_async_steps(c: &mut Criterion) {
  let mut group = c.benchmark_group("SendAsyncSteps");
  let rt = Runtime::new().unwrap();

  for num_steps in [1usize, 5].iter() {
    for delay_us in [0u64, 10].iter() {
      let pipe = Arc::new(build_pipe(*num_steps, || create_async_io_step(*delay_us)));

      group.throughput(Throughput::Elements(*num_steps as u64));
      group.bench_with_input(
        BenchmarkId::new(format!("{}steps_{}us", num_steps, delay_us), num_steps),
        num_steps,
        |b, _| {
          b.to_async(&rt).iter(|| {
            let p = pipe.clone();
            async move { p.send(0).await.unwrap() }
          });
        },
      );
    }
  }
  group.finish();
}

fn bench_blocking_send_fan_out(c: &mut Criterion) {
  let mut group = c.benchmark_group("BlockingSendFanOut");
  let rt = Runtime::new().unwrap();

  for num_listeners in [1usize, 8, 32].iter() {
    let delivered = Arc::new(AtomicU64::new(0));
    let pipe = build_pipe(1, || create_sync_increment_step(1));
    for _ in 0..*num_listeners {
      let delivered = delivered.clone();
      pipe.subscribe(move |value: u64| {
        let delivered = delivered.clone();
        async move {
          delivered.fetch_add(value, Ordering::Relaxed);
          Ok::<(), BenchError>(())
        }
      });
    }
    let pipe = Arc::new(pipe);

    group.throughput(Throughput::Elements(*num_listeners as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_listeners), num_listeners, |b, _| {
      b.to_async(&rt).iter(|| {
        let p = pipe.clone();
        async move { p.blocking_send(0).await.unwrap() }
      });
    });
  }
  group.finish();
}

criterion_group!(
  benches,
  bench_send_sync_steps,
  bench_send_async_steps,
  bench_blocking_send_fan_out
);
criterion_main!(benches);
