pub mod context;
pub mod control;
pub mod listener;
pub mod step;

// Re-export key types for easier access from other pipette modules (and lib.rs)
pub use control::Control;
pub use listener::Subscriber;
pub use step::{forwarding, is_step, replying, IntoSteps, Step, StepFn};
