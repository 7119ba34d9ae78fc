// src/lib.rs

//! Pipette: composable asynchronous pipes for Rust.
//!
//! A `Pipe` chains async steps. Each step receives a payload and a `Control` and either:
//!  - forwards a value to the next step (`control.forward(v).await`),
//!  - replies with a final value, ending the chain (`control.reply(v)`),
//!  - or does neither, which ends the chain without a reply.
//!
//! When the chain runs off its end without a reply, the last forwarded value is handed to
//! the pipe's listeners. Listeners never change the pipe's result, and one failing listener
//! never affects the others.
//!
//! Pipes compose without mutation:
//!  - `extend` builds a new pipe from this pipe's steps followed by a step or another pipe.
//!  - `clone` copies the steps and starts with no listeners.
//!  - `route_to` feeds this pipe's output into another pipe's `send`.

// Declare modules according to the planned structure
pub mod core;
pub mod error;
pub mod pipeline;

// --- Re-exports for the Public API ---

pub use crate::core::control::Control;
pub use crate::core::listener::Subscriber;
pub use crate::core::step::{forwarding, is_step, replying, IntoSteps, Step};

pub use crate::pipeline::definition::Pipe;

pub use crate::error::{PipeError, PipeResult};

/*
    Core workflow:
    1. Build a pipe from a first step: `Pipe::<In, Out, Reply>::new(|payload, control| async move { .. })`.
    2. Grow it with `extend`, passing a `Step` (see `Step::new`, `forwarding`, `replying`)
       or another pipe. Each call returns a new pipe.
    3. Observe its output with `subscribe` / `subscribe_with`, or wire it into another
       pipe with `route_to`. An observed pipe can no longer be extended; `clone` it to branch.
    4. Run it: `pipe.send(payload).await` resolves to `Ok(Some(reply))`, `Ok(None)` when no
       step replied, or the step error. `blocking_send` additionally waits for listeners.
*/
