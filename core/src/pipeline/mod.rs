// pipette/src/pipeline/mod.rs

//! Defines the `Pipe` struct, its composition, listener registration and execution logic.

pub mod definition;
pub mod execution;
pub mod hooks;

// Re-export the main Pipe struct
pub use definition::Pipe;
