//! Architectural hart state model primitives.

/// Register identifiers and the general-purpose register file.
pub mod registers;
pub use registers::{Register, RegisterFile, REGISTER_COUNT};

/// Execution-state machine and halt causes.
pub mod run_state;
pub use run_state::{HaltCause, RunState};
