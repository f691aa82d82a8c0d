//! Turn orchestration for hudgate — prompt assembly plus the per-turn
//! controller that drives retrieval, upstream streaming, and event
//! forwarding.

pub mod assembler;
pub mod controller;

pub use assembler::assemble;
pub use controller::{TurnController, TurnState};
