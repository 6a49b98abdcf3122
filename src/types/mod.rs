//! Shared data structures for the dosing pipeline
//!
//! - `chemistry`: compositions and deltas
//! - `request`: the validated request and its JSON input adapter
//! - `recommendation`: per-alloy results and the tagged outcome

mod chemistry;
mod recommendation;
pub mod request;

pub use chemistry::*;
pub use recommendation::*;
pub use request::DosingRequest;
