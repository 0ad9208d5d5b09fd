//! # Repository Layer
//!
//! Read-side access to the signal aggregate: current-state views and the
//! interleaved history of all sub-entity versions. Mutations never happen
//! here, they go through the actions API.

pub mod signal;

pub use signal::SignalRepository;
