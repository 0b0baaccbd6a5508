//! Coworker projection
//!
//! Turns the bipartite worker/employer affiliation graph into a
//! worker-only graph where two workers are adjacent when they shared an
//! employer for at least the configured number of days.

pub mod engine;

pub use engine::{
    project, EvictionPolicy, ProjectionConfig, ProjectionEngine, ProjectionStats, DEFAULT_PROGRESS_EVERY,
};
