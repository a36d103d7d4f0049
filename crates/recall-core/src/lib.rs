//! recall-core: spaced-repetition scheduling and review sessions.
//!
//! This crate defines the data model, the scheduler, due-item selection,
//! the store traits and the review engine that the rest of recall builds
//! on.

pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod parser;
pub mod scheduler;
pub mod selection;
pub mod statistics;
pub mod sweeper;
pub mod traits;
