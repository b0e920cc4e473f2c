//! Route modules, one per resource.

pub mod cache;
pub mod generate;
pub mod health;
pub mod jobs;
pub mod queue;
