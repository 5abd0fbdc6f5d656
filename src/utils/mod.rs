//! Shared utilities.

pub mod graph;
