// Public API - data types, rendering, and the ping engine
pub mod art;
pub mod cli;
pub mod config;
pub mod error;
pub mod ping;
pub mod render;
pub mod stats;

// Internal implementation - not part of public API
pub(crate) mod probe;
