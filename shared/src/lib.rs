//! Shared types and models for the Harvest Hub platform
//!
//! This crate contains types shared between the backend, the browser client
//! (via WASM), and other components of the system.

pub mod directory;
pub mod models;
pub mod types;
pub mod validation;
pub mod workflow;

pub use directory::*;
pub use models::*;
pub use types::*;
pub use validation::*;
pub use workflow::*;
