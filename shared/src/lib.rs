//! Shared types for the Comal POS
//!
//! Domain models and utility types used by the server and by API
//! consumers (the SPA talks to these shapes as JSON).

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
