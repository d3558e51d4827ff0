//! Core module: configuration, shared state and the HTTP server
//!
//! - [`Config`] loads settings from the environment
//! - [`ServerState`] wires the database, JWT and audit services together
//! - [`Server`] assembles the router and runs it

pub mod config;
pub mod server;
pub mod state;

pub use config::Config;
pub use server::{Server, build_app, build_router};
pub use state::ServerState;
