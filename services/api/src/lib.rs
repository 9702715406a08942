//! Colloquy API Library Crate
//!
//! This library contains all the logic for the Colloquy web service: the
//! application state, the live-session registry and its auto-drive loop,
//! the API handlers and routing. The `api` binary is a thin wrapper around
//! this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod sessions;
pub mod state;
