//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources: the transcript store, the completion client, the
//! role prompts and the live-session registry.

use crate::config::Config;
use crate::sessions::SessionRegistry;
use colloquy_core::{CompletionClient, RolePrompts, TranscriptStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TranscriptStore>,
    pub llm_client: Arc<dyn CompletionClient>,
    pub prompts: Arc<RolePrompts>,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<Config>,
}
