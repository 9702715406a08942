//! Live orchestrator sessions.
//!
//! One orchestrator drives one topic; the registry maps topic ids to their
//! live sessions so control requests (step, stop, resume, delete) find the
//! right instance. The auto-drive loop lives here too: it is the host-owned
//! pump that repeatedly calls `advance_turn` while a session is running in
//! auto mode, taking the session lock one turn at a time.

use colloquy_core::{Orchestrator, RunMode, RunStatus, StopHandle, TurnOutcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// A live conversation session.
///
/// The orchestrator sits behind a per-session async lock so turns are
/// serialized; the stop handle bypasses that lock, because a stop request
/// must not wait out an in-flight completion call.
#[derive(Clone)]
pub struct SessionHandle {
    pub orchestrator: Arc<tokio::sync::Mutex<Orchestrator>>,
    pub stop: StopHandle,
}

impl SessionHandle {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let stop = orchestrator.stop_handle();
        Self {
            orchestrator: Arc::new(tokio::sync::Mutex::new(orchestrator)),
            stop,
        }
    }
}

/// Registry of live sessions, keyed by topic id.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    pub fn insert(&self, topic_id: Uuid, handle: SessionHandle) {
        self.inner
            .lock()
            .expect("session registry lock poisoned")
            .insert(topic_id, handle);
    }

    pub fn get(&self, topic_id: Uuid) -> Option<SessionHandle> {
        self.inner
            .lock()
            .expect("session registry lock poisoned")
            .get(&topic_id)
            .cloned()
    }

    pub fn remove(&self, topic_id: Uuid) -> Option<SessionHandle> {
        self.inner
            .lock()
            .expect("session registry lock poisoned")
            .remove(&topic_id)
    }
}

/// Spawns the drive loop for an auto-mode session.
///
/// The loop takes the session lock once per turn and releases it in
/// between, so status reads and stop requests interleave cleanly with the
/// dialogue's progress. It exits when the session leaves `Running`, leaves
/// auto mode, or a turn fails.
pub fn spawn_auto_drive(session: SessionHandle, topic_id: Uuid) {
    let span = info_span!("auto_drive", %topic_id);
    tokio::spawn(
        async move {
            loop {
                let mut orchestrator = session.orchestrator.lock().await;
                if orchestrator.status() != RunStatus::Running
                    || orchestrator.mode() != RunMode::Auto
                {
                    break;
                }
                match orchestrator.advance_turn().await {
                    Ok(TurnOutcome::Advanced(_)) => {}
                    Ok(_) => break,
                    Err(err) => {
                        // The failed turn persisted nothing; park the
                        // session as stopped so a resume can retry it.
                        warn!(error = ?err, "turn failed, stopping session");
                        orchestrator.request_stop();
                        let _ = orchestrator.advance_turn().await;
                        break;
                    }
                }
                drop(orchestrator);
                tokio::task::yield_now().await;
            }
            info!("auto drive finished");
        }
        .instrument(span),
    );
}
