//! The turn-taking state machine.
//!
//! One orchestrator drives one topic at a time: it reads the persisted
//! transcript to decide whose turn is next, invokes the completion client,
//! appends the result back to the store and enforces the turn budget. All
//! run state here is transient; the transcript itself is the durable record,
//! which is why resuming after a crash re-derives the next speaker from the
//! store instead of trusting a counter.

use crate::error::EngineError;
use crate::llm_client::CompletionClient;
use crate::prompts::RolePrompts;
use crate::store::TranscriptStore;
use crate::topic::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

/// Whether turns advance continuously or only on explicit step requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Auto,
    Manual,
}

/// Orchestrator status.
///
/// `Complete` is terminal: only a fresh `start`, which creates a new topic
/// and resets all run state, leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Stopped,
    Complete,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Stopped => write!(f, "stopped"),
            RunStatus::Complete => write!(f, "complete"),
        }
    }
}

/// What a single `advance_turn` call did.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// A turn was produced and persisted.
    Advanced(crate::topic::Message),
    /// A pending stop request was honored at the turn boundary; no message
    /// was produced.
    Stopped,
    /// The turn budget is exhausted; no message was produced.
    Complete,
}

/// Cloneable handle for requesting a cooperative stop from outside the task
/// that owns the orchestrator.
///
/// The request is only honored at turn boundaries: an in-flight completion
/// call always finishes and its turn is persisted.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Idempotent.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Drives the student/teacher turn sequence for one topic, respecting a
/// turn budget and a run mode.
pub struct Orchestrator {
    store: Arc<TranscriptStore>,
    client: Arc<dyn CompletionClient>,
    prompts: Arc<RolePrompts>,
    topic_id: Option<Uuid>,
    subject: String,
    turn_limit: u32,
    turn_count: u32,
    mode: RunMode,
    status: RunStatus,
    stop_requested: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<TranscriptStore>,
        client: Arc<dyn CompletionClient>,
        prompts: Arc<RolePrompts>,
    ) -> Self {
        Self {
            store,
            client,
            prompts,
            topic_id: None,
            subject: String::new(),
            turn_limit: 0,
            turn_count: 0,
            mode: RunMode::Manual,
            status: RunStatus::Idle,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a new topic and synchronously issues the seeded student turn,
    /// the only turn that does not respond to a prior message.
    ///
    /// Legal from any status; starting resets all run state. Returns the new
    /// topic's id.
    pub async fn start(
        &mut self,
        subject: &str,
        turn_limit: u32,
        mode: RunMode,
    ) -> Result<Uuid, EngineError> {
        if subject.trim().is_empty() {
            return Err(EngineError::InvalidArgument(
                "subject must not be empty".to_string(),
            ));
        }
        if turn_limit < 2 {
            return Err(EngineError::InvalidArgument(
                "turn_limit must be at least 2: one student and one teacher turn".to_string(),
            ));
        }

        let topic_id = self.store.create_topic(subject, turn_limit).await?;
        info!(%topic_id, subject, turn_limit, ?mode, "starting dialogue");

        let text = self
            .client
            .complete(self.prompts.for_role(Role::Student), &seed_instruction(subject))
            .await
            .map_err(EngineError::completion)?;
        self.store
            .append_message(topic_id, Role::Student, &text)
            .await?;

        self.topic_id = Some(topic_id);
        self.subject = subject.to_string();
        self.turn_limit = turn_limit;
        self.turn_count = 1;
        self.mode = mode;
        self.status = RunStatus::Running;
        self.stop_requested.store(false, Ordering::SeqCst);
        Ok(topic_id)
    }

    /// Rebuilds run state for an already-persisted topic, e.g. after a
    /// process restart.
    ///
    /// The session comes back `Stopped` (resumable) unless its budget is
    /// already exhausted, in which case it is `Complete`. The next speaker
    /// is not cached here: `advance_turn` re-derives it from the transcript.
    pub async fn attach(&mut self, topic_id: Uuid, mode: RunMode) -> Result<(), EngineError> {
        let topic = self.store.get_topic(topic_id).await?;
        self.topic_id = Some(topic.id);
        self.subject = topic.subject.clone();
        self.turn_limit = topic.turn_limit;
        self.turn_count = topic.messages.len() as u32;
        self.mode = mode;
        if topic.is_full() {
            self.status = RunStatus::Complete;
            self.stop_requested.store(false, Ordering::SeqCst);
        } else {
            self.status = RunStatus::Stopped;
            self.stop_requested.store(true, Ordering::SeqCst);
        }
        info!(%topic_id, turns = self.turn_count, status = %self.status, "attached to persisted topic");
        Ok(())
    }

    /// The single-step primitive: produce and persist at most one turn.
    ///
    /// A pending stop request wins over everything else, then the turn
    /// budget; both return without touching the transcript. Otherwise the
    /// next speaker is derived from the last persisted message and one
    /// completion call is made. On completion failure nothing changes, so
    /// retrying the same call is safe.
    pub async fn advance_turn(&mut self) -> Result<TurnOutcome, EngineError> {
        let topic_id = self
            .topic_id
            .ok_or_else(|| EngineError::InvalidState("no dialogue has been started".to_string()))?;

        // Complete is terminal; a late stop request must not reopen it.
        if self.status == RunStatus::Complete {
            return Ok(TurnOutcome::Complete);
        }
        if self.stop_requested.load(Ordering::SeqCst) {
            self.status = RunStatus::Stopped;
            debug!(%topic_id, "stop request honored at turn boundary");
            return Ok(TurnOutcome::Stopped);
        }
        if self.turn_count >= self.turn_limit {
            self.status = RunStatus::Complete;
            return Ok(TurnOutcome::Complete);
        }

        let topic = self.store.get_topic(topic_id).await?;
        let speaker = topic.next_role();
        // Each turn responds to the other role's most recent message; the
        // seed instruction covers the empty-transcript case.
        let user_content = match self
            .store
            .last_message_by_role(topic_id, speaker.other())
            .await?
        {
            Some(content) => content,
            None => seed_instruction(&topic.subject),
        };

        let text = self
            .client
            .complete(self.prompts.for_role(speaker), &user_content)
            .await
            .map_err(EngineError::completion)?;

        let message = self.store.append_message(topic_id, speaker, &text).await?;
        self.turn_count += 1;
        debug!(%topic_id, role = %speaker, turn = self.turn_count, "turn persisted");

        // Re-check after the append: this call may have exhausted the
        // budget, and a stop may have arrived while the completion call was
        // in flight.
        if self.turn_count >= self.turn_limit {
            self.status = RunStatus::Complete;
            info!(%topic_id, turns = self.turn_count, "dialogue complete");
        } else if self.stop_requested.load(Ordering::SeqCst) {
            self.status = RunStatus::Stopped;
        }
        Ok(TurnOutcome::Advanced(message))
    }

    /// Requests a cooperative stop, honored at the next turn boundary.
    /// Idempotent.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// A handle that can request a stop without access to the orchestrator,
    /// e.g. while a turn is in flight on another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop_requested),
        }
    }

    /// Valid only from `Stopped`: clears the stop request and returns the
    /// session to `Running`.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        if self.status != RunStatus::Stopped {
            return Err(EngineError::InvalidState(format!(
                "cannot resume from status '{}'",
                self.status
            )));
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        self.status = RunStatus::Running;
        Ok(())
    }

    /// Pumps `advance_turn` while the dialogue is running in auto mode.
    ///
    /// Each iteration is one self-contained turn; callers may inspect
    /// status and turn count between any two of them. A completion failure
    /// propagates with state unchanged, so invoking this again retries the
    /// failed turn.
    pub async fn run_auto_until_idle(&mut self) -> Result<(), EngineError> {
        while self.status == RunStatus::Running && self.mode == RunMode::Auto {
            self.advance_turn().await?;
        }
        Ok(())
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn turn_limit(&self) -> u32 {
        self.turn_limit
    }

    pub fn topic_id(&self) -> Option<Uuid> {
        self.topic_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The live message list for the driven topic.
    pub async fn messages(&self) -> Result<Vec<crate::topic::Message>, EngineError> {
        match self.topic_id {
            Some(id) => Ok(self.store.get_topic(id).await?.messages),
            None => Ok(Vec::new()),
        }
    }
}

/// The instruction that seeds turn 1. Every later student turn responds to
/// the teacher's last message instead.
fn seed_instruction(subject: &str) -> String {
    format!("Ask a question about this topic: {subject}")
}
