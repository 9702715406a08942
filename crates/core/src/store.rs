//! Durable transcript storage.
//!
//! Topics and their message sequences live in a single JSON document that is
//! rewritten in full on every mutation. A coarse async mutex serializes all
//! access; write volume is low enough that nothing finer is warranted. The
//! store heals itself: an absent, unreadable or corrupt file reinitializes
//! to an empty state instead of taking the process down.

use crate::error::EngineError;
use crate::topic::{Message, Role, Topic};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// On-disk shape of the store: every topic, in creation order.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TranscriptFile {
    topics: Vec<Topic>,
}

/// Durable mapping from topic id to [`Topic`], surviving process restarts.
pub struct TranscriptStore {
    path: PathBuf,
    inner: Mutex<TranscriptFile>,
}

impl TranscriptStore {
    /// Opens the store backed by the file at `path`, creating parent
    /// directories as needed.
    ///
    /// A missing file starts the store empty. An unreadable or corrupt file
    /// also starts it empty, with a warning; the bad content is overwritten
    /// on the next mutation.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(EngineError::storage)?;
        }

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<TranscriptFile>(&raw) {
                Ok(data) => data,
                Err(err) => {
                    warn!(path = %path.display(), %err, "transcript file corrupt, reinitializing empty");
                    TranscriptFile::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => TranscriptFile::default(),
            Err(err) => {
                warn!(path = %path.display(), %err, "transcript file unreadable, reinitializing empty");
                TranscriptFile::default()
            }
        };

        info!(path = %path.display(), topics = data.topics.len(), "transcript store opened");
        Ok(Self {
            path,
            inner: Mutex::new(data),
        })
    }

    /// Allocates a new topic with an empty message list and persists it.
    pub async fn create_topic(&self, subject: &str, turn_limit: u32) -> Result<Uuid, EngineError> {
        if subject.trim().is_empty() {
            return Err(EngineError::InvalidArgument(
                "subject must not be empty".to_string(),
            ));
        }
        if turn_limit < 1 {
            return Err(EngineError::InvalidArgument(
                "turn_limit must be at least 1".to_string(),
            ));
        }

        let mut data = self.inner.lock().await;
        let id = Uuid::new_v4();
        data.topics.push(Topic {
            id,
            subject: subject.to_string(),
            turn_limit,
            messages: Vec::new(),
        });
        self.persist(&data).await?;
        Ok(id)
    }

    /// Appends a message with the current timestamp to the named topic.
    ///
    /// Rejects appends past the topic's turn budget so the invariant holds
    /// no matter who calls.
    pub async fn append_message(
        &self,
        topic_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<Message, EngineError> {
        let mut data = self.inner.lock().await;
        let topic = data
            .topics
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or(EngineError::NotFound(topic_id))?;
        if topic.is_full() {
            return Err(EngineError::InvalidArgument(format!(
                "topic '{}' already holds its full budget of {} messages",
                topic_id, topic.turn_limit
            )));
        }

        let message = Message {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        topic.messages.push(message.clone());
        self.persist(&data).await?;
        Ok(message)
    }

    pub async fn get_topic(&self, topic_id: Uuid) -> Result<Topic, EngineError> {
        let data = self.inner.lock().await;
        data.topics
            .iter()
            .find(|t| t.id == topic_id)
            .cloned()
            .ok_or(EngineError::NotFound(topic_id))
    }

    /// All topics, in creation order.
    pub async fn list_topics(&self) -> Vec<Topic> {
        self.inner.lock().await.topics.clone()
    }

    /// Removes a topic and all its messages. Deleting an id that is already
    /// absent is a no-op.
    pub async fn delete_topic(&self, topic_id: Uuid) -> Result<(), EngineError> {
        let mut data = self.inner.lock().await;
        let before = data.topics.len();
        data.topics.retain(|t| t.id != topic_id);
        if data.topics.len() == before {
            return Ok(());
        }
        self.persist(&data).await
    }

    /// The most recent message content spoken by `role` within the topic,
    /// or `None` if that role has not spoken yet.
    pub async fn last_message_by_role(
        &self,
        topic_id: Uuid,
        role: Role,
    ) -> Result<Option<String>, EngineError> {
        let data = self.inner.lock().await;
        let topic = data
            .topics
            .iter()
            .find(|t| t.id == topic_id)
            .ok_or(EngineError::NotFound(topic_id))?;
        Ok(topic
            .messages
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(|m| m.content.clone()))
    }

    /// Rewrites the whole backing file. The document goes to a sibling temp
    /// file first and is renamed into place, so a reader of the path never
    /// observes a half-written append.
    async fn persist(&self, data: &TranscriptFile) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(data).map_err(EngineError::storage)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(EngineError::storage)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(EngineError::storage)
    }
}
