//! API Models
//!
//! Request payloads and response DTOs for the control surface, annotated for
//! OpenAPI generation with `utoipa`. Core types are mirrored into DTOs here
//! so the engine crate stays free of web concerns.

use chrono::{DateTime, Utc};
use colloquy_core::{Message, Role, RunMode, RunStatus, Topic, TurnOutcome};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct CreateTopicPayload {
    #[schema(example = "Newton's laws")]
    pub subject: String,
    /// Maximum number of messages in the dialogue, both roles combined.
    #[schema(example = 6, minimum = 2)]
    pub turn_limit: u32,
    /// `auto` drives turns continuously; `manual` advances one turn per
    /// step request.
    #[schema(value_type = String, example = "auto")]
    pub mode: RunMode,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct MessageDto {
    #[schema(value_type = String, example = "student")]
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: message.content,
            timestamp: message.timestamp,
        }
    }
}

/// The live run state of a session.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct RunStateDto {
    #[schema(value_type = String, example = "running")]
    pub status: RunStatus,
    pub turn_count: u32,
    pub turn_limit: u32,
    /// Absent when no live session is registered for the topic, or when a
    /// turn is in flight.
    #[schema(value_type = Option<String>, example = "auto")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RunMode>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct TopicDto {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub subject: String,
    pub turn_limit: u32,
    pub turn_count: u32,
    #[schema(value_type = String, example = "running")]
    pub status: RunStatus,
    #[schema(value_type = Option<String>, example = "auto")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RunMode>,
}

impl TopicDto {
    pub fn from_parts(topic: &Topic, run_state: &RunStateDto) -> Self {
        Self {
            id: topic.id,
            subject: topic.subject.clone(),
            turn_limit: topic.turn_limit,
            turn_count: run_state.turn_count,
            status: run_state.status,
            mode: run_state.mode,
        }
    }
}

/// Result of a manual step request.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct AdvanceResponse {
    /// What the step did: `advanced`, `stopped`, or `complete`.
    #[schema(example = "advanced")]
    pub outcome: &'static str,
    /// The produced message, when the step advanced the dialogue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageDto>,
    #[schema(value_type = String, example = "running")]
    pub status: RunStatus,
    pub turn_count: u32,
}

pub fn outcome_label(outcome: &TurnOutcome) -> &'static str {
    match outcome {
        TurnOutcome::Advanced(_) => "advanced",
        TurnOutcome::Stopped => "stopped",
        TurnOutcome::Complete => "complete",
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct StopResponse {
    pub stop_requested: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_topic_payload_deserialization() {
        let json = r#"{"subject": "Newton's laws", "turn_limit": 6, "mode": "auto"}"#;
        let payload: CreateTopicPayload = serde_json::from_str(json).unwrap();

        assert_eq!(payload.subject, "Newton's laws");
        assert_eq!(payload.turn_limit, 6);
        assert_eq!(payload.mode, RunMode::Auto);
    }

    #[test]
    fn test_create_topic_payload_rejects_unknown_mode() {
        let json = r#"{"subject": "Newton's laws", "turn_limit": 6, "mode": "turbo"}"#;
        let result: Result<CreateTopicPayload, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_topic_dto_serializes_run_state_lowercase() {
        let topic = Topic {
            id: Uuid::new_v4(),
            subject: "Waves".to_string(),
            turn_limit: 4,
            messages: vec![],
        };
        let run_state = RunStateDto {
            status: RunStatus::Running,
            turn_count: 1,
            turn_limit: 4,
            mode: Some(RunMode::Auto),
        };

        let json = serde_json::to_string(&TopicDto::from_parts(&topic, &run_state)).unwrap();
        assert!(json.contains("\"status\":\"running\""));
        assert!(json.contains("\"mode\":\"auto\""));
    }

    #[test]
    fn test_topic_dto_omits_absent_mode() {
        let topic = Topic {
            id: Uuid::new_v4(),
            subject: "Waves".to_string(),
            turn_limit: 4,
            messages: vec![],
        };
        let run_state = RunStateDto {
            status: RunStatus::Stopped,
            turn_count: 2,
            turn_limit: 4,
            mode: None,
        };

        let json = serde_json::to_string(&TopicDto::from_parts(&topic, &run_state)).unwrap();
        assert!(!json.contains("\"mode\""));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&TurnOutcome::Stopped), "stopped");
        assert_eq!(outcome_label(&TurnOutcome::Complete), "complete");
        let message = Message {
            role: Role::Teacher,
            content: "answer".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(outcome_label(&TurnOutcome::Advanced(message)), "advanced");
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Topic not found".to_string(),
        };

        let json = serde_json::to_string(&error).unwrap();
        let expected = r#"{"message":"Topic not found"}"#;
        assert_eq!(json, expected);
    }
}
