//! Core data model: topics, messages and speaker roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The speaker of a single turn.
///
/// These are the only two roles the engine ever writes. The enum is closed
/// on purpose: a persisted transcript carrying any other role string fails
/// deserialization and is treated as corrupt by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    /// The speaker that follows this one under strict alternation.
    pub fn other(self) -> Role {
        match self {
            Role::Student => Role::Teacher,
            Role::Teacher => Role::Student,
        }
    }
}

// Implement Display for easy conversion to a string, useful for logging and debugging.
impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
        }
    }
}

/// One turn's output. Owned exclusively by its parent [`Topic`]; position in
/// the topic's message list is the only ordering that matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One dialogue session: a subject, a turn budget and the transcript so far.
///
/// `subject` and `turn_limit` are fixed at creation; `messages` is
/// append-only for the life of the topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub subject: String,
    pub turn_limit: u32,
    pub messages: Vec<Message>,
}

impl Topic {
    /// The role that speaks next: turn 1 is always the student, after that
    /// speakers strictly alternate. Derived from the persisted messages so
    /// that a restarted process reaches the same answer.
    pub fn next_role(&self) -> Role {
        match self.messages.last() {
            Some(last) => last.role.other(),
            None => Role::Student,
        }
    }

    /// Whether the topic has used up its turn budget.
    pub fn is_full(&self) -> bool {
        self.messages.len() as u32 >= self.turn_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: Role, content: &str) -> Message {
        Message {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_role_serialization_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");

        let student: Role = serde_json::from_str("\"student\"").unwrap();
        let teacher: Role = serde_json::from_str("\"teacher\"").unwrap();
        assert_eq!(student, Role::Student);
        assert_eq!(teacher, Role::Teacher);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result: Result<Role, _> = serde_json::from_str("\"moderator\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(format!("{}", Role::Student), "student");
        assert_eq!(format!("{}", Role::Teacher), "teacher");
    }

    #[test]
    fn test_role_alternation() {
        assert_eq!(Role::Student.other(), Role::Teacher);
        assert_eq!(Role::Teacher.other(), Role::Student);
    }

    #[test]
    fn test_next_role_starts_with_student() {
        let topic = Topic {
            id: Uuid::new_v4(),
            subject: "Newton's laws".to_string(),
            turn_limit: 4,
            messages: vec![],
        };
        assert_eq!(topic.next_role(), Role::Student);
    }

    #[test]
    fn test_next_role_alternates_from_last_message() {
        let mut topic = Topic {
            id: Uuid::new_v4(),
            subject: "Newton's laws".to_string(),
            turn_limit: 4,
            messages: vec![message(Role::Student, "What is inertia?")],
        };
        assert_eq!(topic.next_role(), Role::Teacher);

        topic.messages.push(message(
            Role::Teacher,
            "The tendency to resist change in motion.",
        ));
        assert_eq!(topic.next_role(), Role::Student);
    }

    #[test]
    fn test_is_full_tracks_turn_limit() {
        let mut topic = Topic {
            id: Uuid::new_v4(),
            subject: "Thermodynamics".to_string(),
            turn_limit: 2,
            messages: vec![],
        };
        assert!(!topic.is_full());
        topic.messages.push(message(Role::Student, "q"));
        assert!(!topic.is_full());
        topic.messages.push(message(Role::Teacher, "a"));
        assert!(topic.is_full());
    }

    #[test]
    fn test_message_round_trip() {
        let original = message(Role::Teacher, "Force equals mass times acceleration.");
        let json = serde_json::to_string(&original).unwrap();
        let decoded: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.role, original.role);
        assert_eq!(decoded.content, original.content);
        assert_eq!(decoded.timestamp, original.timestamp);
    }
}
