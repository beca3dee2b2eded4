use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod api;
pub mod connection;
pub mod escalation;
pub mod frames;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    User,
    Agent,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

/// One entry in the transcript. Messages are append-only: once pushed they
/// are never reordered or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: SenderRole,
    pub sender_name: String,
    pub content: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl ChatMessage {
    pub fn text(role: SenderRole, sender_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            sender_name: sender_name.into(),
            content: content.into(),
            kind: MessageKind::Text,
            timestamp: Utc::now(),
            read: false,
        }
    }

    pub fn attachment(
        role: SenderRole,
        sender_name: impl Into<String>,
        file_name: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            kind,
            ..Self::text(role, sender_name, file_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub title: String,
    pub avatar_initial: char,
}

impl AgentInfo {
    /// Stand-in agent used by the simulated escalation flow until a real
    /// assignment frame arrives.
    pub fn placeholder() -> Self {
        Self {
            name: "Maya Torres".to_string(),
            title: "Customer Support".to_string(),
            avatar_initial: 'M',
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: String,
    pub active: bool,
    pub agent_assigned: bool,
    pub agent: Option<AgentInfo>,
    pub queue_position: Option<u32>,
    pub wait_estimate_minutes: Option<u32>,
    pub started_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn start() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            active: true,
            agent_assigned: false,
            agent: None,
            queue_position: None,
            wait_estimate_minutes: None,
            started_at: Utc::now(),
        }
    }

    pub fn assign_agent(&mut self, agent: AgentInfo) {
        self.agent_assigned = true;
        self.queue_position = None;
        self.wait_estimate_minutes = None;
        self.agent = Some(agent);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// The reconnect policy gave up; only a manual retry will reconnect.
    Failed,
}

/// Details collected from unauthenticated visitors before a session starts.
#[derive(Debug, Clone, Default)]
pub struct PreChatForm {
    pub name: String,
    pub email: String,
    pub question: String,
}

impl PreChatForm {
    pub fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        } else if !self.email.contains('@') {
            return Err("Please enter a valid email address".to_string());
        }
        if self.question.trim().is_empty() {
            missing.push("question");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Please fill in: {}", missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_preserves_arrival_order() {
        let mut transcript = Vec::new();
        for i in 0..20 {
            transcript.push(ChatMessage::text(
                SenderRole::User,
                "Sam",
                format!("message {i}"),
            ));
        }

        let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("message {i}")).collect();
        assert_eq!(contents, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn assigning_an_agent_clears_queue_state() {
        let mut session = ChatSession::start();
        session.queue_position = Some(3);
        session.wait_estimate_minutes = Some(7);

        session.assign_agent(AgentInfo::placeholder());

        assert!(session.agent_assigned);
        assert!(session.queue_position.is_none());
        assert!(session.wait_estimate_minutes.is_none());
        assert_eq!(session.agent.as_ref().map(|a| a.name.as_str()), Some("Maya Torres"));
    }

    #[test]
    fn prechat_form_requires_all_fields() {
        let form = PreChatForm {
            name: "Sam".to_string(),
            email: String::new(),
            question: String::new(),
        };

        let err = form.validate().expect_err("empty fields should fail validation");
        assert!(err.contains("email"));
        assert!(err.contains("question"));
    }

    #[test]
    fn prechat_form_rejects_malformed_email() {
        let form = PreChatForm {
            name: "Sam".to_string(),
            email: "not-an-email".to_string(),
            question: "Where is my parcel?".to_string(),
        };

        let err = form.validate().expect_err("malformed email should fail validation");
        assert!(err.contains("valid email"));
    }

    #[test]
    fn prechat_form_accepts_complete_input() {
        let form = PreChatForm {
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            question: "Where is my parcel?".to_string(),
        };

        form.validate().expect("complete form should validate");
    }
}
