use crate::chat::{ChatMessage, MessageKind, SenderRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frames sent to the support gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Authenticate {
        token: String,
    },
    Message {
        session_id: String,
        content: String,
        message_type: MessageKind,
    },
    Typing {
        session_id: String,
        is_typing: bool,
    },
}

/// Frames received from the support gateway. Payload fields sit next to the
/// `type` tag; unknown fields are ignored so the gateway can grow its payloads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Message {
        #[serde(default)]
        id: Option<String>,
        sender_role: SenderRole,
        sender_name: String,
        content: String,
        #[serde(default)]
        message_type: MessageKind,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
    AgentAssigned {
        agent_name: String,
        #[serde(default)]
        agent_title: Option<String>,
    },
    Typing {
        is_typing: bool,
    },
    QueueUpdate {
        position: u32,
        #[serde(default)]
        wait_estimate_minutes: Option<u32>,
    },
}

impl ServerFrame {
    /// Converts an inbound message frame into a transcript entry, filling in
    /// an id and timestamp when the gateway omits them.
    pub fn into_message(self) -> Option<ChatMessage> {
        match self {
            Self::Message {
                id,
                sender_role,
                sender_name,
                content,
                message_type,
                timestamp,
            } => Some(ChatMessage {
                id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                role: sender_role,
                sender_name,
                content,
                kind: message_type,
                timestamp: timestamp.unwrap_or_else(Utc::now),
                read: false,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_frame_serializes_with_type_tag() {
        let frame = ClientFrame::Authenticate {
            token: "tok-123".to_string(),
        };
        let json = serde_json::to_value(&frame).expect("frame should serialize");
        assert_eq!(json["type"], "authenticate");
        assert_eq!(json["token"], "tok-123");
    }

    #[test]
    fn message_frame_serializes_message_type_as_snake_case() {
        let frame = ClientFrame::Message {
            session_id: "s-1".to_string(),
            content: "receipt.png".to_string(),
            message_type: MessageKind::Image,
        };
        let json = serde_json::to_value(&frame).expect("frame should serialize");
        assert_eq!(json["type"], "message");
        assert_eq!(json["message_type"], "image");
    }

    #[test]
    fn inbound_message_frame_fills_missing_id_and_timestamp() {
        let raw = r#"{
            "type": "message",
            "sender_role": "agent",
            "sender_name": "Maya",
            "content": "Hello!"
        }"#;

        let frame: ServerFrame = serde_json::from_str(raw).expect("frame should parse");
        let message = frame.into_message().expect("message frame should convert");
        assert_eq!(message.role, SenderRole::Agent);
        assert_eq!(message.kind, MessageKind::Text);
        assert!(!message.id.is_empty());
    }

    #[test]
    fn queue_update_frame_parses_without_wait_estimate() {
        let raw = r#"{"type": "queue_update", "position": 2}"#;
        let frame: ServerFrame = serde_json::from_str(raw).expect("frame should parse");
        assert_eq!(
            frame,
            ServerFrame::QueueUpdate {
                position: 2,
                wait_estimate_minutes: None
            }
        );
    }

    #[test]
    fn unknown_payload_fields_are_ignored() {
        let raw = r#"{"type": "typing", "is_typing": true, "agent_id": "a-9"}"#;
        let frame: ServerFrame = serde_json::from_str(raw).expect("frame should parse");
        assert_eq!(frame, ServerFrame::Typing { is_typing: true });
    }

    #[test]
    fn non_message_frames_do_not_convert_to_messages() {
        let frame = ServerFrame::Typing { is_typing: false };
        assert!(frame.into_message().is_none());
    }
}
