use crate::chat::{ChatMessage, MessageKind, SenderRole};
use crate::config::AppConfig;
use crate::event::AppEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use thiserror::Error;
use tokio::runtime::Handle;

pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SupportApiError {
    #[error("attachment is {size} bytes, over the {limit} byte limit")]
    AttachmentTooLarge { size: u64, limit: u64 },
    #[error("could not read attachment: {0}")]
    AttachmentRead(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client-side size gate, checked before any request is built.
pub fn validate_attachment_size(size: u64) -> Result<(), SupportApiError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(SupportApiError::AttachmentTooLarge {
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

/// Attachment kind inferred from the file extension.
pub fn kind_for_path(path: &Path) -> MessageKind {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png" | "jpg" | "jpeg" | "gif" | "webp") => MessageKind::Image,
        _ => MessageKind::File,
    }
}

#[derive(Debug, Serialize)]
struct CreateMessageBody<'a> {
    session_id: &'a str,
    content: &'a str,
    message_type: MessageKind,
}

/// The notification listing doubles as chat history; entries map onto agent
/// messages in the transcript.
#[derive(Debug, Deserialize)]
struct NotificationDto {
    id: String,
    #[serde(default)]
    sender_name: Option<String>,
    body: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    read: bool,
}

fn message_from_notification(dto: NotificationDto) -> ChatMessage {
    ChatMessage {
        id: dto.id,
        role: SenderRole::Agent,
        sender_name: dto.sender_name.unwrap_or_else(|| "Parceldesk Support".to_string()),
        content: dto.body,
        kind: MessageKind::Text,
        timestamp: dto.created_at,
        read: dto.read,
    }
}

/// REST surface of the support widget: message create, attachment upload,
/// history. Fire-and-forget; results come back as `AppEvent`s.
#[derive(Clone)]
pub struct SupportApi {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    tx: mpsc::Sender<AppEvent>,
    runtime: Handle,
}

impl SupportApi {
    pub fn new(config: &AppConfig, tx: mpsc::Sender<AppEvent>, runtime: Handle) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base.clone(),
            auth_token: config.auth_token.clone(),
            tx,
            runtime,
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// REST fallback for message delivery when the socket is down.
    pub fn send_support_message(&self, session_id: &str, content: &str) {
        let this = self.clone();
        let session_id = session_id.to_string();
        let content = content.to_string();
        self.runtime.spawn(async move {
            let body = CreateMessageBody {
                session_id: &session_id,
                content: &content,
                message_type: MessageKind::Text,
            };
            let result = this
                .authorized(this.http.post(format!("{}/support/messages", this.base_url)))
                .json(&body)
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            if let Err(err) = result {
                tracing::warn!(%err, "support message create failed");
                let _ = this
                    .tx
                    .send(AppEvent::ChatError(format!("failed to send message: {err}")));
            }
        });
    }

    pub fn upload_attachment(&self, session_id: &str, path: PathBuf) {
        let this = self.clone();
        let session_id = session_id.to_string();
        self.runtime.spawn(async move {
            match this.do_upload(&session_id, &path).await {
                Ok(file_name) => {
                    let _ = this.tx.send(AppEvent::AttachmentUploaded {
                        file_name,
                        kind: kind_for_path(&path),
                    });
                }
                Err(err) => {
                    tracing::warn!(%err, path = %path.display(), "attachment upload failed");
                    let _ = this.tx.send(AppEvent::ChatError(err.to_string()));
                }
            }
        });
    }

    async fn do_upload(&self, session_id: &str, path: &Path) -> Result<String, SupportApiError> {
        let metadata = tokio::fs::metadata(path).await?;
        validate_attachment_size(metadata.len())?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let bytes = tokio::fs::read(path).await?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone());
        let form = reqwest::multipart::Form::new()
            .text("session_id", session_id.to_string())
            .part("file", part);

        self.authorized(self.http.post(format!("{}/support/attachments", self.base_url)))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        Ok(file_name)
    }

    pub fn load_history(&self, session_id: &str) {
        let this = self.clone();
        let session_id = session_id.to_string();
        self.runtime.spawn(async move {
            let result = this
                .authorized(this.http.get(format!("{}/notifications", this.base_url)))
                .query(&[("session_id", session_id.as_str())])
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match result {
                Ok(resp) => match resp.json::<Vec<NotificationDto>>().await {
                    Ok(items) => {
                        let history = items.into_iter().map(message_from_notification).collect();
                        let _ = this.tx.send(AppEvent::HistoryLoaded(history));
                    }
                    Err(err) => {
                        tracing::warn!(%err, "chat history payload did not parse");
                    }
                },
                Err(err) => {
                    // History is best-effort; a fresh session works without it.
                    tracing::warn!(%err, "chat history fetch failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_attachment_is_rejected_before_any_request() {
        let err = validate_attachment_size(MAX_ATTACHMENT_BYTES + 1)
            .expect_err("oversized attachment should be rejected");
        assert!(matches!(err, SupportApiError::AttachmentTooLarge { .. }));
    }

    #[test]
    fn attachment_at_the_limit_is_accepted() {
        validate_attachment_size(MAX_ATTACHMENT_BYTES).expect("limit-sized attachment should pass");
    }

    #[test]
    fn image_extensions_map_to_image_kind() {
        assert_eq!(kind_for_path(Path::new("receipt.PNG")), MessageKind::Image);
        assert_eq!(kind_for_path(Path::new("photo.jpeg")), MessageKind::Image);
        assert_eq!(kind_for_path(Path::new("contract.pdf")), MessageKind::File);
        assert_eq!(kind_for_path(Path::new("no_extension")), MessageKind::File);
    }

    #[test]
    fn notifications_map_onto_agent_history_messages() {
        let dto = NotificationDto {
            id: "n-1".to_string(),
            sender_name: None,
            body: "Your parcel is out for delivery".to_string(),
            created_at: Utc::now(),
            read: true,
        };

        let message = message_from_notification(dto);
        assert_eq!(message.role, SenderRole::Agent);
        assert_eq!(message.sender_name, "Parceldesk Support");
        assert!(message.read);
    }
}
