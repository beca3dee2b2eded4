use crate::chat::escalation::{
    BotAction, EscalationScript, AGENT_ASSIGN_DELAY_MS, BOT_NAME, BOT_REPLY_DELAY_MS,
};
use crate::chat::frames::{ClientFrame, ServerFrame};
use crate::chat::{AgentInfo, ChatMessage, ConnectionStatus, MessageKind, SenderRole};
use crate::config::AppConfig;
use crate::event::AppEvent;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc as async_mpsc;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Retry schedule for a dropped socket: 3 s base, doubling per attempt,
/// capped at 60 s, giving up after 10 attempts.
#[derive(Debug, Default)]
pub struct ReconnectPolicy {
    attempt: u32,
}

impl ReconnectPolicy {
    pub const BASE_DELAY_MS: u64 = 3000;
    pub const MAX_DELAY_MS: u64 = 60_000;
    pub const MAX_ATTEMPTS: u32 = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Delay before the next attempt, or `None` once the policy has given up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= Self::MAX_ATTEMPTS {
            return None;
        }
        let delay = (Self::BASE_DELAY_MS << self.attempt).min(Self::MAX_DELAY_MS);
        self.attempt += 1;
        Some(Duration::from_millis(delay))
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Owns the support socket and the scripted bot. All effects reach the UI
/// through the `AppEvent` channel; the UI calls back in through the methods
/// below, which hand frames to the writer half of the socket task.
#[derive(Clone)]
pub struct ChatClient {
    socket_url: String,
    auth_token: Option<String>,
    tx: mpsc::Sender<AppEvent>,
    runtime: Handle,
    outbound: Arc<Mutex<Option<async_mpsc::UnboundedSender<ClientFrame>>>>,
    script: Arc<Mutex<EscalationScript>>,
    socket_task_running: Arc<AtomicBool>,
}

impl ChatClient {
    pub fn new(config: &AppConfig, tx: mpsc::Sender<AppEvent>, runtime: Handle) -> Self {
        Self {
            socket_url: config.socket_url.clone(),
            auth_token: config.auth_token.clone(),
            tx,
            runtime,
            outbound: Arc::new(Mutex::new(None)),
            script: Arc::new(Mutex::new(EscalationScript::default())),
            socket_task_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the socket task. Safe to call again after the reconnect policy
    /// has given up; a no-op while a socket task is already running.
    pub fn connect(&self) {
        if self
            .socket_task_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let url = self.socket_url.clone();
        let token = self.auth_token.clone();
        let tx = self.tx.clone();
        let outbound_slot = Arc::clone(&self.outbound);
        let running = Arc::clone(&self.socket_task_running);

        let _ = tx.send(AppEvent::ChatStatus(ConnectionStatus::Connecting));

        self.runtime.spawn(async move {
            let mut policy = ReconnectPolicy::new();

            loop {
                match connect_async(url.as_str()).await {
                    Ok((ws, _)) => {
                        policy.reset();
                        let _ = tx.send(AppEvent::ChatStatus(ConnectionStatus::Connected));
                        tracing::info!(url = %url, "support socket connected");

                        let (mut sink, mut stream) = ws.split();

                        if let Some(token) = token.clone() {
                            let frame = ClientFrame::Authenticate { token };
                            if let Ok(text) = serde_json::to_string(&frame) {
                                if sink.send(WsMessage::Text(text.into())).await.is_err() {
                                    tracing::warn!("authenticate frame failed to send");
                                }
                            }
                        }

                        let (out_tx, mut out_rx) = async_mpsc::unbounded_channel::<ClientFrame>();
                        {
                            let mut slot = outbound_slot.lock().expect("outbound slot poisoned");
                            *slot = Some(out_tx);
                        }

                        loop {
                            tokio::select! {
                                frame = out_rx.recv() => {
                                    let Some(frame) = frame else { break };
                                    let text = match serde_json::to_string(&frame) {
                                        Ok(text) => text,
                                        Err(err) => {
                                            tracing::warn!(%err, "dropping unserializable frame");
                                            continue;
                                        }
                                    };
                                    if let Err(err) = sink.send(WsMessage::Text(text.into())).await {
                                        let _ = tx.send(AppEvent::ChatError(format!(
                                            "failed to send message: {err}"
                                        )));
                                        break;
                                    }
                                }
                                inbound = stream.next() => {
                                    match inbound {
                                        Some(Ok(WsMessage::Text(text))) => {
                                            Self::dispatch_frame(&tx, &text);
                                        }
                                        Some(Ok(WsMessage::Close(_))) | None => break,
                                        Some(Ok(_)) => {}
                                        Some(Err(err)) => {
                                            tracing::warn!(%err, "support socket error");
                                            break;
                                        }
                                    }
                                }
                            }
                        }

                        let mut slot = outbound_slot.lock().expect("outbound slot poisoned");
                        *slot = None;
                    }
                    Err(err) => {
                        tracing::warn!(%err, url = %url, "support socket connect failed");
                    }
                }

                match policy.next_delay() {
                    Some(delay) => {
                        let _ = tx.send(AppEvent::ChatStatus(ConnectionStatus::Reconnecting {
                            attempt: policy.attempt(),
                        }));
                        sleep(delay).await;
                    }
                    None => {
                        tracing::error!(
                            attempts = ReconnectPolicy::MAX_ATTEMPTS,
                            "giving up on support socket"
                        );
                        let _ = tx.send(AppEvent::ChatStatus(ConnectionStatus::Failed));
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
        });
    }

    fn dispatch_frame(tx: &mpsc::Sender<AppEvent>, text: &str) {
        let frame: ServerFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "ignoring unrecognized server frame");
                return;
            }
        };

        let event = match frame {
            ServerFrame::AgentAssigned {
                agent_name,
                agent_title,
            } => {
                let avatar_initial = agent_name.chars().next().unwrap_or('?');
                AppEvent::AgentAssigned(AgentInfo {
                    name: agent_name,
                    title: agent_title.unwrap_or_else(|| "Support Agent".to_string()),
                    avatar_initial,
                })
            }
            ServerFrame::Typing { is_typing } => AppEvent::AgentTyping(is_typing),
            ServerFrame::QueueUpdate {
                position,
                wait_estimate_minutes,
            } => AppEvent::QueueUpdate {
                position,
                wait_estimate_minutes,
            },
            message @ ServerFrame::Message { .. } => match message.into_message() {
                Some(message) => AppEvent::MessageReceived(message),
                None => return,
            },
        };
        let _ = tx.send(event);
    }

    fn queue_frame(&self, frame: ClientFrame) -> bool {
        let slot = self.outbound.lock().expect("outbound slot poisoned");
        match slot.as_ref() {
            Some(out) => out.send(frame).is_ok(),
            None => false,
        }
    }

    /// Resets the bot for a fresh session and emits its greeting.
    pub fn begin_session(&self) {
        let greeting = {
            let mut script = self.script.lock().expect("script lock poisoned");
            *script = EscalationScript::default();
            script.greeting()
        };

        if let Some(text) = greeting {
            let _ = self.tx.send(AppEvent::MessageReceived(ChatMessage::text(
                SenderRole::Bot,
                BOT_NAME,
                text,
            )));
        }
    }

    /// Sends a user text message over the socket and, while no human agent
    /// holds the session, runs the scripted responder. Returns whether the
    /// frame was handed to a live socket.
    pub fn send_user_message(&self, session_id: &str, content: &str, bot_active: bool) -> bool {
        let sent = self.queue_frame(ClientFrame::Message {
            session_id: session_id.to_string(),
            content: content.to_string(),
            message_type: MessageKind::Text,
        });

        if bot_active {
            let action = {
                let mut script = self.script.lock().expect("script lock poisoned");
                script.route(content)
            };
            if let Some(action) = action {
                self.spawn_bot_reply(action);
            }
        }

        sent
    }

    /// Announces an uploaded attachment on the session. Bot routing does not
    /// apply to attachments.
    pub fn notify_attachment(&self, session_id: &str, file_name: &str, kind: MessageKind) -> bool {
        self.queue_frame(ClientFrame::Message {
            session_id: session_id.to_string(),
            content: file_name.to_string(),
            message_type: kind,
        })
    }

    pub fn set_typing(&self, session_id: &str, is_typing: bool) -> bool {
        self.queue_frame(ClientFrame::Typing {
            session_id: session_id.to_string(),
            is_typing,
        })
    }

    fn spawn_bot_reply(&self, action: BotAction) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(AppEvent::AgentTyping(true));
            sleep(Duration::from_millis(BOT_REPLY_DELAY_MS)).await;
            let _ = tx.send(AppEvent::AgentTyping(false));

            match action {
                BotAction::Answer { topic, reply } => {
                    tracing::debug!(?topic, "bot auto-answer");
                    let _ = tx.send(AppEvent::MessageReceived(ChatMessage::text(
                        SenderRole::Bot,
                        BOT_NAME,
                        reply,
                    )));
                }
                BotAction::Escalate { reply } => {
                    let _ = tx.send(AppEvent::MessageReceived(ChatMessage::text(
                        SenderRole::Bot,
                        BOT_NAME,
                        reply,
                    )));
                    sleep(Duration::from_millis(AGENT_ASSIGN_DELAY_MS)).await;
                    let _ = tx.send(AppEvent::AgentAssigned(AgentInfo::placeholder()));
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reconnect_delay_is_three_seconds() {
        let mut policy = ReconnectPolicy::new();
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(3000)));
    }

    #[test]
    fn reconnect_delays_double_and_cap() {
        let mut policy = ReconnectPolicy::new();
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(
            delays,
            vec![3000, 6000, 12_000, 24_000, 48_000, 60_000, 60_000, 60_000, 60_000, 60_000]
        );
    }

    #[test]
    fn reconnect_gives_up_after_max_attempts() {
        let mut policy = ReconnectPolicy::new();
        for _ in 0..ReconnectPolicy::MAX_ATTEMPTS {
            assert!(policy.next_delay().is_some());
        }
        assert!(policy.next_delay().is_none());
    }

    #[test]
    fn reset_restores_the_base_delay() {
        let mut policy = ReconnectPolicy::new();
        policy.next_delay();
        policy.next_delay();
        policy.reset();
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(3000)));
        assert_eq!(policy.attempt(), 1);
    }
}
