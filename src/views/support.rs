use crate::chat::api::SupportApi;
use crate::chat::connection::ChatClient;
use crate::chat::{
    AgentInfo, ChatMessage, ChatSession, ConnectionStatus, MessageKind, PreChatForm, SenderRole,
};
use crate::debounce::Debounce;
use crate::theme::Theme;
use chrono::Utc;
use eframe::egui::{self, Color32, RichText, ScrollArea};
use std::path::PathBuf;
use std::time::Duration;

pub const TYPING_IDLE_MS: u64 = 1000;

pub struct SupportView {
    pub display_name: String,
    authenticated: bool,
    session: Option<ChatSession>,
    transcript: Vec<ChatMessage>,
    prechat: PreChatForm,
    input_buffer: String,
    attachment_path: String,
    status: ConnectionStatus,
    other_typing: bool,
    typing_sent: bool,
    typing_idle: Debounce,
    banner: Option<String>,
    diagnostics: Vec<String>,
    scroll_to_bottom: bool,
}

impl SupportView {
    pub fn new(display_name: String, authenticated: bool) -> Self {
        Self {
            display_name,
            authenticated,
            session: None,
            transcript: Vec::new(),
            prechat: PreChatForm::default(),
            input_buffer: String::new(),
            attachment_path: String::new(),
            status: ConnectionStatus::Disconnected,
            other_typing: false,
            typing_sent: false,
            typing_idle: Debounce::new(Duration::from_millis(TYPING_IDLE_MS)),
            banner: None,
            diagnostics: Vec::new(),
            scroll_to_bottom: false,
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.as_ref().map(|session| session.id.clone())
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics
            .push(format!("[{}] {}", Utc::now().format("%H:%M:%S"), message.into()));
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
        self.log_diagnostic(format!("connection: {}", Self::status_name(status)));
    }

    fn status_name(status: ConnectionStatus) -> String {
        match status {
            ConnectionStatus::Disconnected => "disconnected".to_string(),
            ConnectionStatus::Connecting => "connecting".to_string(),
            ConnectionStatus::Connected => "connected".to_string(),
            ConnectionStatus::Reconnecting { attempt } => format!("reconnecting (attempt {attempt})"),
            ConnectionStatus::Failed => "failed".to_string(),
        }
    }

    fn status_label(&self, theme: &Theme) -> (String, Color32) {
        match self.status {
            ConnectionStatus::Connected => ("Connected".to_string(), theme.success),
            ConnectionStatus::Connecting => ("Connecting...".to_string(), theme.warning),
            ConnectionStatus::Reconnecting { attempt } => (
                format!("Reconnecting (attempt {attempt})..."),
                theme.warning,
            ),
            ConnectionStatus::Failed => ("Connection failed".to_string(), theme.danger),
            ConnectionStatus::Disconnected => ("Offline".to_string(), theme.text_muted),
        }
    }

    pub fn push_message(&mut self, mut message: ChatMessage, view_active: bool) {
        if view_active {
            message.read = true;
        }
        self.transcript.push(message);
        self.scroll_to_bottom = true;
    }

    pub fn on_history(&mut self, history: Vec<ChatMessage>) {
        self.log_diagnostic(format!("loaded {} history entries", history.len()));
        // History predates anything that arrived live this session.
        self.transcript.splice(0..0, history);
    }

    pub fn on_agent_assigned(&mut self, agent: AgentInfo) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.assign_agent(agent.clone());
        self.other_typing = false;
        self.log_diagnostic(format!("agent assigned: {}", agent.name));
        let notice = ChatMessage::text(
            SenderRole::Bot,
            "Parceldesk",
            format!("{} ({}) joined the chat.", agent.name, agent.title),
        );
        self.push_message(notice, true);
    }

    pub fn set_other_typing(&mut self, is_typing: bool) {
        self.other_typing = is_typing;
    }

    pub fn on_queue_update(&mut self, position: u32, wait_estimate_minutes: Option<u32>) {
        if let Some(session) = self.session.as_mut() {
            session.queue_position = Some(position);
            session.wait_estimate_minutes = wait_estimate_minutes;
        }
    }

    pub fn on_error(&mut self, message: String) {
        self.log_diagnostic(format!("error: {message}"));
        self.banner = Some(message);
    }

    pub fn unread_count(&self) -> usize {
        self.transcript.iter().filter(|m| !m.read).count()
    }

    pub fn mark_all_read(&mut self) {
        for message in &mut self.transcript {
            message.read = true;
        }
    }

    /// Frame tick: stops the typing indicator once the composer has been
    /// quiet for a second.
    pub fn poll(&mut self, chat: &ChatClient) {
        if self.typing_sent && self.typing_idle.fire() {
            if let Some(session_id) = self.session_id() {
                chat.set_typing(&session_id, false);
            }
            self.typing_sent = false;
        }
    }

    fn note_keystroke(&mut self, chat: &ChatClient) {
        let Some(session_id) = self.session_id() else {
            return;
        };
        if !self.typing_sent {
            chat.set_typing(&session_id, true);
            self.typing_sent = true;
        }
        self.typing_idle.trigger();
    }

    fn start_session(&mut self, chat: &ChatClient, api: &SupportApi) {
        if !self.authenticated {
            if let Err(message) = self.prechat.validate() {
                self.banner = Some(message);
                return;
            }
            self.display_name = self.prechat.name.trim().to_string();
        }

        let session = ChatSession::start();
        let session_id = session.id.clone();
        self.session = Some(session);
        self.banner = None;
        self.log_diagnostic(format!("session started: {session_id}"));

        chat.connect();
        chat.begin_session();
        api.load_history(&session_id);

        if !self.authenticated {
            let question = self.prechat.question.trim().to_string();
            if !question.is_empty() {
                self.submit_text(question, chat, api);
            }
        }
    }

    fn submit_text(&mut self, content: String, chat: &ChatClient, api: &SupportApi) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let session_id = session.id.clone();
        let bot_active = !session.agent_assigned;

        let mut message = ChatMessage::text(SenderRole::User, self.display_name.clone(), &content);
        message.read = true;
        self.transcript.push(message);
        self.scroll_to_bottom = true;

        let sent = chat.send_user_message(&session_id, &content, bot_active);
        if !sent {
            // Socket is down; fall back to the REST endpoint so nothing is lost.
            api.send_support_message(&session_id, &content);
        }

        if self.typing_sent {
            chat.set_typing(&session_id, false);
            self.typing_sent = false;
            self.typing_idle.cancel();
        }
    }

    fn submit_input(&mut self, chat: &ChatClient, api: &SupportApi) {
        let content = self.input_buffer.trim().to_string();
        if content.is_empty() {
            return;
        }
        self.input_buffer.clear();
        self.submit_text(content, chat, api);
    }

    fn end_session(&mut self, chat: &ChatClient) {
        if self.typing_sent {
            if let Some(session_id) = self.session_id() {
                chat.set_typing(&session_id, false);
            }
        }
        self.discard_session();
    }

    /// Closing the widget discards the session; the transcript and any queue
    /// state go with it.
    fn discard_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.active = false;
        self.typing_sent = false;
        self.typing_idle.cancel();
        self.transcript.clear();
        self.other_typing = false;
        self.input_buffer.clear();
        self.log_diagnostic(format!("session ended: {}", session.id));
    }

    fn attach_file(&mut self, api: &SupportApi) {
        let path = self.attachment_path.trim().to_string();
        let Some(session_id) = self.session_id() else {
            return;
        };
        if path.is_empty() {
            self.banner = Some("Enter the path of the file to attach".to_string());
            return;
        }
        api.upload_attachment(&session_id, PathBuf::from(path));
        self.attachment_path.clear();
    }

    fn message_line(message: &ChatMessage) -> String {
        let body = match message.kind {
            MessageKind::Text => message.content.clone(),
            MessageKind::Image => format!("sent an image: {}", message.content),
            MessageKind::File => format!("sent a file: {}", message.content),
        };
        format!("[{}] {}", message.sender_name, body)
    }

    fn role_color(&self, role: SenderRole, theme: &Theme) -> Color32 {
        match role {
            SenderRole::User => theme.accent_primary,
            SenderRole::Agent => theme.success,
            SenderRole::Bot => theme.text_muted,
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, theme: &Theme, chat: &ChatClient, api: &SupportApi) {
        self.render_status_row(ui, theme, chat);

        if let Some(banner) = self.banner.clone() {
            theme.card_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(banner).color(theme.danger));
                    if ui.small_button("Dismiss").clicked() {
                        self.banner = None;
                    }
                });
            });
        }

        if self.session.is_none() {
            self.render_prechat(ui, theme, chat, api);
            return;
        }

        self.render_session_header(ui, theme);
        self.render_transcript(ui, theme);
        self.render_composer(ui, theme, chat, api);
        self.render_diagnostics(ui);
    }

    fn render_status_row(&mut self, ui: &mut egui::Ui, theme: &Theme, chat: &ChatClient) {
        let (label, color) = self.status_label(theme);
        let in_session = self.session.as_ref().is_some_and(|session| session.active);
        let mut end_now = false;
        ui.horizontal(|ui| {
            ui.heading("Support");
            ui.separator();
            ui.label(RichText::new(label).color(color));
            if self.status == ConnectionStatus::Failed && ui.button("Retry").clicked() {
                chat.connect();
            }
            if in_session {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    end_now = ui.small_button("End chat").clicked();
                });
            }
        });
        ui.separator();
        if end_now {
            self.end_session(chat);
        }
    }

    fn render_prechat(&mut self, ui: &mut egui::Ui, theme: &Theme, chat: &ChatClient, api: &SupportApi) {
        theme.card_frame().show(ui, |ui| {
            if self.authenticated {
                ui.strong(format!("Welcome back, {}", self.display_name));
                ui.label(
                    RichText::new("Start a chat and our assistant will pick up right away.")
                        .color(theme.text_muted),
                );
                if ui.button("Start chat").clicked() {
                    self.start_session(chat, api);
                }
                return;
            }

            ui.strong("Before we start");
            ui.label(
                RichText::new("Tell us who you are so we can follow up if the chat drops.")
                    .color(theme.text_muted),
            );
            ui.add_space(theme.spacing_8);

            ui.label("Name");
            ui.text_edit_singleline(&mut self.prechat.name);
            ui.label("Email");
            ui.text_edit_singleline(&mut self.prechat.email);
            ui.label("How can we help?");
            ui.text_edit_multiline(&mut self.prechat.question);

            ui.add_space(theme.spacing_8);
            if ui.button("Start chat").clicked() {
                self.start_session(chat, api);
            }
        });
    }

    fn render_session_header(&mut self, ui: &mut egui::Ui, theme: &Theme) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        if let Some(agent) = session.agent.as_ref() {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!(" {} ", agent.avatar_initial))
                        .background_color(theme.accent_muted)
                        .strong(),
                );
                ui.strong(&agent.name);
                ui.label(RichText::new(&agent.title).color(theme.text_muted));
                ui.label(
                    RichText::new(format!(
                        "chat started {}",
                        session.started_at.format("%H:%M")
                    ))
                    .color(theme.text_muted),
                );
            });
        } else if let Some(position) = session.queue_position {
            let wait = session
                .wait_estimate_minutes
                .map(|m| format!(", about {m} min"))
                .unwrap_or_default();
            theme.card_frame().show(ui, |ui| {
                ui.label(
                    RichText::new(format!("You're #{position} in the queue{wait}."))
                        .color(theme.warning),
                );
            });
        }
    }

    fn render_transcript(&mut self, ui: &mut egui::Ui, theme: &Theme) {
        let transcript_height = (ui.available_height() - 190.0).max(120.0);
        ScrollArea::vertical()
            .id_salt("support_transcript")
            .max_height(transcript_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for message in &self.transcript {
                    let color = self.role_color(message.role, theme);
                    ui.label(RichText::new(Self::message_line(message)).color(color));
                }

                if self.other_typing {
                    let who = self
                        .session
                        .as_ref()
                        .and_then(|s| s.agent.as_ref())
                        .map(|a| a.name.clone())
                        .unwrap_or_else(|| "Assistant".to_string());
                    ui.label(RichText::new(format!("{who} is typing...")).italics().color(theme.text_muted));
                }

                if self.scroll_to_bottom {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });
        self.scroll_to_bottom = false;
        ui.separator();
    }

    fn render_composer(&mut self, ui: &mut egui::Ui, theme: &Theme, chat: &ChatClient, api: &SupportApi) {
        let mut send_now = false;
        theme.composer_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.input_buffer)
                        .desired_width(ui.available_width() - 70.0)
                        .hint_text("Type a message..."),
                );
                if response.changed() {
                    self.note_keystroke(chat);
                }
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    send_now = true;
                }

                let clicked = ui
                    .add_enabled(
                        !self.input_buffer.trim().is_empty(),
                        egui::Button::new("Send"),
                    )
                    .clicked();
                send_now |= clicked;
            });
        });
        if send_now {
            self.submit_input(chat, api);
        }

        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.attachment_path)
                    .desired_width(ui.available_width() - 80.0)
                    .hint_text("Path to a file (10 MB max)"),
            );
            if ui.button("Attach").clicked() {
                self.attach_file(api);
            }
        });
    }

    fn render_diagnostics(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("Diagnostics")
            .default_open(false)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt("support_diagnostics")
                    .max_height(90.0)
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for entry in &self.diagnostics {
                            ui.label(entry);
                        }
                    });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> SupportView {
        SupportView::new("Sam".to_string(), true)
    }

    #[test]
    fn messages_arriving_while_elsewhere_count_as_unread() {
        let mut view = view();
        view.push_message(
            ChatMessage::text(SenderRole::Agent, "Maya", "hello"),
            false,
        );
        view.push_message(ChatMessage::text(SenderRole::Agent, "Maya", "still there?"), false);
        assert_eq!(view.unread_count(), 2);

        view.mark_all_read();
        assert_eq!(view.unread_count(), 0);
    }

    #[test]
    fn messages_arriving_while_viewing_are_read_immediately() {
        let mut view = view();
        view.push_message(ChatMessage::text(SenderRole::Agent, "Maya", "hello"), true);
        assert_eq!(view.unread_count(), 0);
    }

    #[test]
    fn history_is_inserted_before_live_messages() {
        let mut view = view();
        view.push_message(ChatMessage::text(SenderRole::Bot, "Bot", "greeting"), true);
        view.on_history(vec![
            ChatMessage::text(SenderRole::Agent, "Maya", "older"),
            ChatMessage::text(SenderRole::Agent, "Maya", "newer"),
        ]);

        let contents: Vec<&str> = view.transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["older", "newer", "greeting"]);
    }

    #[test]
    fn agent_assignment_appends_a_join_notice() {
        let mut view = view();
        view.session = Some(ChatSession::start());
        view.on_agent_assigned(AgentInfo::placeholder());

        let session = view.session.as_ref().expect("session should remain");
        assert!(session.agent_assigned);
        let last = view.transcript.last().expect("join notice should be appended");
        assert!(last.content.contains("joined the chat"));
    }

    #[test]
    fn ending_the_session_discards_it_along_with_the_transcript() {
        let mut view = view();
        view.session = Some(ChatSession::start());
        view.push_message(ChatMessage::text(SenderRole::Agent, "Maya", "hello"), true);
        view.other_typing = true;

        view.discard_session();

        assert!(view.session.is_none());
        assert!(view.transcript.is_empty());
        assert!(!view.other_typing);
    }

    #[test]
    fn queue_updates_only_apply_to_an_open_session() {
        let mut view = view();
        view.on_queue_update(3, Some(5));
        assert!(view.session.is_none());

        view.session = Some(ChatSession::start());
        view.on_queue_update(3, Some(5));
        let session = view.session.as_ref().expect("session should remain");
        assert_eq!(session.queue_position, Some(3));
        assert_eq!(session.wait_estimate_minutes, Some(5));
    }
}
