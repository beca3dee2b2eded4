use crate::billing::client::BillingClient;
use crate::chat::api::SupportApi;
use crate::chat::connection::ChatClient;
use crate::chat::{ChatMessage, SenderRole};
use crate::config::AppConfig;
use crate::event::AppEvent;
use crate::theme::Theme;
use crate::views::billing::BillingView;
use crate::views::home::{HomeAction, HomeView};
use crate::views::support::SupportView;
use eframe::egui::{self, RichText};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Home,
    Support,
    Billing,
}

/// The egui application. Owns every view's state; background tasks only
/// reach it through the `AppEvent` channel, drained once per frame.
pub struct ParceldeskApp {
    rx: Receiver<AppEvent>,
    chat: ChatClient,
    api: SupportApi,
    billing_client: BillingClient,
    theme: Theme,
    theme_applied: bool,
    active: View,
    home: HomeView,
    support: SupportView,
    billing: BillingView,
    billing_loaded: bool,
}

impl ParceldeskApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        config: &AppConfig,
        chat: ChatClient,
        api: SupportApi,
        billing_client: BillingClient,
    ) -> Self {
        Self {
            rx,
            chat,
            api,
            billing_client,
            theme: Theme::default(),
            theme_applied: false,
            active: View::Home,
            home: HomeView,
            support: SupportView::new(
                config.display_name().to_string(),
                config.is_authenticated(),
            ),
            billing: BillingView::new(),
            billing_loaded: false,
        }
    }

    fn switch_to(&mut self, view: View) {
        self.active = view;
        match view {
            View::Support => self.support.mark_all_read(),
            View::Billing if !self.billing_loaded => {
                self.billing_loaded = true;
                self.billing.refresh(&self.billing_client);
            }
            _ => {}
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::error!("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        let viewing_support = self.active == View::Support;
        match event {
            AppEvent::ChatStatus(status) => self.support.set_status(status),
            AppEvent::MessageReceived(message) => {
                self.support.push_message(message, viewing_support);
            }
            AppEvent::AgentAssigned(agent) => self.support.on_agent_assigned(agent),
            AppEvent::AgentTyping(is_typing) => self.support.set_other_typing(is_typing),
            AppEvent::QueueUpdate {
                position,
                wait_estimate_minutes,
            } => self.support.on_queue_update(position, wait_estimate_minutes),
            AppEvent::HistoryLoaded(history) => self.support.on_history(history),
            AppEvent::AttachmentUploaded { file_name, kind } => {
                // Upload succeeded; announce the file on the session and show
                // it in the transcript.
                if let Some(session_id) = self.support.session_id() {
                    self.chat.notify_attachment(&session_id, &file_name, kind);
                }
                let message = ChatMessage::attachment(
                    SenderRole::User,
                    self.support.display_name.clone(),
                    file_name,
                    kind,
                );
                self.support.push_message(message, viewing_support);
            }
            AppEvent::ChatError(message) => self.support.on_error(message),
            AppEvent::TransactionsLoaded { seq, page } => {
                if self.billing_client.is_current(seq) {
                    self.billing.on_transactions(page);
                } else {
                    tracing::debug!(seq, "dropping stale transaction listing");
                }
            }
            AppEvent::SummaryLoaded { seq, summary } => {
                if self.billing_client.is_current(seq) {
                    self.billing.on_summary(summary);
                } else {
                    tracing::debug!(seq, "dropping stale billing summary");
                }
            }
            AppEvent::TransactionDetail(transaction) => self.billing.on_detail(*transaction),
            AppEvent::BillingError { seq, message } => match seq {
                Some(seq) if !self.billing_client.is_current(seq) => {
                    tracing::debug!(seq, "dropping stale billing error");
                }
                seq => self.billing.on_error(seq.is_some(), message),
            },
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar")
            .frame(self.theme.panel_frame(self.theme.surface_0, 10))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Parceldesk")
                            .color(self.theme.accent_primary)
                            .strong(),
                    );
                    ui.separator();

                    let mut target = None;
                    if ui
                        .selectable_label(self.active == View::Home, "Home")
                        .clicked()
                    {
                        target = Some(View::Home);
                    }

                    let unread = self.support.unread_count();
                    let support_label = if unread > 0 {
                        format!("Support ({unread})")
                    } else {
                        "Support".to_string()
                    };
                    if ui
                        .selectable_label(self.active == View::Support, support_label)
                        .clicked()
                    {
                        target = Some(View::Support);
                    }

                    if ui
                        .selectable_label(self.active == View::Billing, "Billing")
                        .clicked()
                    {
                        target = Some(View::Billing);
                    }

                    if let Some(view) = target {
                        self.switch_to(view);
                    }
                });
            });
    }

    fn render_active_view(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(self.theme.panel_frame(self.theme.surface_1, 16))
            .show(ctx, |ui| match self.active {
                View::Home => {
                    if let Some(action) = self.home.ui(ui, &self.theme) {
                        match action {
                            HomeAction::OpenSupport => self.switch_to(View::Support),
                            HomeAction::OpenBilling => self.switch_to(View::Billing),
                        }
                    }
                }
                View::Support => {
                    self.support.ui(ui, &self.theme, &self.chat, &self.api);
                }
                View::Billing => {
                    self.billing.ui(ui, &self.theme, &self.billing_client);
                }
            });
    }
}

impl eframe::App for ParceldeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            self.theme.apply_visuals(ctx);
            self.theme_applied = true;
        }

        self.drain_events();
        self.support.poll(&self.chat);
        self.billing.poll(&self.billing_client);

        self.render_top_bar(ctx);
        self.render_active_view(ctx);

        // Channel events and polled deadlines need frames to be serviced.
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}
