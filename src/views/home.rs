use crate::theme::Theme;
use eframe::egui::{self, RichText};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeAction {
    OpenSupport,
    OpenBilling,
}

/// The marketing landing view. Static content; the buttons only switch views.
#[derive(Default)]
pub struct HomeView;

impl HomeView {
    pub fn ui(&mut self, ui: &mut egui::Ui, theme: &Theme) -> Option<HomeAction> {
        let mut action = None;

        ui.add_space(theme.spacing_24);
        ui.vertical_centered(|ui| {
            ui.label(
                RichText::new("Parceldesk")
                    .color(theme.accent_primary)
                    .size(34.0)
                    .strong(),
            );
            ui.add_space(theme.spacing_8);
            ui.label(RichText::new("Same-day delivery, without the guesswork.").size(20.0));
            ui.label(
                RichText::new(
                    "Track every parcel live, keep your billing in one place, \
                     and reach a human in under a minute when something goes wrong.",
                )
                .color(theme.text_muted),
            );

            ui.add_space(theme.spacing_16);
            ui.horizontal(|ui| {
                // Center the CTA pair by padding half the remaining width.
                let button_span = 340.0;
                ui.add_space((ui.available_width() - button_span).max(0.0) / 2.0);

                let chat_button = egui::Button::new(
                    RichText::new("Chat with support").color(theme.text_on_accent),
                )
                .fill(theme.accent_primary);
                if ui.add(chat_button).clicked() {
                    action = Some(HomeAction::OpenSupport);
                }

                let billing_button = egui::Button::new("View billing history")
                    .stroke(theme.subtle_button_stroke());
                if ui.add(billing_button).clicked() {
                    action = Some(HomeAction::OpenBilling);
                }
            });
        });

        ui.add_space(theme.spacing_24);
        ui.columns(3, |columns| {
            let cards = [
                (
                    "Live tracking",
                    "Watch your courier move on the map and get an arrival window \
                     that tightens as they get closer.",
                ),
                (
                    "Transparent billing",
                    "Every delivery, fee and refund itemized. Filter by date or \
                     status and share the exact view with one link.",
                ),
                (
                    "Human support",
                    "Our assistant answers tracking questions instantly and hands \
                     anything else straight to a person.",
                ),
            ];
            for (column, (title, body)) in columns.iter_mut().zip(cards) {
                theme.card_frame().show(column, |ui| {
                    ui.strong(title);
                    ui.add_space(theme.spacing_4);
                    ui.label(RichText::new(body).color(theme.text_muted));
                });
            }
        });

        action
    }
}
