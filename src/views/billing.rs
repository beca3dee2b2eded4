use crate::billing::client::BillingClient;
use crate::billing::{
    query, BillingSummary, FilterCriteria, Transaction, TransactionPage, TransactionStatus,
};
use crate::debounce::Debounce;
use crate::theme::Theme;
use chrono::NaiveDate;
use eframe::egui::{self, Color32, RichText, ScrollArea};
use std::time::Duration;

pub const SEARCH_DEBOUNCE_MS: u64 = 500;
pub const PAGE_SIZE: u32 = 20;

/// The billing history dashboard: filter row, summary tiles, transaction
/// table with paging, a shareable query string, and a detail pane. Stale
/// responses never reach this view; the event loop drops anything whose
/// sequence tag the billing client no longer considers current.
pub struct BillingView {
    filter: FilterCriteria,
    page: u32,
    current: TransactionPage,
    summary: Option<BillingSummary>,
    detail: Option<Transaction>,
    date_from_input: String,
    date_to_input: String,
    search_input: String,
    search_debounce: Debounce,
    share_input: String,
    loading: bool,
    banner: Option<String>,
}

impl BillingView {
    pub fn new() -> Self {
        Self {
            filter: FilterCriteria::default(),
            page: 1,
            current: TransactionPage::default(),
            summary: None,
            detail: None,
            date_from_input: String::new(),
            date_to_input: String::new(),
            search_input: String::new(),
            search_debounce: Debounce::new(Duration::from_millis(SEARCH_DEBOUNCE_MS)),
            share_input: String::new(),
            loading: false,
            banner: None,
        }
    }

    /// The current query in its shareable form.
    pub fn share_string(&self) -> String {
        query::encode(&self.filter, self.page, PAGE_SIZE)
    }

    pub fn refresh(&mut self, client: &BillingClient) {
        client.refresh(&self.filter, self.page, PAGE_SIZE);
        self.loading = true;
    }

    /// Frame tick: fires the pending search refetch once the field has been
    /// quiet for half a second.
    pub fn poll(&mut self, client: &BillingClient) {
        if self.search_debounce.fire() {
            self.commit_search();
            self.refresh(client);
        }
    }

    pub fn on_transactions(&mut self, page: TransactionPage) {
        self.current = page;
        self.loading = false;
    }

    pub fn on_summary(&mut self, summary: BillingSummary) {
        self.summary = Some(summary);
    }

    pub fn on_detail(&mut self, transaction: Transaction) {
        self.detail = Some(transaction);
    }

    /// `listing_failed` marks errors from the tagged listing/summary fetches,
    /// which also end the loading state; detail errors only raise the banner.
    pub fn on_error(&mut self, listing_failed: bool, message: String) {
        if listing_failed {
            self.loading = false;
        }
        self.banner = Some(message);
    }

    fn commit_search(&mut self) {
        let trimmed = self.search_input.trim();
        self.filter.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self.page = 1;
    }

    /// Non-search filter edits take effect immediately and restart paging.
    fn apply_filter_change(&mut self, client: &BillingClient) {
        self.page = 1;
        self.refresh(client);
    }

    /// Parses a date field, treating a blank field as "no bound". Returns
    /// false (and raises the banner) when the text is not a date.
    fn commit_date(input: &str, slot: &mut Option<NaiveDate>, banner: &mut Option<String>) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            let changed = slot.is_some();
            *slot = None;
            return changed;
        }
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => {
                let changed = *slot != Some(date);
                *slot = Some(date);
                changed
            }
            Err(_) => {
                *banner = Some(format!("`{trimmed}` is not a date (expected YYYY-MM-DD)"));
                false
            }
        }
    }

    /// Applies a pasted share string onto the filter state. Returns whether a
    /// refetch is needed.
    fn apply_share_input(&mut self) -> bool {
        match query::decode(&self.share_input) {
            Ok((filter, page)) => {
                self.search_input = filter.search.clone().unwrap_or_default();
                self.date_from_input = filter
                    .date_from
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                self.date_to_input = filter
                    .date_to
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                self.filter = filter;
                self.page = page;
                self.search_debounce.cancel();
                self.share_input.clear();
                self.banner = None;
                true
            }
            Err(err) => {
                self.banner = Some(err.to_string());
                false
            }
        }
    }

    fn amount_label(amount: f64, currency: &str) -> String {
        format!("{amount:.2} {currency}")
    }

    fn status_color(status: TransactionStatus, theme: &Theme) -> Color32 {
        match status {
            TransactionStatus::Completed => theme.success,
            TransactionStatus::Pending => theme.warning,
            TransactionStatus::Failed => theme.danger,
            TransactionStatus::Refunded => theme.accent_primary,
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, theme: &Theme, client: &BillingClient) {
        ui.horizontal(|ui| {
            ui.heading("Billing history");
            if self.loading {
                ui.separator();
                ui.label(RichText::new("Loading...").color(theme.text_muted));
            }
        });
        ui.separator();

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

        self.render_filter_row(ui, theme, client);
        self.render_summary_tiles(ui, theme);
        self.render_table(ui, theme, client);
        self.render_pagination(ui, theme, client);
        self.render_share_row(ui, theme, client);
        self.render_detail(ui, theme);
    }

    fn render_filter_row(&mut self, ui: &mut egui::Ui, theme: &Theme, client: &BillingClient) {
        theme.card_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label("From");
                let from = ui.add(
                    egui::TextEdit::singleline(&mut self.date_from_input)
                        .desired_width(90.0)
                        .hint_text("YYYY-MM-DD"),
                );
                ui.label("To");
                let to = ui.add(
                    egui::TextEdit::singleline(&mut self.date_to_input)
                        .desired_width(90.0)
                        .hint_text("YYYY-MM-DD"),
                );

                // Date edits commit when the field loses focus.
                let mut changed = false;
                if from.lost_focus() {
                    changed |= Self::commit_date(
                        &self.date_from_input,
                        &mut self.filter.date_from,
                        &mut self.banner,
                    );
                }
                if to.lost_focus() {
                    changed |= Self::commit_date(
                        &self.date_to_input,
                        &mut self.filter.date_to,
                        &mut self.banner,
                    );
                }
                if changed {
                    self.apply_filter_change(client);
                }

                ui.separator();
                for status in TransactionStatus::ALL {
                    let selected = self.filter.statuses.contains(&status);
                    if ui.selectable_label(selected, status.label()).clicked() {
                        self.filter.toggle_status(status);
                        self.apply_filter_change(client);
                    }
                }

                ui.separator();
                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.search_input)
                        .desired_width(ui.available_width().max(80.0))
                        .hint_text("Search reference or id..."),
                );
                if search.changed() {
                    self.search_debounce.trigger();
                }
            });
        });
    }

    fn render_summary_tiles(&mut self, ui: &mut egui::Ui, theme: &Theme) {
        let summary = self.summary.unwrap_or_default();
        let tiles = [
            ("Total spent", summary.total_spent, theme.text_primary),
            ("Tax", summary.total_tax, theme.text_primary),
            ("Pending", summary.pending_amount, theme.warning),
            ("Refunded", summary.refunded_amount, theme.accent_primary),
        ];

        ui.columns(tiles.len(), |columns| {
            for (column, (title, value, color)) in columns.iter_mut().zip(tiles) {
                theme.card_frame().show(column, |ui| {
                    ui.label(RichText::new(title).color(theme.text_muted));
                    ui.label(RichText::new(format!("{value:.2}")).size(20.0).strong().color(color));
                });
            }
        });
    }

    fn render_table(&mut self, ui: &mut egui::Ui, theme: &Theme, client: &BillingClient) {
        if self.current.items.is_empty() {
            theme.card_frame().show(ui, |ui| {
                let text = if self.loading {
                    "Fetching transactions..."
                } else {
                    "No transactions match the current filter."
                };
                ui.label(RichText::new(text).color(theme.text_muted));
            });
            return;
        }

        let table_height = (ui.available_height() - 180.0).max(140.0);
        let mut open_detail: Option<String> = None;
        ScrollArea::vertical()
            .id_salt("billing_table")
            .max_height(table_height)
            .show(ui, |ui| {
                egui::Grid::new("billing_rows")
                    .num_columns(6)
                    .striped(true)
                    .spacing([theme.spacing_16, theme.spacing_8])
                    .show(ui, |ui| {
                        ui.strong("Date");
                        ui.strong("Delivery");
                        ui.strong("Amount");
                        ui.strong("Fee");
                        ui.strong("Status");
                        ui.strong("");
                        ui.end_row();

                        for tx in &self.current.items {
                            ui.label(tx.created_at.format("%Y-%m-%d %H:%M").to_string());
                            ui.label(tx.delivery_reference.as_deref().unwrap_or("—"));
                            ui.label(Self::amount_label(tx.amount, &tx.currency));
                            ui.label(Self::amount_label(tx.fee, &tx.currency));
                            ui.label(
                                RichText::new(tx.status.label())
                                    .color(Self::status_color(tx.status, theme)),
                            );
                            if ui.small_button("Details").clicked() {
                                open_detail = Some(tx.id.clone());
                            }
                            ui.end_row();
                        }
                    });
            });

        if let Some(id) = open_detail {
            client.load_detail(&id);
        }
    }

    fn render_pagination(&mut self, ui: &mut egui::Ui, theme: &Theme, client: &BillingClient) {
        let total_pages = self.current.total_pages.max(1);
        ui.horizontal(|ui| {
            if ui.add_enabled(self.page > 1, egui::Button::new("Previous")).clicked() {
                self.page -= 1;
                self.refresh(client);
            }
            ui.label(format!("Page {} of {}", self.page, total_pages));
            if ui
                .add_enabled(self.page < total_pages, egui::Button::new("Next"))
                .clicked()
            {
                self.page += 1;
                self.refresh(client);
            }
            ui.separator();
            ui.label(
                RichText::new(format!("{} transactions", self.current.total_count))
                    .color(theme.text_muted),
            );
        });
    }

    fn render_share_row(&mut self, ui: &mut egui::Ui, theme: &Theme, client: &BillingClient) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Share").color(theme.text_muted));
            let share = self.share_string();
            ui.monospace(&share);
            if ui.small_button("Copy").clicked() {
                ui.ctx().copy_text(share);
            }
            ui.separator();
            ui.add(
                egui::TextEdit::singleline(&mut self.share_input)
                    .desired_width(160.0)
                    .hint_text("Paste a shared query..."),
            );
            if ui.small_button("Apply").clicked() && self.apply_share_input() {
                self.refresh(client);
            }
        });
    }

    fn render_detail(&mut self, ui: &mut egui::Ui, theme: &Theme) {
        let Some(tx) = self.detail.clone() else {
            return;
        };
        theme.card_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.strong(format!("Transaction {}", tx.id));
                ui.label(
                    RichText::new(tx.status.label()).color(Self::status_color(tx.status, theme)),
                );
                if ui.small_button("Close").clicked() {
                    self.detail = None;
                }
            });
            if let Some(reference) = tx.delivery_reference.as_deref() {
                ui.label(format!("Delivery {reference}"));
            }
            ui.label(format!(
                "Amount {}  ·  fee {}  ·  tax {}",
                Self::amount_label(tx.amount, &tx.currency),
                Self::amount_label(tx.fee, &tx.currency),
                Self::amount_label(tx.tax, &tx.currency),
            ));
            ui.label(
                RichText::new(format!(
                    "Created {}  ·  updated {}",
                    tx.created_at.format("%Y-%m-%d %H:%M"),
                    tx.updated_at.format("%Y-%m-%d %H:%M"),
                ))
                .color(theme.text_muted),
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn page_with(ids: &[&str]) -> TransactionPage {
        TransactionPage {
            items: ids
                .iter()
                .map(|id| Transaction {
                    id: id.to_string(),
                    delivery_reference: None,
                    amount: 10.0,
                    currency: "EUR".to_string(),
                    status: TransactionStatus::Completed,
                    fee: 1.0,
                    tax: 2.0,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
                .collect(),
            page: 1,
            total_pages: 1,
            total_count: ids.len() as u64,
        }
    }

    #[test]
    fn applying_a_listing_ends_the_loading_state() {
        let mut view = BillingView::new();
        view.loading = true;

        view.on_transactions(page_with(&["tx-1"]));

        assert_eq!(view.current.items[0].id, "tx-1");
        assert!(!view.loading);
    }

    #[test]
    fn listing_errors_end_the_loading_state() {
        let mut view = BillingView::new();
        view.loading = true;

        view.on_error(true, "fetch failed".to_string());

        assert!(!view.loading);
        assert_eq!(view.banner.as_deref(), Some("fetch failed"));
    }

    #[test]
    fn detail_errors_only_raise_the_banner() {
        let mut view = BillingView::new();
        view.loading = true;

        view.on_error(false, "detail fetch failed".to_string());

        assert!(view.loading, "a detail failure must not end the listing fetch");
        assert_eq!(view.banner.as_deref(), Some("detail fetch failed"));
    }

    #[test]
    fn committing_a_search_resets_to_the_first_page() {
        let mut view = BillingView::new();
        view.page = 4;
        view.search_input = "  refund  ".to_string();

        view.commit_search();

        assert_eq!(view.filter.search.as_deref(), Some("refund"));
        assert_eq!(view.page, 1);
    }

    #[test]
    fn blank_search_clears_the_filter() {
        let mut view = BillingView::new();
        view.filter.search = Some("refund".to_string());
        view.search_input = "   ".to_string();

        view.commit_search();

        assert!(view.filter.search.is_none());
    }

    #[test]
    fn keystrokes_arm_the_debounce_without_touching_the_filter() {
        let mut view = BillingView::new();
        view.search_input = "ref".to_string();
        view.search_debounce.trigger();

        assert!(view.search_debounce.pending());
        assert!(view.filter.search.is_none(), "filter changes only on fire");
    }

    #[test]
    fn date_commit_accepts_iso_dates_and_blanks() {
        let mut banner = None;
        let mut slot = None;

        assert!(BillingView::commit_date("2026-05-01", &mut slot, &mut banner));
        assert_eq!(slot, NaiveDate::from_ymd_opt(2026, 5, 1));
        assert!(banner.is_none());

        assert!(BillingView::commit_date("", &mut slot, &mut banner));
        assert!(slot.is_none());
    }

    #[test]
    fn date_commit_rejects_other_formats() {
        let mut banner = None;
        let mut slot = None;

        assert!(!BillingView::commit_date("05/01/2026", &mut slot, &mut banner));
        assert!(slot.is_none());
        assert!(banner.expect("bad date should raise the banner").contains("YYYY-MM-DD"));
    }

    #[test]
    fn share_string_round_trips_through_apply() {
        let mut view = BillingView::new();
        view.filter.toggle_status(TransactionStatus::Pending);
        view.filter.search = Some("groceries".to_string());
        view.page = 3;
        let shared = view.share_string();

        let mut other = BillingView::new();
        other.share_input = shared;
        assert!(other.apply_share_input(), "valid share string should apply");
        assert_eq!(other.filter, view.filter);
        assert_eq!(other.page, 3);
        assert_eq!(other.search_input, "groceries", "edit buffer follows the filter");
    }

    #[test]
    fn malformed_share_string_raises_the_banner() {
        let mut view = BillingView::new();
        view.share_input = "status=chargeback".to_string();
        assert!(!view.apply_share_input());
        assert!(view.banner.is_some());
    }
}
