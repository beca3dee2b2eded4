use crate::billing::{query, BillingSummary, FilterCriteria, Transaction, TransactionPage};
use crate::config::AppConfig;
use crate::event::AppEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use tokio::runtime::Handle;

/// Monotonic tags for in-flight fetches. A response is only applied when its
/// tag is still the latest one issued; anything older lost the race to a
/// newer filter and is dropped.
#[derive(Debug, Default)]
pub struct StaleGuard {
    issued: AtomicU64,
}

impl StaleGuard {
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.issued.load(Ordering::SeqCst)
    }
}

/// Read-only client for the billing endpoints. Listing and summary fetches
/// for one query generation share a sequence tag.
#[derive(Clone)]
pub struct BillingClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    tx: mpsc::Sender<AppEvent>,
    runtime: Handle,
    guard: Arc<StaleGuard>,
}

impl BillingClient {
    pub fn new(config: &AppConfig, tx: mpsc::Sender<AppEvent>, runtime: Handle) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base.clone(),
            auth_token: config.auth_token.clone(),
            tx,
            runtime,
            guard: Arc::new(StaleGuard::default()),
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Whether `seq` is the tag of the most recent `refresh`. Responses
    /// carrying an older tag lost the race to a newer query and are dropped
    /// by the event loop.
    pub fn is_current(&self, seq: u64) -> bool {
        self.guard.is_current(seq)
    }

    /// Refetches the listing and the full-set summary for the given query.
    /// Both responses carry a freshly issued sequence tag.
    pub fn refresh(&self, filter: &FilterCriteria, page: u32, limit: u32) {
        let seq = self.guard.issue();
        let pairs = query::pairs(filter, page, limit);

        let this = self.clone();
        let listing_pairs = pairs.clone();
        self.runtime.spawn(async move {
            let result = this
                .authorized(this.http.get(format!("{}/billing/transactions", this.base_url)))
                .query(&listing_pairs)
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            let event = match result {
                Ok(resp) => match resp.json::<TransactionPage>().await {
                    Ok(page) => AppEvent::TransactionsLoaded { seq, page },
                    Err(err) => AppEvent::BillingError {
                        seq: Some(seq),
                        message: format!("transaction listing did not parse: {err}"),
                    },
                },
                Err(err) => AppEvent::BillingError {
                    seq: Some(seq),
                    message: format!("failed to load transactions: {err}"),
                },
            };
            let _ = this.tx.send(event);
        });

        // Summary ignores paging; it aggregates the whole filtered set.
        let summary_pairs: Vec<(&'static str, String)> = pairs
            .into_iter()
            .filter(|(key, _)| *key != "page" && *key != "limit")
            .collect();
        let this = self.clone();
        self.runtime.spawn(async move {
            let result = this
                .authorized(this.http.get(format!("{}/billing/summary", this.base_url)))
                .query(&summary_pairs)
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match result {
                Ok(resp) => match resp.json::<BillingSummary>().await {
                    Ok(summary) => {
                        let _ = this.tx.send(AppEvent::SummaryLoaded { seq, summary });
                    }
                    Err(err) => {
                        tracing::warn!(%err, "billing summary payload did not parse");
                    }
                },
                Err(err) => {
                    // The listing error already raises a banner; the summary
                    // tiles just keep their previous values.
                    tracing::warn!(%err, "billing summary fetch failed");
                }
            }
        });
    }

    pub fn load_detail(&self, id: &str) {
        let this = self.clone();
        let id = id.to_string();
        self.runtime.spawn(async move {
            let result = this
                .authorized(
                    this.http
                        .get(format!("{}/billing/transactions/{id}", this.base_url)),
                )
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match result {
                Ok(resp) => match resp.json::<Transaction>().await {
                    Ok(tx_detail) => {
                        let _ = this.tx.send(AppEvent::TransactionDetail(Box::new(tx_detail)));
                    }
                    Err(err) => {
                        let _ = this.tx.send(AppEvent::BillingError {
                            seq: None,
                            message: format!("transaction detail did not parse: {err}"),
                        });
                    }
                },
                Err(err) => {
                    let _ = this.tx.send(AppEvent::BillingError {
                        seq: None,
                        message: format!("failed to load transaction {id}: {err}"),
                    });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_latest_issued_tag_is_current() {
        let guard = StaleGuard::default();
        let first = guard.issue();
        let second = guard.issue();

        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
    }

    #[test]
    fn tags_are_strictly_increasing() {
        let guard = StaleGuard::default();
        let a = guard.issue();
        let b = guard.issue();
        let c = guard.issue();
        assert!(a < b && b < c);
    }
}
