use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub mod client;
pub mod query;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub const ALL: [Self; 4] = [Self::Completed, Self::Pending, Self::Failed, Self::Refunded];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == raw)
    }
}

/// A billing record, read-only on this side. Amounts are in major currency
/// units alongside an ISO currency code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub delivery_reference: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub fee: f64,
    pub tax: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

/// Aggregates over the full filtered set, computed server-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingSummary {
    pub total_spent: f64,
    pub total_tax: f64,
    pub pending_amount: f64,
    pub refunded_amount: f64,
}

/// The user-editable query. Every field is optional; an empty status set
/// means "all statuses".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub statuses: BTreeSet<TransactionStatus>,
    pub search: Option<String>,
}

impl FilterCriteria {
    pub fn toggle_status(&mut self, status: TransactionStatus) {
        if !self.statuses.remove(&status) {
            self.statuses.insert(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_string_form() {
        for status in TransactionStatus::ALL {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TransactionStatus::parse("chargeback"), None);
    }

    #[test]
    fn transaction_parses_with_optional_delivery_reference_absent() {
        let raw = r#"{
            "id": "tx-100",
            "amount": 24.5,
            "currency": "EUR",
            "status": "completed",
            "fee": 1.2,
            "tax": 4.9,
            "created_at": "2026-05-01T10:00:00Z",
            "updated_at": "2026-05-01T10:05:00Z"
        }"#;
        let tx: Transaction = serde_json::from_str(raw).expect("transaction should parse");
        assert!(tx.delivery_reference.is_none());
        assert_eq!(tx.status, TransactionStatus::Completed);
    }

    #[test]
    fn toggling_a_status_adds_then_removes_it() {
        let mut filter = FilterCriteria::default();
        filter.toggle_status(TransactionStatus::Pending);
        assert!(filter.statuses.contains(&TransactionStatus::Pending));
        filter.toggle_status(TransactionStatus::Pending);
        assert!(filter.statuses.is_empty());
    }
}
