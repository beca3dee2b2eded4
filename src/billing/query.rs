use crate::billing::{FilterCriteria, TransactionStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("query string did not parse: {0}")]
    Malformed(String),
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("unknown status `{0}`")]
    UnknownStatus(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<String>,
}

fn params_for(filter: &FilterCriteria, page: u32, limit: u32) -> QueryParams {
    let status = if filter.statuses.is_empty() {
        None
    } else {
        Some(
            filter
                .statuses
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    };

    QueryParams {
        page: Some(page),
        limit: Some(limit),
        date_from: filter.date_from.map(|d| d.format(DATE_FORMAT).to_string()),
        date_to: filter.date_to.map(|d| d.format(DATE_FORMAT).to_string()),
        status,
        search: filter
            .search
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .cloned(),
    }
}

/// Key/value pairs for the transaction listing request.
pub fn pairs(filter: &FilterCriteria, page: u32, limit: u32) -> Vec<(&'static str, String)> {
    let params = params_for(filter, page, limit);
    let mut out = Vec::new();
    if let Some(page) = params.page {
        out.push(("page", page.to_string()));
    }
    if let Some(limit) = params.limit {
        out.push(("limit", limit.to_string()));
    }
    if let Some(date_from) = params.date_from {
        out.push(("date_from", date_from));
    }
    if let Some(date_to) = params.date_to {
        out.push(("date_to", date_to));
    }
    if let Some(status) = params.status {
        out.push(("status", status));
    }
    if let Some(search) = params.search {
        out.push(("search", search));
    }
    out
}

/// The shareable form of the current query, e.g.
/// `page=1&limit=20&status=pending,failed&search=refund`.
pub fn encode(filter: &FilterCriteria, page: u32, limit: u32) -> String {
    serde_urlencoded::to_string(params_for(filter, page, limit)).unwrap_or_default()
}

/// Applies a pasted share string back onto filter state.
pub fn decode(query: &str) -> Result<(FilterCriteria, u32), QueryError> {
    let query = query.trim().trim_start_matches('?');
    let params: QueryParams =
        serde_urlencoded::from_str(query).map_err(|err| QueryError::Malformed(err.to_string()))?;

    let parse_date = |raw: &str| {
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|_| QueryError::InvalidDate(raw.to_string()))
    };

    let mut filter = FilterCriteria {
        date_from: params.date_from.as_deref().map(parse_date).transpose()?,
        date_to: params.date_to.as_deref().map(parse_date).transpose()?,
        ..FilterCriteria::default()
    };

    if let Some(raw) = &params.status {
        for part in raw.split(',').filter(|part| !part.is_empty()) {
            let status = TransactionStatus::parse(part)
                .ok_or_else(|| QueryError::UnknownStatus(part.to_string()))?;
            filter.statuses.insert(status);
        }
    }

    filter.search = params.search.filter(|s| !s.trim().is_empty());

    Ok((filter, params.page.unwrap_or(1)))
}
