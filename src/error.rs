//! Error types for stock_tracker
//!
//! Every failure a ledger operation can hit is mapped onto one of the
//! variants of [`LedgerError`], which the command line prints as a message.

use thiserror::Error;

/// Validation errors for a new ledger entry.
///
/// These errors are shown directly to users and should be clear and actionable.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Ticker is required")]
    TickerRequired,

    #[error("Number of shares must be at least 1, got {0}")]
    NonPositiveShares(i64),

    #[error("{field} cannot be negative, got {value}")]
    NegativePrice { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
}

/// Failures of a table store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("could not sign service account token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("sheets API answered {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid sheet location: {0}")]
    Location(String),
}

/// Operation-level errors, reported to the user at the command boundary.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid entry: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("no price available for {0}")]
    PriceUnavailable(String),

    #[error("table store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
