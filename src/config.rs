use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{AnyStore, FileStore, SheetsStore};
use crate::store::sheets::{ServiceAccount, SHEETS_API};

pub const APP_NAME: &str = "stock_tracker";
pub const CONFIG_NAME: &str = "config";

/// Where the ledger table lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    File {
        path: String,
    },
    Sheets {
        /// Path of the service-account key file; empty means `GCP_CREDENTIALS`.
        #[serde(default)]
        credentials: String,
        spreadsheet_id: String,
        #[serde(default = "default_worksheet")]
        worksheet: String,
    },
}

fn default_worksheet() -> String {
    "Sheet1".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub benchmark: String,
    pub request_timeout_secs: u64,
    pub history_db: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::File {
                path: "ledger.json".to_string(),
            },
            benchmark: "SPY".to_string(),
            request_timeout_secs: 10,
            history_db: "database".to_string(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Builds the configured store; `file` overrides it with a local file.
    pub fn open_store(&self, file: Option<&str>) -> Result<AnyStore, StoreError> {
        if let Some(path) = file.filter(|p| !p.is_empty()) {
            return Ok(AnyStore::File(FileStore::new(path)));
        }
        match &self.store {
            StoreConfig::File { path } => Ok(AnyStore::File(FileStore::new(path))),
            StoreConfig::Sheets {
                credentials,
                spreadsheet_id,
                worksheet,
            } => {
                let account = ServiceAccount::load(credentials)?;
                let store = SheetsStore::new(
                    account,
                    SHEETS_API,
                    spreadsheet_id,
                    worksheet,
                    self.request_timeout(),
                )?;
                Ok(AnyStore::Sheets(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: Config = serde_json::from_str(
            r#"{"store": {"kind": "sheets", "spreadsheet_id": "abc"}, "benchmark": "QQQ"}"#,
        )
        .unwrap();
        assert_eq!(cfg.benchmark, "QQQ");
        assert_eq!(cfg.request_timeout_secs, 10);
        assert_eq!(
            cfg.store,
            StoreConfig::Sheets {
                credentials: String::new(),
                spreadsheet_id: "abc".to_string(),
                worksheet: "Sheet1".to_string(),
            }
        );
    }

    #[test]
    fn test_file_argument_overrides_store() {
        let cfg = Config {
            store: StoreConfig::Sheets {
                credentials: "/nonexistent/creds.json".to_string(),
                spreadsheet_id: "abc".to_string(),
                worksheet: "Sheet1".to_string(),
            },
            ..Default::default()
        };
        match cfg.open_store(Some("mine.json")) {
            Ok(AnyStore::File(store)) => assert_eq!(store.path().to_str(), Some("mine.json")),
            _ => panic!("expected a file store"),
        }
        assert!(matches!(cfg.open_store(None), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_timeout_never_zero() {
        let cfg = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(cfg.request_timeout(), Duration::from_secs(1));
    }
}
