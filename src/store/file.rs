use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Table, TableStore};
use crate::error::StoreError;

/// A table kept as a JSON document on local disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path().display().to_string(),
            source,
        }
    }
}

impl TableStore for FileStore {
    async fn load(&self) -> Result<Table, StoreError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no ledger file yet");
                return Ok(Table::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        if data.trim().is_empty() {
            return Ok(Table::default());
        }
        let mut table: Table = serde_json::from_str(&data)?;
        table.drop_blank_rows();
        debug!(path = %self.path.display(), rows = table.rows.len(), "loaded ledger file");
        Ok(table)
    }

    // Write next to the target and rename over it so readers never see a
    // half-written file.
    async fn save(&self, table: &Table) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(table)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), rows = table.rows.len(), "saved ledger file");
        Ok(())
    }
}
