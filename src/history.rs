use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::TotalRow;

/// Ledger totals as they were at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub buy_value: f64,
    pub current_value: f64,
    pub dollar_change: f64,
}

impl From<&TotalRow> for Snapshot {
    fn from(total: &TotalRow) -> Self {
        Snapshot {
            buy_value: total.buy_value,
            current_value: total.current_value,
            dollar_change: total.dollar_change,
        }
    }
}

/// Balance snapshots keyed by local timestamp, kept in a sled database.
pub struct BalanceHistory {
    db: sled::Db,
}

impl BalanceHistory {
    pub fn open(path: &str) -> Result<Self, sled::Error> {
        Ok(BalanceHistory {
            db: sled::open(path)?,
        })
    }

    #[cfg(test)]
    pub fn temporary() -> Result<Self, sled::Error> {
        Ok(BalanceHistory {
            db: sled::Config::new().temporary(true).open()?,
        })
    }

    pub fn record(&self, at: chrono::DateTime<chrono::Local>, total: &TotalRow) -> Result<(), sled::Error> {
        let key = at.format("%Y-%m-%d %H:%M:%S").to_string();
        let value = serde_json::to_vec(&Snapshot::from(total))
            .map_err(|e| sled::Error::Unsupported(e.to_string()))?;
        self.db.insert(key.as_bytes(), value)?;

        // block until all operations are stable on disk
        self.db.flush()?;
        debug!(%key, "recorded balance snapshot");
        Ok(())
    }

    /// All snapshots in timestamp order; unreadable entries are skipped.
    pub fn entries(&self) -> Result<Vec<(String, Snapshot)>, sled::Error> {
        let mut entries = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item?;
            let key = String::from_utf8_lossy(&key).to_string();
            match serde_json::from_slice(&value) {
                Ok(snapshot) => entries.push((key, snapshot)),
                Err(e) => debug!(%key, error = %e, "skipping unreadable snapshot"),
            }
        }
        Ok(entries)
    }

    pub fn print(&self) -> Result<(), sled::Error> {
        use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color, Table};

        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            Cell::new("Recorded").add_attribute(Attribute::Bold),
            Cell::new("Invested").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
            Cell::new("$ +/-").add_attribute(Attribute::Bold),
        ]);
        for (at, s) in self.entries()? {
            let c = if s.dollar_change >= 0.0 { Color::Green } else { Color::Red };
            table.add_row(vec![
                Cell::new(at),
                Cell::new(format!("{:.2}", s.buy_value)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}", s.current_value)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}", s.dollar_change))
                    .set_alignment(CellAlignment::Right)
                    .fg(c),
            ]);
        }
        println!("{table}");
        Ok(())
    }
}
