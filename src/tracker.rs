use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::position::NewPosition;
use crate::quote::QuoteProvider;
use crate::store::TableStore;

/// Runs ledger operations against a store: every operation loads a fresh
/// snapshot, and writes only happen after the whole ledger was rebuilt.
pub struct Tracker<S, Q> {
    store: S,
    quotes: Q,
    benchmark: String,
}

impl<S: TableStore, Q: QuoteProvider> Tracker<S, Q> {
    pub fn new(store: S, quotes: Q, benchmark: &str) -> Self {
        Tracker {
            store,
            quotes,
            benchmark: benchmark.trim().to_uppercase(),
        }
    }

    pub async fn load(&self) -> Result<Ledger, LedgerError> {
        let table = self.store.load().await?;
        if table.is_empty() {
            debug!("store holds no rows yet");
        }
        Ok(Ledger::from_table(&table))
    }

    /// The stored ledger with days held brought up to `today`.
    pub async fn display(&self, today: NaiveDate) -> Result<Ledger, LedgerError> {
        Ok(self.load().await?.refresh_display(today))
    }

    /// Load, append one entry, recompute, save the whole ledger.
    pub async fn add_entry(
        &self,
        entry: NewPosition,
        today: NaiveDate,
    ) -> Result<Ledger, LedgerError> {
        let ledger = self.load().await?;
        let updated = ledger
            .add_entry(entry, &self.quotes, &self.benchmark, today)
            .await?;
        self.store.save(&updated.to_table()).await?;
        info!(
            positions = updated.positions().len(),
            "entry added and totals updated"
        );
        Ok(updated)
    }
}
