use std::time::Duration;

use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use crate::position::round2;

/// Source of latest prices. Unknown symbols and lookup failures are
/// reported as `None`, never as an error.
#[allow(async_fn_in_trait)]
pub trait QuoteProvider {
    async fn get_price(&self, symbol: &str) -> Option<f64>;
}

/// Latest daily close from Yahoo Finance.
pub struct YahooQuotes {
    connector: yahoo::YahooConnector,
    timeout: Duration,
}

impl YahooQuotes {
    pub fn new(timeout: Duration) -> Result<Self, yahoo::YahooError> {
        Ok(YahooQuotes {
            connector: yahoo::YahooConnector::new()?,
            timeout,
        })
    }

    async fn latest_close(&self, symbol: &str) -> Result<f64, String> {
        let response = tokio::time::timeout(
            self.timeout,
            self.connector.get_latest_quotes(symbol, "1d"),
        )
        .await
        .map_err(|_| format!("no answer within {:?}", self.timeout))?
        .map_err(|e| e.to_string())?;
        let quote = response.last_quote().map_err(|e| e.to_string())?;
        Ok(quote.close)
    }
}

impl QuoteProvider for YahooQuotes {
    async fn get_price(&self, symbol: &str) -> Option<f64> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return None;
        }
        match self.latest_close(&symbol).await {
            Ok(close) if close.is_finite() && close > 0.0 => {
                debug!(%symbol, close, "fetched quote");
                Some(round2(close))
            }
            Ok(close) => {
                warn!(%symbol, close, "ignoring unusable quote");
                None
            }
            Err(e) => {
                warn!(%symbol, error = %e, "quote lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) use fixed::StaticQuotes;


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_quotes_are_case_insensitive() {
        let quotes = StaticQuotes::new(&[("AAPL", 187.25)]);
        assert_eq!(quotes.get_price(" aapl").await, Some(187.25));
        assert_eq!(quotes.get_price("MSFT").await, None);
    }

    #[tokio::test]
    async fn test_yahoo_blank_symbol_is_unavailable() {
        let quotes = YahooQuotes::new(Duration::from_secs(1)).unwrap();
        assert_eq!(quotes.get_price("   ").await, None);
    }
}
