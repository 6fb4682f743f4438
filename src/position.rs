use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::ValidationError;

/// Round to the 2 decimal places the sheet keeps.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of `part` in `whole` as a percentage; 0 when `whole` is 0.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() {
        0.0
    } else {
        round2(part / whole * 100.0)
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y"];

pub fn parse_purchase_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS.iter().find_map(|fmt| {
        if fmt.contains("%H") {
            chrono::NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .map(|dt| dt.date())
        } else {
            NaiveDate::parse_from_str(s, fmt).ok()
        }
    })
}

pub fn format_purchase_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// A buy entered by the user, before validation and pricing.
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub ticker: String,
    pub shares: i64,
    pub buy_price: f64,
    pub stop_loss: f64,
    pub benchmark_purchase_price: Option<f64>,
    pub remark: String,
}

impl NewPosition {
    /// Checks the entry and normalizes the ticker to uppercase.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.ticker = self.ticker.trim().to_uppercase();
        if self.ticker.is_empty() {
            return Err(ValidationError::TickerRequired);
        }
        if self.shares < 1 {
            return Err(ValidationError::NonPositiveShares(self.shares));
        }
        check_price("Buy price", self.buy_price)?;
        check_price("Stop loss", self.stop_loss)?;
        if let Some(price) = self.benchmark_purchase_price {
            check_price("Benchmark purchase price", price)?;
        }
        // a benchmark purchase price of 0 means "not supplied"
        if self.benchmark_purchase_price == Some(0.0) {
            self.benchmark_purchase_price = None;
        }
        self.remark = self.remark.trim().to_string();
        Ok(self)
    }
}

fn check_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativePrice { field, value });
    }
    Ok(())
}

/// One purchase lot as stored in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker: String,
    pub shares: u64,
    pub buy_price: f64,
    pub current_price: f64,
    pub stop_loss: f64,
    pub stop_loss_profit: f64,
    pub dollar_change: f64,
    pub percent_change: f64,
    pub stop_loss_percent: f64,
    pub buy_value: f64,
    pub current_value: f64,
    pub purchase_date: Option<NaiveDate>,
    pub days_held: Option<i64>,
    pub benchmark_price: f64,
    pub benchmark_percent: f64,
    pub holding: bool,
    pub profit_share: f64,
    pub stop_loss_share: f64,
    pub remark: String,
}

impl Position {
    /// Builds a freshly bought lot from a validated entry and its live prices.
    pub fn open(
        entry: NewPosition,
        current_price: f64,
        benchmark_price: Option<f64>,
        today: NaiveDate,
    ) -> Position {
        let benchmark_percent = match (entry.benchmark_purchase_price, benchmark_price) {
            (Some(bought), Some(now)) if bought > 0.0 => round2((now - bought) / bought * 100.0),
            _ => 0.0,
        };
        let mut position = Position {
            ticker: entry.ticker,
            shares: entry.shares.unsigned_abs(),
            buy_price: entry.buy_price,
            current_price,
            stop_loss: entry.stop_loss,
            stop_loss_profit: 0.0,
            dollar_change: 0.0,
            percent_change: 0.0,
            stop_loss_percent: 0.0,
            buy_value: 0.0,
            current_value: 0.0,
            purchase_date: Some(today),
            days_held: Some(0),
            benchmark_price: benchmark_price.unwrap_or(0.0),
            benchmark_percent,
            holding: true,
            profit_share: 0.0,
            stop_loss_share: 0.0,
            remark: entry.remark,
        };
        if position.buy_price == 0.0 {
            warn!(ticker = %position.ticker, "buy price is 0, storing 0 for percent columns");
        }
        position.recompute();
        position
    }

    /// Recomputes the value columns from shares and prices.
    pub fn recompute(&mut self) {
        let shares = self.shares as f64;
        let buy_value = shares * self.buy_price;
        let current_value = shares * self.current_price;
        let stop_loss_profit = (self.stop_loss - self.buy_price) * shares;

        self.buy_value = round2(buy_value);
        self.current_value = round2(current_value);
        self.dollar_change = round2(current_value - buy_value);
        self.stop_loss_profit = round2(stop_loss_profit);

        if self.buy_price == 0.0 {
            debug!(ticker = %self.ticker, "buy price is 0, percent columns stay 0");
            self.percent_change = 0.0;
            self.stop_loss_percent = 0.0;
        } else {
            self.percent_change = round2((self.current_price / self.buy_price - 1.0) * 100.0);
            self.stop_loss_percent = percent_of(stop_loss_profit, buy_value);
        }
    }

    pub fn refresh_days_held(&mut self, today: NaiveDate) {
        self.days_held = self
            .purchase_date
            .map(|date| (today - date).num_days());
    }
}

#[cfg(test)]
pub(crate) fn sample(ticker: &str, shares: u64, buy: f64, current: f64, stop: f64) -> Position {
    let entry = NewPosition {
        ticker: ticker.to_string(),
        shares: shares as i64,
        buy_price: buy,
        stop_loss: stop,
        benchmark_purchase_price: None,
        remark: String::new(),
    };
    let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    Position::open(entry, current, None, today)
}
