use chrono::NaiveDate;
use piechart::{Chart, Color};
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::position::{
    format_purchase_date, parse_purchase_date, percent_of, round2, NewPosition, Position,
};
use crate::quote::QuoteProvider;
use crate::store::{Cell, Table};

/// Ticker value that marks the synthetic aggregate row.
pub const TOTAL_TICKER: &str = "Total";

/// Persisted column names, in sheet order.
pub const COLUMNS: [&str; 19] = [
    "Ticker",
    "# of shares",
    "Buy stock price",
    "Current stock price",
    "Stop Loss",
    "Stop Loss Profit",
    "$ up/down",
    "% up/down",
    "Stop_loss_%",
    "Buy value",
    "Current value",
    "B_Date",
    "Days",
    "Current_Spy",
    "SPY_Per%",
    "Holding",
    "Profit%_Portfolio",
    "Stoploss_Portfolio%",
    "Remark",
];

const TICKER: usize = 0;
const SHARES: usize = 1;
const BUY_PRICE: usize = 2;
const CURRENT_PRICE: usize = 3;
const STOP_LOSS: usize = 4;
const STOP_LOSS_PROFIT: usize = 5;
const DOLLAR_CHANGE: usize = 6;
const PERCENT_CHANGE: usize = 7;
const STOP_LOSS_PERCENT: usize = 8;
const BUY_VALUE: usize = 9;
const CURRENT_VALUE: usize = 10;
const PURCHASE_DATE: usize = 11;
const DAYS_HELD: usize = 12;
const BENCHMARK_PRICE: usize = 13;
const BENCHMARK_PERCENT: usize = 14;
const HOLDING: usize = 15;
const PROFIT_SHARE: usize = 16;
const STOP_LOSS_SHARE: usize = 17;
const REMARK: usize = 18;

/// The synthetic aggregate row: column sums over all positions, with both
/// portfolio-share columns pinned at 100.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TotalRow {
    pub shares: f64,
    pub buy_price: f64,
    pub current_price: f64,
    pub stop_loss: f64,
    pub stop_loss_profit: f64,
    pub dollar_change: f64,
    pub percent_change: f64,
    pub stop_loss_percent: f64,
    pub buy_value: f64,
    pub current_value: f64,
    pub days_held: f64,
    pub benchmark_price: f64,
    pub benchmark_percent: f64,
    pub profit_share: f64,
    pub stop_loss_share: f64,
}

impl TotalRow {
    pub fn sum(positions: &[Position]) -> TotalRow {
        let mut total = TotalRow::default();
        for p in positions {
            total.shares += p.shares as f64;
            total.buy_price += p.buy_price;
            total.current_price += p.current_price;
            total.stop_loss += p.stop_loss;
            total.stop_loss_profit += p.stop_loss_profit;
            total.dollar_change += p.dollar_change;
            total.percent_change += p.percent_change;
            total.stop_loss_percent += p.stop_loss_percent;
            total.buy_value += p.buy_value;
            total.current_value += p.current_value;
            total.days_held += p.days_held.unwrap_or(0) as f64;
            total.benchmark_price += p.benchmark_price;
            total.benchmark_percent += p.benchmark_percent;
        }

        TotalRow {
            shares: total.shares,
            buy_price: round2(total.buy_price),
            current_price: round2(total.current_price),
            stop_loss: round2(total.stop_loss),
            stop_loss_profit: round2(total.stop_loss_profit),
            dollar_change: round2(total.dollar_change),
            percent_change: round2(total.percent_change),
            stop_loss_percent: round2(total.stop_loss_percent),
            buy_value: round2(total.buy_value),
            current_value: round2(total.current_value),
            days_held: total.days_held,
            benchmark_price: round2(total.benchmark_price),
            benchmark_percent: round2(total.benchmark_percent),
            profit_share: 100.0,
            stop_loss_share: 100.0,
        }
    }
}

/// Positions in sheet order plus the aggregate row, which is always
/// written last and at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    positions: Vec<Position>,
    total: Option<TotalRow>,
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn total(&self) -> Option<&TotalRow> {
        self.total.as_ref()
    }

    /// Reads a ledger from a stored table. Every row whose ticker is
    /// `Total` is treated as a stale aggregate; only the last one is kept.
    pub fn from_table(table: &Table) -> Ledger {
        let index: Vec<Option<usize>> = COLUMNS.iter().map(|c| table.column(c)).collect();
        for name in &table.header {
            if !name.trim().is_empty() && !COLUMNS.contains(&name.trim()) {
                debug!(column = %name, "ignoring unknown column");
            }
        }

        let mut ledger = Ledger::new();
        for row in &table.rows {
            let row = Row { cells: row, index: &index };
            let ticker = row.text(TICKER);
            let ticker = ticker.trim();
            if ticker == TOTAL_TICKER {
                ledger.total = Some(row.total());
            } else if ticker.is_empty() {
                warn!("skipping stored row without a ticker");
            } else {
                ledger.positions.push(row.position(ticker));
            }
        }
        ledger
    }

    /// Serializes positions followed by the aggregate row in the
    /// canonical column layout.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(COLUMNS.iter().map(|c| c.to_string()).collect());
        for p in &self.positions {
            table.rows.push(position_cells(p));
        }
        if let Some(total) = &self.total {
            table.rows.push(total_cells(total));
        }
        table
    }

    /// Prices a new entry and returns the recomputed ledger. `self` is left
    /// untouched on every path, including errors.
    pub async fn add_entry<Q: QuoteProvider>(
        &self,
        input: NewPosition,
        quotes: &Q,
        benchmark: &str,
        today: NaiveDate,
    ) -> Result<Ledger, LedgerError> {
        let entry = input.validate()?;

        let current_price = quotes
            .get_price(&entry.ticker)
            .await
            .ok_or_else(|| LedgerError::PriceUnavailable(entry.ticker.clone()))?;

        let benchmark_price = quotes.get_price(benchmark).await;
        if entry.benchmark_purchase_price.is_some() && benchmark_price.is_none() {
            return Err(LedgerError::PriceUnavailable(benchmark.to_uppercase()));
        }

        let position = Position::open(entry, current_price, benchmark_price, today);
        Ok(self.with_position(position, today))
    }

    /// Appends `position` and rebuilds every derived column and the
    /// aggregate row from scratch.
    pub fn with_position(&self, position: Position, today: NaiveDate) -> Ledger {
        let mut positions = self.positions.clone();
        positions.push(position);

        for p in &mut positions {
            p.recompute();
            p.refresh_days_held(today);
        }

        let total_dollar_change: f64 = positions.iter().map(|p| p.dollar_change).sum();
        let total_stop_loss_profit: f64 = positions.iter().map(|p| p.stop_loss_profit).sum();
        let total_dollar_change = round2(total_dollar_change);
        let total_stop_loss_profit = round2(total_stop_loss_profit);

        for p in &mut positions {
            p.profit_share = percent_of(p.dollar_change, total_dollar_change);
            p.stop_loss_share = percent_of(p.stop_loss_profit, total_stop_loss_profit);
        }

        let total = TotalRow::sum(&positions);
        Ledger {
            positions,
            total: Some(total),
        }
    }

    /// Recomputes days held for display; nothing else changes.
    pub fn refresh_display(&self, today: NaiveDate) -> Ledger {
        let mut ledger = self.clone();
        for p in &mut ledger.positions {
            p.refresh_days_held(today);
        }
        ledger
    }

    // Print the ledger as a table
    pub fn print(&self) {
        use comfy_table::{
            presets::UTF8_FULL, Attribute, Cell as TCell, CellAlignment, Color as TColor,
            ContentArrangement, Table as CTable,
        };

        let mut table = CTable::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(180);

        table.set_header(
            [
                "Ticker", "Shares", "Buy", "Price", "Stop", "SL Profit", "$ +/-", "% +/-",
                "SL %", "Invested", "Value", "Bought", "Days", "Bench %", "Profit%", "SL%",
                "Remark",
            ]
            .iter()
            .map(|h| TCell::new(h).add_attribute(Attribute::Bold)),
        );

        let money = |v: f64| TCell::new(format!("{v:.2}")).set_alignment(CellAlignment::Right);
        let signed = |v: f64, suffix: &str| {
            let c = if v >= 0.0 { TColor::Green } else { TColor::Red };
            TCell::new(format!("{v:.2}{suffix}"))
                .set_alignment(CellAlignment::Right)
                .fg(c)
        };

        for p in &self.positions {
            table.add_row(vec![
                TCell::new(&p.ticker),
                TCell::new(p.shares).set_alignment(CellAlignment::Right),
                money(p.buy_price),
                money(p.current_price),
                money(p.stop_loss),
                signed(p.stop_loss_profit, ""),
                signed(p.dollar_change, ""),
                signed(p.percent_change, "%"),
                signed(p.stop_loss_percent, "%"),
                money(p.buy_value),
                money(p.current_value),
                TCell::new(p.purchase_date.map(format_purchase_date).unwrap_or_default()),
                TCell::new(p.days_held.map(|d| d.to_string()).unwrap_or_default())
                    .set_alignment(CellAlignment::Right),
                signed(p.benchmark_percent, "%"),
                signed(p.profit_share, "%"),
                signed(p.stop_loss_share, "%"),
                TCell::new(&p.remark),
            ]);
        }

        if let Some(t) = &self.total {
            let bold = |c: TCell| c.add_attribute(Attribute::Bold);
            table.add_row(vec![
                bold(TCell::new(TOTAL_TICKER)),
                bold(TCell::new(t.shares).set_alignment(CellAlignment::Right)),
                bold(money(t.buy_price)),
                bold(money(t.current_price)),
                bold(money(t.stop_loss)),
                bold(signed(t.stop_loss_profit, "")),
                bold(signed(t.dollar_change, "")),
                bold(signed(t.percent_change, "%")),
                bold(signed(t.stop_loss_percent, "%")),
                bold(money(t.buy_value)),
                bold(money(t.current_value)),
                TCell::new(""),
                bold(TCell::new(t.days_held).set_alignment(CellAlignment::Right)),
                bold(signed(t.benchmark_percent, "%")),
                bold(money(t.profit_share)),
                bold(money(t.stop_loss_share)),
                TCell::new(""),
            ]);
        }

        println!("{table}");
    }

    /// Current value per ticker, lots of the same ticker merged, in first-seen order.
    pub fn allocation(&self) -> Vec<(String, f64)> {
        let mut allocation: Vec<(String, f64)> = Vec::new();
        for p in &self.positions {
            match allocation.iter_mut().find(|(t, _)| *t == p.ticker) {
                Some((_, value)) => *value += p.current_value,
                None => allocation.push((p.ticker.clone(), p.current_value)),
            }
        }
        allocation
    }

    pub fn draw_pie_chart(&self) {
        let colors = [
            Color::Red,
            Color::Green,
            Color::Blue,
            Color::Yellow,
            Color::Cyan,
            Color::White,
            Color::Purple,
            Color::Black,
        ];

        let data: Vec<piechart::Data> = self
            .allocation()
            .into_iter()
            .filter(|(_, value)| *value > 0.0)
            .enumerate()
            .map(|(i, (ticker, value))| piechart::Data {
                label: ticker,
                value: value as f32,
                color: Some(colors[i % colors.len()].into()),
                fill: '•',
            })
            .collect();

        Chart::new()
            .legend(true)
            .radius(9)
            .aspect_ratio(3)
            .draw(&data);
    }
}

static EMPTY: Cell = Cell::Empty;

/// A stored row viewed through the table's column index.
struct Row<'a> {
    cells: &'a [Cell],
    index: &'a [Option<usize>],
}

impl Row<'_> {
    fn cell(&self, column: usize) -> &Cell {
        self.index[column]
            .and_then(|i| self.cells.get(i))
            .unwrap_or(&EMPTY)
    }

    fn number(&self, column: usize) -> f64 {
        self.cell(column).as_f64().unwrap_or(0.0)
    }

    fn text(&self, column: usize) -> String {
        self.cell(column).as_text()
    }

    fn position(&self, ticker: &str) -> Position {
        let shares = self.number(SHARES);
        if shares < 0.0 || shares.fract() != 0.0 {
            warn!(ticker, shares, "stored share count is not a whole positive number, rounding");
        }
        let purchase_date = parse_purchase_date(&self.text(PURCHASE_DATE));
        Position {
            ticker: ticker.to_uppercase(),
            shares: if shares > 0.0 { shares.round() as u64 } else { 0 },
            buy_price: self.number(BUY_PRICE),
            current_price: self.number(CURRENT_PRICE),
            stop_loss: self.number(STOP_LOSS),
            stop_loss_profit: self.number(STOP_LOSS_PROFIT),
            dollar_change: self.number(DOLLAR_CHANGE),
            percent_change: self.number(PERCENT_CHANGE),
            stop_loss_percent: self.number(STOP_LOSS_PERCENT),
            buy_value: self.number(BUY_VALUE),
            current_value: self.number(CURRENT_VALUE),
            purchase_date,
            days_held: self.cell(DAYS_HELD).as_f64().map(|d| d as i64),
            benchmark_price: self.number(BENCHMARK_PRICE),
            benchmark_percent: self.number(BENCHMARK_PERCENT),
            holding: self.cell(HOLDING).as_f64().map_or(true, |h| h != 0.0),
            profit_share: self.number(PROFIT_SHARE),
            stop_loss_share: self.number(STOP_LOSS_SHARE),
            remark: self.text(REMARK),
        }
    }

    fn total(&self) -> TotalRow {
        TotalRow {
            shares: self.number(SHARES),
            buy_price: self.number(BUY_PRICE),
            current_price: self.number(CURRENT_PRICE),
            stop_loss: self.number(STOP_LOSS),
            stop_loss_profit: self.number(STOP_LOSS_PROFIT),
            dollar_change: self.number(DOLLAR_CHANGE),
            percent_change: self.number(PERCENT_CHANGE),
            stop_loss_percent: self.number(STOP_LOSS_PERCENT),
            buy_value: self.number(BUY_VALUE),
            current_value: self.number(CURRENT_VALUE),
            days_held: self.number(DAYS_HELD),
            benchmark_price: self.number(BENCHMARK_PRICE),
            benchmark_percent: self.number(BENCHMARK_PERCENT),
            profit_share: self.number(PROFIT_SHARE),
            stop_loss_share: self.number(STOP_LOSS_SHARE),
        }
    }
}

fn position_cells(p: &Position) -> Vec<Cell> {
    vec![
        Cell::from(p.ticker.as_str()),
        Cell::Number(p.shares as f64),
        Cell::Number(p.buy_price),
        Cell::Number(p.current_price),
        Cell::Number(p.stop_loss),
        Cell::Number(p.stop_loss_profit),
        Cell::Number(p.dollar_change),
        Cell::Number(p.percent_change),
        Cell::Number(p.stop_loss_percent),
        Cell::Number(p.buy_value),
        Cell::Number(p.current_value),
        p.purchase_date
            .map(|d| Cell::Text(format_purchase_date(d)))
            .unwrap_or(Cell::Empty),
        p.days_held.map(|d| Cell::Number(d as f64)).unwrap_or(Cell::Empty),
        Cell::Number(p.benchmark_price),
        Cell::Number(p.benchmark_percent),
        Cell::Number(if p.holding { 1.0 } else { 0.0 }),
        Cell::Number(p.profit_share),
        Cell::Number(p.stop_loss_share),
        Cell::from(p.remark.as_str()),
    ]
}

fn total_cells(t: &TotalRow) -> Vec<Cell> {
    vec![
        Cell::from(TOTAL_TICKER),
        Cell::Number(t.shares),
        Cell::Number(t.buy_price),
        Cell::Number(t.current_price),
        Cell::Number(t.stop_loss),
        Cell::Number(t.stop_loss_profit),
        Cell::Number(t.dollar_change),
        Cell::Number(t.percent_change),
        Cell::Number(t.stop_loss_percent),
        Cell::Number(t.buy_value),
        Cell::Number(t.current_value),
        Cell::Empty,
        Cell::Number(t.days_held),
        Cell::Number(t.benchmark_price),
        Cell::Number(t.benchmark_percent),
        Cell::Empty,
        Cell::Number(t.profit_share),
        Cell::Number(t.stop_loss_share),
        Cell::Empty,
    ]
}
