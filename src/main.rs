use chrono::Local;
use clap::{arg, value_parser, ArgAction, ArgMatches, Command};
use colored::Colorize;
use eyre::WrapErr;
use tracing::{warn, Level};

use crate::config::{Config, APP_NAME, CONFIG_NAME};
use crate::history::BalanceHistory;
use crate::ledger::Ledger;
use crate::position::NewPosition;
use crate::quote::{QuoteProvider, YahooQuotes};
use crate::store::AnyStore;
use crate::tracker::Tracker;

mod config;
mod error;
mod history;
mod ledger;
mod position;
mod quote;
mod store;
mod tracker;

fn cli() -> Command {
    Command::new("stock_tracker")
        .about("Record stock buys in a spreadsheet ledger and keep its totals up to date")
        .arg_required_else_help(true)
        .arg(
            arg!(-f --file <FILE> "JSON ledger file to use instead of the configured store")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --verbose "Print debug logs to stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new("config").about("Print the path to the config file"))
        .subcommand(Command::new("show").about("Show the ledger with days held brought up to date"))
        .subcommand(
            Command::new("add")
                .about("Record a buy and recompute every derived column")
                .allow_negative_numbers(true)
                .arg(arg!(--ticker <TICKER> "Stock ticker, e.g. AAPL").required(true))
                .arg(
                    arg!(--shares <N> "Number of shares bought")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(
                    arg!(--"buy-price" <PRICE> "Price paid per share")
                        .required(true)
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    arg!(--"stop-loss" <PRICE> "Stop loss price")
                        .required(false)
                        .default_value("0")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    arg!(--"benchmark-price" <PRICE> "Benchmark price on the day of the buy")
                        .required(false)
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    arg!(--remark <TEXT> "Free-text note")
                        .required(false)
                        .default_value(""),
                ),
        )
        .subcommand(
            Command::new("quote")
                .about("Print the latest price of a symbol")
                .arg(arg!(<SYMBOL> "Ticker symbol")),
        )
        .subcommand(Command::new("allocation").about("Show current value per ticker as a pie chart"))
        .subcommand(Command::new("history").about("Show recorded balance snapshots"))
}

fn init_tracing(verbose: bool) -> eyre::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

// global args may be given before or after the subcommand
fn global_flag(matches: &ArgMatches, id: &str) -> bool {
    matches.get_flag(id) || matches.subcommand().is_some_and(|(_, sub)| sub.get_flag(id))
}

fn global_value<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a str> {
    matches
        .subcommand()
        .and_then(|(_, sub)| sub.get_one::<String>(id))
        .or_else(|| matches.get_one::<String>(id))
        .map(String::as_str)
}

fn new_position(matches: &ArgMatches) -> NewPosition {
    NewPosition {
        ticker: matches.get_one::<String>("ticker").cloned().unwrap_or_default(),
        shares: matches.get_one::<i64>("shares").copied().unwrap_or_default(),
        buy_price: matches.get_one::<f64>("buy-price").copied().unwrap_or_default(),
        stop_loss: matches.get_one::<f64>("stop-loss").copied().unwrap_or_default(),
        benchmark_purchase_price: matches.get_one::<f64>("benchmark-price").copied(),
        remark: matches.get_one::<String>("remark").cloned().unwrap_or_default(),
    }
}

// a failed snapshot never fails the command
fn record_history(cfg: &Config, ledger: &Ledger) {
    let Some(total) = ledger.total() else {
        return;
    };
    let result = BalanceHistory::open(&cfg.history_db).and_then(|h| h.record(Local::now(), total));
    if let Err(e) = result {
        warn!(error = %e, "could not record balance snapshot");
    }
}

fn tracker(cfg: &Config, file: Option<&str>) -> eyre::Result<Tracker<AnyStore, YahooQuotes>> {
    let store = cfg.open_store(file).wrap_err("could not open the ledger store")?;
    let quotes =
        YahooQuotes::new(cfg.request_timeout()).wrap_err("could not set up the quote service")?;
    Ok(Tracker::new(store, quotes, &cfg.benchmark))
}

async fn run() -> eyre::Result<()> {
    let matches = cli().get_matches();
    init_tracing(global_flag(&matches, "verbose"))?;

    let cfg: Config =
        confy::load(APP_NAME, CONFIG_NAME).wrap_err("could not load the configuration")?;
    let file = global_value(&matches, "file");
    let today = Local::now().date_naive();

    match matches.subcommand() {
        Some(("config", _)) => {
            let path = confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?;
            println!("Your config file is located here: \n{}", path.display());
        }
        Some(("show", _)) => {
            let ledger = tracker(&cfg, file)?
                .display(today)
                .await
                .wrap_err("could not load the ledger")?;
            if ledger.positions().is_empty() {
                println!("{}", "The ledger is empty.".yellow());
            } else {
                ledger.print();
                record_history(&cfg, &ledger);
            }
        }
        Some(("add", sub)) => {
            let ledger = tracker(&cfg, file)?
                .add_entry(new_position(sub), today)
                .await
                .wrap_err("could not add the entry")?;
            ledger.print();
            println!("{}", "Entry added and totals updated.".green());
            record_history(&cfg, &ledger);
        }
        Some(("quote", sub)) => {
            let symbol = sub
                .get_one::<String>("SYMBOL")
                .map(|s| s.trim().to_uppercase())
                .unwrap_or_default();
            let quotes = YahooQuotes::new(cfg.request_timeout())?;
            match quotes.get_price(&symbol).await {
                Some(price) => println!("{symbol}: {price:.2}"),
                None => println!("{symbol}: {}", "unavailable".yellow()),
            }
        }
        Some(("allocation", _)) => {
            let ledger = tracker(&cfg, file)?
                .display(today)
                .await
                .wrap_err("could not load the ledger")?;
            ledger.draw_pie_chart();
        }
        Some(("history", _)) => {
            BalanceHistory::open(&cfg.history_db)
                .and_then(|h| h.print())
                .wrap_err("could not read the balance history")?;
        }
        _ => cli().print_help()?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
