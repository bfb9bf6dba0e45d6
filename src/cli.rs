//! CLI definition and dispatch.
//!
//! Every command loads the INI config, opens the portfolio store and the CSV
//! price cache, runs, and persists the registry again if it changed. The
//! trading rules in [`trade_rules`](crate::domain::trade_rules) are enforced
//! here, before anything reaches the ledger.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::cached_adapter::CachedDataPort;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_chart;
use crate::adapters::xml_store::XmlStore;
use crate::domain::analysis;
use crate::domain::calendar::ReferenceCalendar;
use crate::domain::chart::{self, Granularity};
use crate::domain::config_validation::{
    is_valid_symbol, validate_app_config, DEFAULT_MAX_BAR_WIDTH, DEFAULT_REFERENCE_SYMBOL,
};
use crate::domain::error::FolioError;
use crate::domain::lot::Lot;
use crate::domain::registry::PortfolioRegistry;
use crate::domain::trade_rules;
use crate::domain::valuation::ValuationEngine;
use crate::ports::calendar_port::TradingCalendar;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::store_port::PortfolioStore;

#[derive(Parser, Debug)]
#[command(name = "stockfolio", about = "Lot-based stock portfolio tracker")]
pub struct Cli {
    #[arg(short, long, global = true, default_value = "stockfolio.ini")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// `SYMBOL:SHARES:YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq)]
pub struct LotArg {
    pub symbol: String,
    pub shares: f64,
    pub date: NaiveDate,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a portfolio from one or more purchases
    Create {
        #[arg(short, long)]
        name: String,
        /// Purchase as SYMBOL:SHARES:YYYY-MM-DD (repeatable)
        #[arg(long = "buy", value_parser = parse_lot_arg, required = true)]
        purchases: Vec<LotArg>,
    },
    /// List portfolios
    List,
    /// Record a purchase
    Buy {
        #[arg(short, long)]
        portfolio: String,
        #[arg(short, long)]
        symbol: String,
        #[arg(long)]
        shares: f64,
        #[arg(short, long)]
        date: NaiveDate,
    },
    /// Record a sale
    Sell {
        #[arg(short, long)]
        portfolio: String,
        #[arg(short, long)]
        symbol: String,
        #[arg(long)]
        shares: f64,
        #[arg(short, long)]
        date: NaiveDate,
        /// Delete sales of this symbol dated after --date before recording
        #[arg(long)]
        retract_later: bool,
    },
    /// Total value on a date
    Value {
        #[arg(short, long)]
        portfolio: String,
        #[arg(short, long)]
        date: NaiveDate,
    },
    /// Dollar value per symbol on a date
    Distribution {
        #[arg(short, long)]
        portfolio: String,
        #[arg(short, long)]
        date: NaiveDate,
    },
    /// Shares held per symbol on a date
    Composition {
        #[arg(short, long)]
        portfolio: String,
        #[arg(short, long)]
        date: NaiveDate,
    },
    /// Rebalance to target weights on a date
    Rebalance {
        #[arg(short, long)]
        portfolio: String,
        #[arg(short, long)]
        date: NaiveDate,
        /// Target weight as SYMBOL=FRACTION (repeatable)
        #[arg(short, long = "weight", value_parser = parse_weight_arg, required = true)]
        weights: Vec<(String, f64)>,
    },
    /// Bar chart of portfolio value over a date range
    Chart {
        #[arg(short, long)]
        portfolio: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Price change of a symbol between two dates
    GainLoss {
        #[arg(short, long)]
        symbol: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Moving average of a symbol anchored at a date
    MovingAverage {
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        date: NaiveDate,
        #[arg(short, long)]
        window: usize,
    },
    /// Days whose close is above the moving average
    Crossovers {
        #[arg(short, long)]
        symbol: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(short, long)]
        window: usize,
    },
    /// List symbols in the price cache
    Symbols,
    /// Add portfolios from another XML file
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Append all portfolios to another XML file
    Export {
        #[arg(short, long)]
        file: PathBuf,
    },
}

pub fn parse_lot_arg(value: &str) -> Result<LotArg, String> {
    let parts: Vec<&str> = value.split(':').map(str::trim).collect();
    let [symbol, shares, date] = parts.as_slice() else {
        return Err(format!("expected SYMBOL:SHARES:YYYY-MM-DD, got '{value}'"));
    };
    let symbol = parse_symbol(symbol)?;
    let shares: f64 = shares
        .parse()
        .map_err(|_| format!("invalid share count '{shares}'"))?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{date}' (expected YYYY-MM-DD)"))?;
    Ok(LotArg {
        symbol,
        shares,
        date,
    })
}

pub fn parse_weight_arg(value: &str) -> Result<(String, f64), String> {
    let (symbol, weight) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=FRACTION, got '{value}'"))?;
    let symbol = parse_symbol(symbol.trim())?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{}'", weight.trim()))?;
    Ok((symbol, weight))
}

fn parse_symbol(value: &str) -> Result<String, String> {
    let symbol = value.trim().to_uppercase();
    if !is_valid_symbol(&symbol) {
        return Err(format!("invalid symbol '{value}'"));
    }
    Ok(symbol)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub reference_symbol: String,
    pub store_path: PathBuf,
    pub max_bar_width: usize,
}

pub fn build_app_config(adapter: &dyn ConfigPort) -> Result<AppConfig, FolioError> {
    validate_app_config(adapter)?;
    let required = |section: &str, key: &str| {
        adapter
            .get_string(section, key)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| FolioError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })
    };
    Ok(AppConfig {
        data_dir: PathBuf::from(required("data", "dir")?),
        reference_symbol: adapter
            .get_string("data", "reference_symbol")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|| DEFAULT_REFERENCE_SYMBOL.to_string()),
        store_path: PathBuf::from(required("store", "path")?),
        max_bar_width: adapter.get_int("chart", "max_bar_width", DEFAULT_MAX_BAR_WIDTH) as usize,
    })
}

pub fn load_config(path: &Path) -> Result<AppConfig, FolioError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    build_app_config(&adapter)
}

/// Everything a command needs: prices, the store, and the loaded registry.
pub struct Session {
    pub config: AppConfig,
    pub data_port: CachedDataPort<CsvAdapter>,
    pub store: XmlStore,
    pub registry: PortfolioRegistry,
}

impl Session {
    pub fn open(config: AppConfig) -> Result<Self, FolioError> {
        let store = XmlStore::new(config.store_path.clone());
        let registry = PortfolioRegistry::from_portfolios(store.load()?)?;
        tracing::debug!(portfolios = registry.len(), "loaded registry");
        Ok(Self {
            data_port: CachedDataPort::new(CsvAdapter::new(config.data_dir.clone())),
            config,
            store,
            registry,
        })
    }

    pub fn calendar(&self) -> Result<ReferenceCalendar, FolioError> {
        ReferenceCalendar::from_port(&self.data_port, &self.config.reference_symbol)
    }

    pub fn persist(&self) -> Result<(), FolioError> {
        self.store.replace(&self.registry.snapshots())
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(&cli, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<(), FolioError> {
    let config = load_config(&cli.config)?;
    let mut session = Session::open(config)?;
    dispatch(&mut session, &cli.command, out)
}

pub fn dispatch(
    session: &mut Session,
    command: &Command,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    match command {
        Command::Create { name, purchases } => run_create(session, name, purchases, out),
        Command::List => run_list(session, out),
        Command::Buy {
            portfolio,
            symbol,
            shares,
            date,
        } => run_buy(session, portfolio, symbol, *shares, *date, out),
        Command::Sell {
            portfolio,
            symbol,
            shares,
            date,
            retract_later,
        } => run_sell(session, portfolio, symbol, *shares, *date, *retract_later, out),
        Command::Value { portfolio, date } => run_value(session, portfolio, *date, out),
        Command::Distribution { portfolio, date } => {
            run_distribution(session, portfolio, *date, out)
        }
        Command::Composition { portfolio, date } => run_composition(session, portfolio, *date, out),
        Command::Rebalance {
            portfolio,
            date,
            weights,
        } => run_rebalance(session, portfolio, *date, weights, out),
        Command::Chart {
            portfolio,
            from,
            to,
        } => run_chart(session, portfolio, *from, *to, out),
        Command::GainLoss { symbol, from, to } => run_gain_loss(session, symbol, *from, *to, out),
        Command::MovingAverage {
            symbol,
            date,
            window,
        } => run_moving_average(session, symbol, *date, *window, out),
        Command::Crossovers {
            symbol,
            from,
            to,
            window,
        } => run_crossovers(session, symbol, *from, *to, *window, out),
        Command::Symbols => run_symbols(session, out),
        Command::Import { file } => run_import(session, file, out),
        Command::Export { file } => run_export(session, file, out),
    }
}

fn normalize_symbol(symbol: &str) -> Result<String, FolioError> {
    parse_symbol(symbol).map_err(|reason| FolioError::InvalidArgument { reason })
}

fn run_create(
    session: &mut Session,
    name: &str,
    purchases: &[LotArg],
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let mut lots = Vec::with_capacity(purchases.len());
    for purchase in purchases {
        trade_rules::check_purchase(purchase.shares)?;
        session.data_port.fetch_series(&purchase.symbol)?;
        lots.push((
            purchase.symbol.clone(),
            Lot::new(purchase.shares, purchase.date),
        ));
    }
    session.registry.create(name.trim(), lots)?;
    session.persist()?;
    writeln!(out, "Created portfolio {} with {} purchase(s)", name.trim(), purchases.len())?;
    Ok(())
}

fn run_list(session: &Session, out: &mut dyn Write) -> Result<(), FolioError> {
    if session.registry.is_empty() {
        writeln!(out, "No portfolios.")?;
        return Ok(());
    }
    for portfolio in session.registry.snapshots() {
        writeln!(
            out,
            "{} ({} lots; symbols: {})",
            portfolio.name,
            portfolio.lot_count(),
            portfolio.purchased_symbols().join(", ")
        )?;
    }
    Ok(())
}

fn run_buy(
    session: &mut Session,
    name: &str,
    symbol: &str,
    shares: f64,
    date: NaiveDate,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let symbol = normalize_symbol(symbol)?;
    trade_rules::check_purchase(shares)?;
    session.registry.get(name)?;
    session.data_port.fetch_series(&symbol)?;
    session
        .registry
        .record_purchase(name, &symbol, Lot::new(shares, date))?;
    session.persist()?;
    writeln!(out, "Bought {shares} {symbol} on {date} in {name}")?;
    Ok(())
}

fn run_sell(
    session: &mut Session,
    name: &str,
    symbol: &str,
    shares: f64,
    date: NaiveDate,
    retract_later: bool,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let symbol = normalize_symbol(symbol)?;
    // check against a copy first so a rejected sale leaves retracted lots in place
    let mut draft = session.registry.snapshot(name)?;
    let retracted = if retract_later {
        draft.remove_sales_after(&symbol, date)
    } else {
        0
    };
    trade_rules::check_sale(&draft, &symbol, shares, date)?;

    if retracted > 0 {
        session.registry.remove_sales_after(name, &symbol, date)?;
        writeln!(out, "Retracted {retracted} later sale(s) of {symbol}")?;
    }
    session
        .registry
        .record_sale(name, &symbol, Lot::new(shares, date))?;
    session.persist()?;
    writeln!(out, "Sold {shares} {symbol} on {date} from {name}")?;
    Ok(())
}

fn priced_on(resolved: NaiveDate, requested: NaiveDate) -> String {
    if resolved == requested {
        String::new()
    } else {
        format!(" (priced on {resolved})")
    }
}

fn run_value(
    session: &Session,
    name: &str,
    date: NaiveDate,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let portfolio = session.registry.get(name)?;
    let calendar = session.calendar()?;
    let engine = ValuationEngine::new(&session.data_port, &calendar);
    let value = engine.total_value(portfolio, date)?;
    writeln!(
        out,
        "Value of {name} on {date}: ${value:.2}{}",
        priced_on(calendar.resolve(date), date)
    )?;
    Ok(())
}

fn run_distribution(
    session: &Session,
    name: &str,
    date: NaiveDate,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let portfolio = session.registry.get(name)?;
    let calendar = session.calendar()?;
    let engine = ValuationEngine::new(&session.data_port, &calendar);
    let distribution = engine.distribution(portfolio, date)?;
    writeln!(
        out,
        "Distribution of {name} on {date}{}:",
        priced_on(calendar.resolve(date), date)
    )?;
    for (symbol, value) in &distribution {
        writeln!(out, "  {symbol}: ${value:.2}")?;
    }
    writeln!(out, "  Total: ${:.2}", engine.total_value(portfolio, date)?)?;
    Ok(())
}

fn run_composition(
    session: &Session,
    name: &str,
    date: NaiveDate,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let portfolio = session.registry.get(name)?;
    let calendar = session.calendar()?;
    let engine = ValuationEngine::new(&session.data_port, &calendar);
    writeln!(out, "Composition of {name} on {date}:")?;
    for (symbol, shares) in engine.composition(portfolio, date) {
        writeln!(out, "  {symbol}: {shares} shares")?;
    }
    Ok(())
}

fn run_rebalance(
    session: &mut Session,
    name: &str,
    date: NaiveDate,
    weights: &[(String, f64)],
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let mut targets = BTreeMap::new();
    for (symbol, weight) in weights {
        if targets.insert(symbol.clone(), *weight).is_some() {
            return Err(FolioError::InvalidWeights {
                reason: format!("{symbol} given more than once"),
            });
        }
    }

    let calendar = session.calendar()?;
    let resolved = calendar.resolve(date);
    trade_rules::check_weights(session.registry.get(name)?, &targets, resolved)?;

    let engine = ValuationEngine::new(&session.data_port, &calendar);
    let portfolio = session.registry.get_mut(name)?;
    let adjustments = engine.rebalance(portfolio, &targets, date)?;
    session.persist()?;

    writeln!(out, "Rebalanced {name} on {resolved}:")?;
    if adjustments.is_empty() {
        writeln!(out, "  already at target weights")?;
    }
    for adjustment in &adjustments {
        writeln!(
            out,
            "  {} {:.4} shares of {}",
            adjustment.kind, adjustment.lot.shares, adjustment.symbol
        )?;
    }
    Ok(())
}

fn run_chart(
    session: &Session,
    name: &str,
    from: NaiveDate,
    to: NaiveDate,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let portfolio = session.registry.get(name)?;
    let granularity = chart::choose_granularity(from, to);
    if granularity == Granularity::None {
        return Err(FolioError::InvalidArgument {
            reason: format!("chart range {from} to {to} is empty"),
        });
    }
    let calendar = session.calendar()?;
    let engine = ValuationEngine::new(&session.data_port, &calendar);
    let points = chart::value_series(&engine, portfolio, from, to, granularity)?;
    let title = format!("Performance of portfolio {name} from {from} to {to} ({granularity})");
    write!(
        out,
        "{}",
        text_chart::render(&title, &points, session.config.max_bar_width)
    )?;
    Ok(())
}

fn run_gain_loss(
    session: &Session,
    symbol: &str,
    from: NaiveDate,
    to: NaiveDate,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let symbol = normalize_symbol(symbol)?;
    let calendar = session.calendar()?;
    let series = session.data_port.fetch_series(&symbol)?;
    let (start, end) = (calendar.resolve(from), calendar.resolve(to));
    let change = analysis::gain_loss(&series, start, end)?;
    writeln!(out, "{symbol} gain/loss from {start} to {end}: {change:.2}")?;
    Ok(())
}

fn run_moving_average(
    session: &Session,
    symbol: &str,
    date: NaiveDate,
    window: usize,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let symbol = normalize_symbol(symbol)?;
    let calendar = session.calendar()?;
    let series = session.data_port.fetch_series(&symbol)?;
    let anchor = calendar.resolve(date);
    let average = analysis::moving_average(&series, anchor, window)?;
    writeln!(out, "{symbol} {window}-day moving average at {anchor}: {average:.2}")?;
    Ok(())
}

fn run_crossovers(
    session: &Session,
    symbol: &str,
    from: NaiveDate,
    to: NaiveDate,
    window: usize,
    out: &mut dyn Write,
) -> Result<(), FolioError> {
    let symbol = normalize_symbol(symbol)?;
    let series = session.data_port.fetch_series(&symbol)?;
    let dates = analysis::crossovers(&series, from, to, window)?;
    if dates.is_empty() {
        writeln!(out, "No {window}-day crossovers for {symbol} from {from} to {to}")?;
        return Ok(());
    }
    writeln!(out, "{window}-day crossovers for {symbol} from {from} to {to}:")?;
    for date in dates {
        writeln!(out, "  {date}")?;
    }
    Ok(())
}

fn run_symbols(session: &Session, out: &mut dyn Write) -> Result<(), FolioError> {
    let symbols = session.data_port.list_symbols()?;
    if symbols.is_empty() {
        writeln!(out, "No symbols in {}", session.config.data_dir.display())?;
        return Ok(());
    }
    for symbol in &symbols {
        match session.data_port.get_data_range(symbol) {
            Ok(Some((first, last, count))) => {
                writeln!(out, "{symbol}: {count} bars, {first} to {last}")?
            }
            Ok(None) => writeln!(out, "{symbol}: no data")?,
            Err(e) => tracing::warn!(symbol = %symbol, error = %e, "unreadable price cache"),
        }
    }
    Ok(())
}

fn run_import(session: &mut Session, file: &Path, out: &mut dyn Write) -> Result<(), FolioError> {
    let incoming = XmlStore::new(file.to_path_buf()).load()?;
    // all-or-nothing: validate against a copy before touching the live registry
    let mut staged = session.registry.clone();
    let count = incoming.len();
    for portfolio in incoming {
        staged.import(portfolio)?;
    }
    session.registry = staged;
    session.persist()?;
    writeln!(out, "Imported {count} portfolio(s) from {}", file.display())?;
    Ok(())
}

fn run_export(session: &Session, file: &Path, out: &mut dyn Write) -> Result<(), FolioError> {
    let portfolios = session.registry.snapshots();
    XmlStore::new(file.to_path_buf()).append(&portfolios)?;
    writeln!(out, "Exported {} portfolio(s) to {}", portfolios.len(), file.display())?;
    Ok(())
}
