//! XML portfolio store.
//!
//! ```xml
//! <portfolios>
//!   <portfolio name="Jake">
//!     <purchase><symbol>L</symbol><shares>70</shares><date>2016-08-03</date></purchase>
//!     <sale><symbol>L</symbol><shares>5.5</shares><date>2018-01-02</date></sale>
//!   </portfolio>
//! </portfolios>
//! ```
//!
//! Lots are written purchases first, then sales, each grouped by symbol in
//! recorded order, so a load restores the same per-symbol sequences.

use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::domain::error::FolioError;
use crate::domain::lot::{Lot, LotKind};
use crate::domain::portfolio::Portfolio;
use crate::ports::store_port::PortfolioStore;

const ROOT: &str = "portfolios";
const PORTFOLIO: &str = "portfolio";
const PURCHASE: &str = "purchase";
const SALE: &str = "sale";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct XmlStore {
    path: PathBuf,
}

fn store_err(reason: impl Display) -> FolioError {
    FolioError::Store {
        reason: reason.to_string(),
    }
}

impl XmlStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_existing(&self) -> Result<Option<String>, FolioError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, portfolios: &[&Portfolio]) -> Result<(), FolioError> {
        let xml = to_xml(portfolios)?;
        fs::write(&self.path, xml)?;
        tracing::info!(path = %self.path.display(), portfolios = portfolios.len(), "wrote portfolio store");
        Ok(())
    }
}

impl PortfolioStore for XmlStore {
    fn load(&self) -> Result<Vec<Portfolio>, FolioError> {
        match self.read_existing()? {
            Some(content) => from_xml(&content),
            None => Ok(Vec::new()),
        }
    }

    fn append(&self, portfolios: &[Portfolio]) -> Result<(), FolioError> {
        let existing = self.load()?;
        let all: Vec<&Portfolio> = existing.iter().chain(portfolios.iter()).collect();
        self.write_document(&all)
    }

    fn replace(&self, portfolios: &[Portfolio]) -> Result<(), FolioError> {
        let all: Vec<&Portfolio> = portfolios.iter().collect();
        self.write_document(&all)
    }
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), FolioError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(store_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(store_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(store_err)?;
    Ok(())
}

fn write_lots(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    lots: &std::collections::BTreeMap<String, Vec<Lot>>,
) -> Result<(), FolioError> {
    for (symbol, lots) in lots {
        for lot in lots {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(store_err)?;
            write_text_element(writer, "symbol", symbol)?;
            write_text_element(writer, "shares", &lot.shares.to_string())?;
            write_text_element(writer, "date", &lot.date.format(DATE_FORMAT).to_string())?;
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(store_err)?;
        }
    }
    Ok(())
}

pub fn to_xml(portfolios: &[&Portfolio]) -> Result<String, FolioError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(store_err)?;
    writer
        .write_event(Event::Start(BytesStart::new(ROOT)))
        .map_err(store_err)?;
    for portfolio in portfolios {
        let mut start = BytesStart::new(PORTFOLIO);
        start.push_attribute(("name", portfolio.name.as_str()));
        writer.write_event(Event::Start(start)).map_err(store_err)?;
        write_lots(&mut writer, PURCHASE, &portfolio.purchases)?;
        write_lots(&mut writer, SALE, &portfolio.sales)?;
        writer
            .write_event(Event::End(BytesEnd::new(PORTFOLIO)))
            .map_err(store_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(ROOT)))
        .map_err(store_err)?;
    String::from_utf8(writer.into_inner()).map_err(store_err)
}

#[derive(Default)]
struct LotFields {
    symbol: Option<String>,
    shares: Option<String>,
    date: Option<String>,
}

impl LotFields {
    fn into_lot(self, kind: LotKind) -> Result<(String, Lot), FolioError> {
        let missing = |field: &str| store_err(format!("{kind} is missing <{field}>"));
        let symbol = self.symbol.ok_or_else(|| missing("symbol"))?;
        let shares_text = self.shares.ok_or_else(|| missing("shares"))?;
        let date_text = self.date.ok_or_else(|| missing("date"))?;

        let shares: f64 = shares_text
            .parse()
            .map_err(|e| store_err(format!("invalid shares '{shares_text}': {e}")))?;
        if !shares.is_finite() || shares <= 0.0 {
            return Err(store_err(format!(
                "{kind} shares must be a positive number, got '{shares_text}'"
            )));
        }
        let date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT)
            .map_err(|e| store_err(format!("invalid date '{date_text}': {e}")))?;
        Ok((symbol.to_uppercase(), Lot::new(shares, date)))
    }
}

pub fn from_xml(content: &str) -> Result<Vec<Portfolio>, FolioError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut portfolios = Vec::new();
    let mut seen_root = false;
    let mut root_closed = false;
    let mut current: Option<Portfolio> = None;
    let mut lot: Option<(LotKind, LotFields)> = None;
    let mut field: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            store_err(format!("malformed XML at byte {}: {}", reader.buffer_position(), e))
        })?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    ROOT => seen_root = true,
                    PORTFOLIO => {
                        let attr = e
                            .try_get_attribute("name")
                            .map_err(store_err)?
                            .ok_or_else(|| store_err("portfolio element without a name"))?;
                        let value = attr.unescape_value().map_err(store_err)?;
                        current = Some(Portfolio::new(value.into_owned()));
                    }
                    PURCHASE => lot = Some((LotKind::Purchase, LotFields::default())),
                    SALE => lot = Some((LotKind::Sale, LotFields::default())),
                    "symbol" | "shares" | "date" if lot.is_some() => field = Some(name.clone()),
                    other => return Err(store_err(format!("unexpected element <{other}>"))),
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    ROOT => {
                        seen_root = true;
                        root_closed = true;
                    }
                    PORTFOLIO => {
                        let attr = e
                            .try_get_attribute("name")
                            .map_err(store_err)?
                            .ok_or_else(|| store_err("portfolio element without a name"))?;
                        let value = attr.unescape_value().map_err(store_err)?;
                        portfolios.push(Portfolio::new(value.into_owned()));
                    }
                    other => return Err(store_err(format!("unexpected empty element <{other}>"))),
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(store_err)?.into_owned();
                if let (Some(name), Some((_, fields))) = (field.as_deref(), lot.as_mut()) {
                    match name {
                        "symbol" => fields.symbol = Some(text),
                        "shares" => fields.shares = Some(text),
                        _ => fields.date = Some(text),
                    }
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "symbol" | "shares" | "date" => field = None,
                    PURCHASE | SALE => {
                        let (kind, fields) =
                            lot.take().ok_or_else(|| store_err(format!("stray </{name}>")))?;
                        let portfolio = current
                            .as_mut()
                            .ok_or_else(|| store_err(format!("<{name}> outside a portfolio")))?;
                        let (symbol, parsed) = fields.into_lot(kind)?;
                        portfolio.record(kind, &symbol, parsed);
                    }
                    PORTFOLIO => {
                        let portfolio = current
                            .take()
                            .ok_or_else(|| store_err("stray </portfolio>"))?;
                        portfolios.push(portfolio);
                    }
                    ROOT => root_closed = true,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(store_err(format!("missing <{ROOT}> root element")));
    }
    if !root_closed || current.is_some() || lot.is_some() {
        return Err(store_err("truncated document"));
    }
    Ok(portfolios)
}
