//! Instrument catalog
//!
//! The fixed set of tradeable pairs the dashboard tracks, with the class used
//! for spread baselines and the pip size used for distance/spread maths.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::types::{MarketDataError, Result};

/// Broad instrument class; drives spread baselines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Major,
    Minor,
    Exotic,
    Metal,
}

impl InstrumentClass {
    /// Typical spread range in pips (min, max)
    pub fn spread_baseline(&self) -> (f64, f64) {
        match self {
            InstrumentClass::Major => (0.5, 1.3),
            InstrumentClass::Minor => (1.0, 2.5),
            InstrumentClass::Exotic => (2.0, 5.0),
            InstrumentClass::Metal => (0.3, 1.3),
        }
    }
}

/// Catalog in display order
const CATALOG: [&str; 29] = [
    // Majors
    "EUR/USD", "GBP/USD", "USD/JPY", "USD/CHF", "AUD/USD", "USD/CAD", "NZD/USD",
    // Minors
    "EUR/GBP", "EUR/JPY", "GBP/JPY", "EUR/CHF", "EUR/AUD", "GBP/CHF", "AUD/JPY",
    "CAD/JPY", "CHF/JPY", "AUD/NZD", "EUR/CAD", "GBP/AUD", "AUD/CAD", "NZD/JPY",
    "EUR/NZD",
    // Exotics
    "USD/TRY", "USD/ZAR", "USD/MXN", "USD/SGD", "EUR/TRY",
    // Metals
    "XAU/USD", "XAG/USD",
];

static CLASSES: phf::Map<&'static str, InstrumentClass> = phf::phf_map! {
    "EUR/USD" => InstrumentClass::Major,
    "GBP/USD" => InstrumentClass::Major,
    "USD/JPY" => InstrumentClass::Major,
    "USD/CHF" => InstrumentClass::Major,
    "AUD/USD" => InstrumentClass::Major,
    "USD/CAD" => InstrumentClass::Major,
    "NZD/USD" => InstrumentClass::Major,
    "EUR/GBP" => InstrumentClass::Minor,
    "EUR/JPY" => InstrumentClass::Minor,
    "GBP/JPY" => InstrumentClass::Minor,
    "EUR/CHF" => InstrumentClass::Minor,
    "EUR/AUD" => InstrumentClass::Minor,
    "GBP/CHF" => InstrumentClass::Minor,
    "AUD/JPY" => InstrumentClass::Minor,
    "CAD/JPY" => InstrumentClass::Minor,
    "CHF/JPY" => InstrumentClass::Minor,
    "AUD/NZD" => InstrumentClass::Minor,
    "EUR/CAD" => InstrumentClass::Minor,
    "GBP/AUD" => InstrumentClass::Minor,
    "AUD/CAD" => InstrumentClass::Minor,
    "NZD/JPY" => InstrumentClass::Minor,
    "EUR/NZD" => InstrumentClass::Minor,
    "USD/TRY" => InstrumentClass::Exotic,
    "USD/ZAR" => InstrumentClass::Exotic,
    "USD/MXN" => InstrumentClass::Exotic,
    "USD/SGD" => InstrumentClass::Exotic,
    "EUR/TRY" => InstrumentClass::Exotic,
    "XAU/USD" => InstrumentClass::Metal,
    "XAG/USD" => InstrumentClass::Metal,
};

/// A tradeable pair from the catalog, e.g. `EUR/USD`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Instrument {
    symbol: &'static str,
}

impl Instrument {
    /// Parse a symbol. Accepts `EUR/USD`, `eurusd`, `EUR_USD` and `EUR-USD`.
    pub fn parse(raw: &str) -> Result<Self> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase();

        if compact.len() != 6 {
            return Err(MarketDataError::UnknownInstrument(raw.to_string()));
        }

        let key = format!("{}/{}", &compact[..3], &compact[3..]);
        CLASSES
            .get_entry(key.as_str())
            .map(|(symbol, _)| Instrument { symbol: *symbol })
            .ok_or_else(|| MarketDataError::UnknownInstrument(raw.to_string()))
    }

    /// Every catalog instrument in display order
    pub fn all() -> Vec<Instrument> {
        CATALOG.iter().map(|symbol| Instrument { symbol: *symbol }).collect()
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Symbol without the separator (`EURUSD`), as most quote APIs expect
    pub fn compact(&self) -> String {
        self.symbol.replace('/', "")
    }

    pub fn base(&self) -> &'static str {
        &self.symbol[..3]
    }

    pub fn quote(&self) -> &'static str {
        &self.symbol[4..]
    }

    pub fn class(&self) -> InstrumentClass {
        // Catalog entries always have a class
        CLASSES
            .get(self.symbol)
            .copied()
            .unwrap_or(InstrumentClass::Exotic)
    }

    /// Size of one pip in price units
    pub fn pip_size(&self) -> f64 {
        match self.symbol {
            "XAU/USD" => 0.1,
            "XAG/USD" => 0.01,
            _ if self.quote() == "JPY" => 0.01,
            _ => 0.0001,
        }
    }

    /// Position in the catalog; used for stable ordering
    pub fn catalog_index(&self) -> usize {
        CATALOG
            .iter()
            .position(|s| *s == self.symbol)
            .unwrap_or(CATALOG.len())
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol)
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instrument({})", self.symbol)
    }
}

impl std::str::FromStr for Instrument {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self> {
        Instrument::parse(s)
    }
}

impl Serialize for Instrument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol)
    }
}

impl<'de> Deserialize<'de> for Instrument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Instrument::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parse a comma separated symbol list, skipping blanks
pub fn parse_list(raw: &str) -> Result<Vec<Instrument>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Instrument::parse)
        .collect()
}
