//! Market data records shared by all exchanges

use serde::{Deserialize, Serialize};

/// 24h volume of one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTicker {
    pub symbol: String,

    /// Parsed volume, `0.0` when the exchange sent something unparsable
    pub volume_24h: f64,

    /// Volume exactly as reported, used in notifications
    pub raw_volume: String,
}

impl VolumeTicker {
    pub fn new(symbol: impl Into<String>, raw_volume: impl Into<String>) -> Self {
        let raw_volume = raw_volume.into();
        Self {
            symbol: symbol.into(),
            volume_24h: parse_number(&raw_volume),
            raw_volume,
        }
    }
}

/// One member of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    /// Venue the price is sourced from
    pub venue: String,
    pub symbol: String,
    /// Weight as reported by the exchange
    pub weight: String,
}

impl Constituent {
    pub fn new(venue: impl Into<String>, symbol: impl Into<String>, weight: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            symbol: symbol.into(),
            weight: weight.into(),
        }
    }

    fn weight_value(&self) -> f64 {
        parse_number(&self.weight)
    }
}

/// Index composition of a contract at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituentSnapshot {
    pub symbol: String,
    pub constituents: Vec<Constituent>,
}

impl ConstituentSnapshot {
    pub fn new(symbol: impl Into<String>, constituents: Vec<Constituent>) -> Self {
        Self {
            symbol: symbol.into(),
            constituents,
        }
    }

    /// Deterministic multi-line form used to detect changes
    ///
    /// Members are ordered by descending weight, ties by venue then symbol, so
    /// the order of the source feed never shows up as a change.
    pub fn canonical(&self) -> String {
        let mut members: Vec<&Constituent> = self.constituents.iter().collect();
        members.sort_by(|a, b| {
            b.weight_value()
                .total_cmp(&a.weight_value())
                .then_with(|| a.venue.cmp(&b.venue))
                .then_with(|| a.symbol.cmp(&b.symbol))
                .then_with(|| a.weight.cmp(&b.weight))
        });

        members
            .iter()
            .map(|c| format!("  - {}: {} (Weight: {})", c.venue, c.symbol, c.weight))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether both snapshots render to the same canonical form
    pub fn same_composition(&self, other: &ConstituentSnapshot) -> bool {
        self.canonical() == other.canonical()
    }
}

/// Lenient number parsing, exchanges send numbers as strings
pub fn parse_number(value: &str) -> f64 {
    value.trim().parse().unwrap_or(0.0)
}
