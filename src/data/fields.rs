use std::collections::HashMap;

use serde_json::{Map, Value};

/// One column of the output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalField {
    /// Key as it appears in the upstream JSON record.
    pub key: &'static str,
    /// Header text written into row 1.
    pub display: &'static str,
}

/// Output column order. Position `i` in this table is column `i + 1` in every
/// generated sheet; downstream consumers read columns by position.
pub const CANONICAL_FIELDS: [CanonicalField; 15] = [
    CanonicalField { key: "FH_TIMESTAMP", display: "Date" },
    CanonicalField { key: "FH_EXPIRY_DT", display: "Expiry Date" },
    CanonicalField { key: "FH_OPTION_TYPE", display: "Option Type" },
    CanonicalField { key: "FH_STRIKE_PRICE", display: "Strike Price" },
    CanonicalField { key: "FH_OPENING_PRICE", display: "Open Price" },
    CanonicalField { key: "FH_TRADE_HIGH_PRICE", display: "High Price" },
    CanonicalField { key: "FH_TRADE_LOW_PRICE", display: "Low Price" },
    CanonicalField { key: "FH_CLOSING_PRICE", display: "Close Price" },
    CanonicalField { key: "FH_LAST_TRADED_PRICE", display: "Last Price" },
    CanonicalField { key: "FH_SETTLE_PRICE", display: "Settled Price" },
    CanonicalField { key: "FH_TOT_TRADED_QTY", display: "Volume" },
    CanonicalField { key: "FH_TOT_TRADED_VAL", display: "Value" },
    CanonicalField { key: "CALCULATED_PREMIUM_VAL", display: "Premium Value" },
    CanonicalField { key: "FH_OPEN_INT", display: "Open Interest" },
    CanonicalField { key: "FH_CHANGE_IN_OI", display: "Change in OI" },
];

/// Keys dropped from every record before mapping: the document id, a duplicate
/// timestamp, and instrument/market metadata.
pub const EXCLUDED_KEYS: [&str; 4] = ["_id", "TIMESTAMP", "FH_INSTRUMENT", "FH_MARKET_TYPE"];

/// Upstream keys in column order.
pub fn canonical_order() -> [&'static str; 15] {
    CANONICAL_FIELDS.map(|f| f.key)
}

/// Header row text in column order.
pub fn header_names() -> [&'static str; 15] {
    CANONICAL_FIELDS.map(|f| f.display)
}

pub fn is_excluded(key: &str) -> bool {
    EXCLUDED_KEYS.contains(&key)
}

/// Positional values for one record. Slot `i` holds the value for the `i`-th
/// key of the order it was mapped with, or `None` if the record lacked it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputRow {
    cells: Vec<Option<Value>>,
}

impl OutputRow {
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Value at a 1-based column, if the record carried that field.
    pub fn get(&self, column: usize) -> Option<&Value> {
        column
            .checked_sub(1)
            .and_then(|i| self.cells.get(i))
            .and_then(Option::as_ref)
    }

    /// `(column, value)` pairs for the fields that were present, 1-based.
    pub fn present(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (i + 1, v)))
    }

    /// True when none of the ordered fields were found.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// Map a raw record onto the canonical column layout.
pub fn map_record(record: &Map<String, Value>) -> OutputRow {
    map_record_with(record, &canonical_order())
}

/// Map a raw record onto an explicit key order.
///
/// Excluded keys are stripped first, so they never surface even if `order`
/// names them. A key missing from the record leaves its slot empty; slots are
/// never shifted left to fill the gap.
pub fn map_record_with(record: &Map<String, Value>, order: &[&str]) -> OutputRow {
    let retained: HashMap<&str, &Value> = record
        .iter()
        .filter(|(k, _)| !is_excluded(k))
        .map(|(k, v)| (k.as_str(), v))
        .collect();

    OutputRow {
        cells: order
            .iter()
            .map(|key| retained.get(key).map(|v| (*v).clone()))
            .collect(),
    }
}
