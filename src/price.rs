use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{LedgerError, Result};

/// One historical conversion rate: `1 from_unit == factor to_unit`,
/// effective from `when` onwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Price {
    pub when: NaiveDate,
    pub from_unit: String,
    pub to_unit: String,
    pub factor: f64,
}

/// Date-ordered record of unit-to-unit conversion factors. Entries are
/// never overwritten; lookup picks the latest entry applicable at the
/// queried date. Seeded with the built-in binary-size and time-unit
/// chains, all effective 2000-01-01.
#[derive(Clone, Debug, Default)]
pub struct PriceTable {
    entries: BTreeMap<NaiveDate, Vec<Price>>,
}

// 1 kb = 1024 b, and so on up the chain; 1 m = 60 s, 1 h = 60 m.
const DEFAULT_PRICES: &[(&str, &str, f64)] = &[
    ("kb", "b", 1024f64),
    ("mb", "kb", 1024f64),
    ("gb", "mb", 1024f64),
    ("tb", "gb", 1024f64),
    ("pb", "tb", 1024f64),
    ("m", "s", 60f64),
    ("h", "m", 60f64),
];

impl PriceTable {
    pub fn new() -> Self {
        let mut table = PriceTable::default();
        let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        for &(from, to, factor) in DEFAULT_PRICES {
            table.record(epoch, from, to, factor);
        }
        table
    }

    /// Append a price entry. Later entries for the same unit pair never
    /// overwrite earlier ones; both stay available for historical lookup.
    pub fn record(&mut self, when: NaiveDate, from_unit: &str, to_unit: &str, factor: f64) {
        self.entries.entry(when).or_default().push(Price {
            when,
            from_unit: from_unit.to_string(),
            to_unit: to_unit.to_string(),
            factor,
        });
    }

    pub fn entries_at(&self, when: &NaiveDate) -> Option<&Vec<Price>> {
        self.entries.get(when)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct pair lookup: the latest `from -> to` entry with effective
    /// date `<= asof`.
    pub fn rate(&self, from_unit: &str, to_unit: &str, asof: NaiveDate) -> Option<f64> {
        for prices in self.entries.range(..=asof).rev().map(|(_, v)| v) {
            for price in prices.iter().rev() {
                if price.from_unit == from_unit && price.to_unit == to_unit {
                    return Some(price.factor);
                }
            }
        }
        None
    }

    /// The declared outgoing hop from `unit`, if any. The seed table and
    /// journal prices form a simple chain per unit family, so at most one
    /// hop is applicable at a given date.
    fn next_hop(&self, unit: &str, asof: NaiveDate) -> Option<(String, f64)> {
        for prices in self.entries.range(..=asof).rev().map(|(_, v)| v) {
            for price in prices.iter().rev() {
                if price.from_unit == unit {
                    return Some((price.to_unit.clone(), price.factor));
                }
            }
        }
        None
    }

    /// Walk the declared chain from `from` by repeated direct lookups,
    /// multiplying factors until `to` is reached.
    fn walk_chain(&self, from: &str, to: &str, asof: NaiveDate) -> Option<f64> {
        let mut unit = from.to_string();
        let mut factor = 1f64;
        let mut visited = vec![unit.clone()];

        while let Some((next, hop)) = self.next_hop(&unit, asof) {
            factor *= hop;
            if next == to {
                return Some(factor);
            }
            if visited.iter().any(|u| *u == next) {
                return None;
            }
            visited.push(next.clone());
            unit = next;
        }
        None
    }

    /// Convert `amount` from one unit to another as of the given date.
    /// Identity when the units are equal; a direct pair (either way) wins
    /// over chain walking, so a later entry toward some other unit can
    /// never shadow a recorded rate. Otherwise the declared chain is
    /// walked forward, then backward with inverted factors. No chain
    /// between the two units is `UnitPathNotFound`, never a silent zero.
    pub fn convert(&self, amount: f64, from: &str, to: &str, asof: NaiveDate) -> Result<f64> {
        if from == to {
            return Ok(amount);
        }
        if let Some(factor) = self.rate(from, to, asof) {
            return Ok(amount * factor);
        }
        if let Some(factor) = self.rate(to, from, asof) {
            return Ok(amount / factor);
        }
        if let Some(factor) = self.walk_chain(from, to, asof) {
            return Ok(amount * factor);
        }
        if let Some(factor) = self.walk_chain(to, from, asof) {
            return Ok(amount / factor);
        }
        Err(LedgerError::UnitPathNotFound {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
