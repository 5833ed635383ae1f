use crate::algebra::summary::{FiveNumber, RangeProportion};
use crate::error::Result;
use json::{object, JsonValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Results of the walkthrough steps, keyed by step
#[derive(Debug)]
pub struct Report {
    data: JsonValue,
}

fn five_number_json(s: &FiveNumber) -> JsonValue {
    object! {
        min: s.min,
        lower_quartile: s.lower_quartile,
        median: s.median,
        upper_quartile: s.upper_quartile,
        max: s.max,
    }
}

impl Report {
    pub fn new() -> Report {
        Report { data: object! {} }
    }

    pub fn set<V: Into<JsonValue>>(&mut self, key: &str, value: V) {
        self.data[key] = value.into();
    }

    /// The keys are the digits, the values their five-number summaries
    pub fn set_summaries(&mut self, key: &str, summaries: &BTreeMap<usize, FiveNumber>) {
        let mut entry = object! {};
        for (digit, s) in summaries {
            entry[digit.to_string()] = five_number_json(s);
        }
        self.data[key] = entry;
    }

    pub fn set_proportion(&mut self, key: &str, p: &RangeProportion) {
        let mut by_label = object! {};
        for (digit, share) in &p.by_label {
            by_label[digit.to_string()] = (*share).into();
        }
        self.data[key] = object! {
            overall: p.overall,
            by_label: by_label,
        };
    }

    pub fn get(&self, key: &str) -> &JsonValue {
        &self.data[key]
    }

    pub fn to_pretty(&self) -> String {
        self.data.pretty(2)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.data.dump().as_bytes())?;

        Ok(())
    }
}

impl Default for Report {
    fn default() -> Self {
        Report::new()
    }
}

#[derive(Serialize)]
struct SummaryRow {
    digit: usize,
    min: f64,
    lower_quartile: f64,
    median: f64,
    upper_quartile: f64,
    max: f64,
}

/// Write one CSV row per digit with its five-number summary
pub fn write_summaries<W: std::io::Write>(
    out: W,
    summaries: &BTreeMap<usize, FiveNumber>,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    for (&digit, s) in summaries {
        wtr.serialize(SummaryRow {
            digit,
            min: s.min,
            lower_quartile: s.lower_quartile,
            median: s.median,
            upper_quartile: s.upper_quartile,
            max: s.max,
        })?;
    }
    wtr.flush()?;

    Ok(())
}
