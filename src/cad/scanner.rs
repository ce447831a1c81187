// src/cad/scanner.rs
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cad::types::{Category, Incident};
use crate::cad::CAD_TIMEZONE;

/// Lines per incident row: id, type, location, municipality, dispatch time, station.
pub const BLOCK_LEN: usize = 6;

static INCIDENT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][0-9]+$").unwrap());
static DISPATCH_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}-[0-9]{2}-[0-9]{4} [0-9]{2}:[0-9]{2}:[0-9]{2}$").unwrap());

const DISPATCH_TIME_FMT: &str = "%m-%d-%Y %H:%M:%S";

/// What a single scanner step consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A section header switched the current category.
    Section(Category),
    /// A table header or "Last Updated" banner.
    TableHeader,
    /// A complete, valid incident block.
    Incident(Incident),
    /// A block that started with an incident id but failed validation.
    Malformed { id: String, raw_timestamp: String },
    /// Any other line.
    Noise,
}

/// Forward-only state machine over the flattened lines of the dispatch page.
///
/// The cursor never moves backwards: an incident block is always consumed in
/// full, even when its timestamp turns out to be invalid, so a single broken
/// row cannot shift the alignment of the rows that follow it.
pub struct SectionScanner<'a> {
    lines: &'a [String],
    cursor: usize,
    category: Category,
    done: bool,
}

impl<'a> SectionScanner<'a> {
    pub fn new(lines: &'a [String]) -> Self {
        Self {
            lines,
            cursor: 0,
            category: Category::Unknown,
            done: false,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Advance by one rule application. `None` once the input is exhausted or
    /// a trailing block is too short to complete.
    pub fn step(&mut self) -> Option<Step> {
        let lines = self.lines;
        if self.done || self.cursor >= lines.len() {
            self.done = true;
            return None;
        }

        let line = lines[self.cursor].as_str();

        let header = match line {
            "Fire Incidents" => Some(Category::Fire),
            "EMS Incidents" => Some(Category::Ems),
            "Traffic Incidents" => Some(Category::Traffic),
            _ => None,
        };
        if let Some(category) = header {
            self.category = category;
            self.cursor += 1;
            return Some(Step::Section(category));
        }

        if line.starts_with("Incident No.") || line.starts_with("Last Updated") {
            self.cursor += 1;
            return Some(Step::TableHeader);
        }

        if !INCIDENT_ID_RE.is_match(line) {
            self.cursor += 1;
            return Some(Step::Noise);
        }

        if lines.len() - self.cursor < BLOCK_LEN {
            self.done = true;
            return None;
        }

        let block = &lines[self.cursor..self.cursor + BLOCK_LEN];
        self.cursor += BLOCK_LEN;

        match parse_block(block, self.category) {
            Some(incident) => Some(Step::Incident(incident)),
            None => Some(Step::Malformed {
                id: block[0].trim().to_string(),
                raw_timestamp: block[4].trim().to_string(),
            }),
        }
    }
}

impl Iterator for SectionScanner<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        self.step()
    }
}

/// Result of scanning one page.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub incidents: Vec<Incident>,
    pub malformed: usize,
}

pub fn scan(lines: &[String]) -> ScanReport {
    let mut report = ScanReport::default();
    for step in SectionScanner::new(lines) {
        match step {
            Step::Incident(incident) => report.incidents.push(incident),
            Step::Malformed { id, raw_timestamp } => {
                tracing::debug!(%id, %raw_timestamp, "dropping incident block with bad dispatch time");
                report.malformed += 1;
            }
            Step::Section(_) | Step::TableHeader | Step::Noise => {}
        }
    }
    report
}

/// Parse a `MM-DD-YYYY HH:MM:SS` dispatch time as local time in the CAD timezone.
/// Ambiguous wall-clock times (DST fall-back) resolve to the earlier instant;
/// times inside the spring-forward gap do not exist and are rejected.
pub fn parse_dispatch_time(raw: &str) -> Option<DateTime<Tz>> {
    if !DISPATCH_TIME_RE.is_match(raw) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(raw, DISPATCH_TIME_FMT).ok()?;
    CAD_TIMEZONE.from_local_datetime(&naive).earliest()
}

fn parse_block(block: &[String], category: Category) -> Option<Incident> {
    let [id, incident_type, location, municipality, raw_ts, station] = block else {
        return None;
    };
    let raw_ts = raw_ts.trim();
    let timestamp = parse_dispatch_time(raw_ts)?;
    Some(Incident::new(
        id.trim(),
        incident_type.trim(),
        location.trim(),
        municipality.trim(),
        raw_ts,
        station.trim(),
        timestamp,
        category,
    ))
}
