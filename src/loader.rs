// Delimited-text ingestion.
//
// Source files disagree on their delimiter: semicolon is preferred, comma is
// common, tab turns up now and then. `parse_table` walks a small state
// machine until the header splits into real columns:
//
// `Primary (;)` -> `Secondary (,)` -> `AutoDetect` -> `ManualSplit`
//
// A parse is rejected when it yields a single header field that still
// contains a delimiter character. Rejections are never errors; the last
// state always produces a table.
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use tracing::debug;

pub const PRIMARY_DELIMITER: u8 = b';';
pub const SECONDARY_DELIMITER: u8 = b',';

// Tried in this order when sniffing.
const DETECT_CANDIDATES: [u8; 4] = [b',', b'\t', b'|', b';'];
const MANUAL_CANDIDATES: [char; 3] = [',', ';', '\t'];
const GARBAGE_MARKERS: [char; 3] = [',', ';', '\t'];
const DETECT_PREVIEW_ROWS: usize = 10;

/// One input row keyed by header name. Values are always strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    values: HashMap<String, String>,
}

impl RawRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Which step of the delimiter cascade produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Primary,
    Secondary,
    AutoDetect,
    ManualSplit,
}

/// A parsed delimited file: header order plus one record per data line.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
    pub state: ParseState,
    pub delimiter: u8,
}

impl Table {
    pub fn empty() -> Self {
        Self {
            headers: Vec::new(),
            records: Vec::new(),
            state: ParseState::Primary,
            delimiter: PRIMARY_DELIMITER,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn is_garbage(&self) -> bool {
        self.headers.len() == 1 && self.headers[0].contains(&GARBAGE_MARKERS[..])
    }
}

/// Parse delimited text with the first line as header.
pub fn parse_table(text: &str) -> Table {
    let mut state = ParseState::Primary;
    loop {
        let table = match state {
            ParseState::Primary => parse_with(text, PRIMARY_DELIMITER, state),
            ParseState::Secondary => parse_with(text, SECONDARY_DELIMITER, state),
            ParseState::AutoDetect => parse_with(text, detect_delimiter(text), state),
            ParseState::ManualSplit => manual_split(text),
        };
        if !table.is_garbage() || state == ParseState::ManualSplit {
            debug!(
                state = ?table.state,
                delimiter = %(table.delimiter as char).escape_default(),
                columns = table.headers.len(),
                rows = table.records.len(),
                "parsed delimited table"
            );
            return table;
        }
        state = match state {
            ParseState::Primary => ParseState::Secondary,
            ParseState::Secondary => ParseState::AutoDetect,
            ParseState::AutoDetect | ParseState::ManualSplit => ParseState::ManualSplit,
        };
    }
}

fn parse_with(text: &str, delimiter: u8, state: ParseState) -> Table {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match rdr.headers() {
        Ok(h) => clean_headers(h.iter()),
        Err(_) => Vec::new(),
    };

    let mut records = Vec::new();
    for result in rdr.records() {
        let Ok(row) = result else { continue };
        if is_blank(&row) {
            continue;
        }
        records.push(zip_row(&headers, row.iter()));
    }

    Table {
        headers,
        records,
        state,
        delimiter,
    }
}

/// Pick the delimiter whose first rows split into the most consistent field
/// count of at least two. Falls back to comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let mut best: Option<(usize, f64, u8)> = None;
    for &delim in &DETECT_CANDIDATES {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let counts: Vec<usize> = rdr
            .records()
            .filter_map(|r| r.ok())
            .filter(|r| !is_blank(r))
            .take(DETECT_PREVIEW_ROWS)
            .map(|r| r.len())
            .collect();
        if counts.is_empty() {
            continue;
        }
        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        if avg < 2.0 {
            continue;
        }
        let delta: usize = counts.windows(2).map(|w| w[0].abs_diff(w[1])).sum();
        let better = match best {
            None => true,
            Some((best_delta, best_avg, _)) => {
                delta < best_delta || (delta == best_delta && avg > best_avg)
            }
        };
        if better {
            best = Some((delta, avg, delim));
        }
    }
    best.map(|(_, _, d)| d).unwrap_or(SECONDARY_DELIMITER)
}

// Last resort: split lines by hand using whichever candidate breaks the
// header into more than one field.
fn manual_split(text: &str) -> Table {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());
    let Some(header_line) = lines.next() else {
        return Table {
            state: ParseState::ManualSplit,
            ..Table::empty()
        };
    };
    let header_line = header_line.trim_start_matches('\u{feff}');

    let mut delimiter = MANUAL_CANDIDATES[0];
    let mut headers: Vec<String> = Vec::new();
    for &d in &MANUAL_CANDIDATES {
        let parts: Vec<String> = header_line
            .split(d)
            .map(clean_cell)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() > 1 {
            delimiter = d;
            headers = parts;
            break;
        }
    }
    if headers.is_empty() {
        headers = header_line.split(delimiter).map(clean_cell).collect();
    }
    let records = lines
        .map(|line| {
            let values: Vec<String> = line.split(delimiter).map(clean_cell).collect();
            zip_row(&headers, values.iter().map(String::as_str))
        })
        .collect();

    Table {
        headers,
        records,
        state: ParseState::ManualSplit,
        delimiter: delimiter as u8,
    }
}

fn clean_headers<'a>(fields: impl Iterator<Item = &'a str>) -> Vec<String> {
    fields
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect()
}

fn clean_cell(s: &str) -> String {
    s.trim().trim_matches('"').trim().to_string()
}

fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(|f| f.trim().is_empty())
}

// Values are matched to headers by position; short rows pad with "" and
// surplus values are dropped.
fn zip_row<'a>(headers: &[String], values: impl Iterator<Item = &'a str>) -> RawRecord {
    let mut values = values;
    let map = headers
        .iter()
        .map(|h| (h.clone(), values.next().unwrap_or("").to_string()))
        .collect();
    RawRecord { values: map }
}
