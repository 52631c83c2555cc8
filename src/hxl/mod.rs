//! HXL-tagged tabular input.
//!
//! The Humanitarian Exchange Language marks spreadsheet columns with a
//! hashtag row (`#country +name +interaction`) instead of relying on
//! positional headers. This module finds that row, parses each column's
//! tag and attributes, and yields data rows that can be queried by
//! [`TagPattern`].
//!
//! Remote fetching lives in [`source`]; the parsing here works on any
//! [`std::io::Read`] so it can be fed from files, HTTP bodies or strings.

pub mod source;

use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::rc::Rc;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::SyncError;

/// How many leading rows are searched for the hashtag row.
pub const TAG_ROW_SCAN_LIMIT: usize = 25;

/// A parsed column specification from the hashtag row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    /// Hashtag without the leading `#`, lowercased.
    pub tag: String,
    /// Attributes without the leading `+`, lowercased.
    pub attributes: BTreeSet<String>,
    /// Text header above the hashtag row, if there was one.
    pub header: Option<String>,
}

impl Column {
    /// Parse a hashtag cell such as `#country +code +m49`.
    ///
    /// Returns `None` when the cell is not a valid HXL tag spec.
    pub fn parse(spec: &str) -> Option<Self> {
        let compact: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
        let body = compact.strip_prefix('#')?;

        let mut parts = body.split('+');
        let tag = parts.next()?.to_ascii_lowercase();
        if !is_token(&tag) {
            return None;
        }

        let mut attributes = BTreeSet::new();
        for attribute in parts {
            let attribute = attribute.to_ascii_lowercase();
            if !is_token(&attribute) {
                return None;
            }
            attributes.insert(attribute);
        }

        Some(Self {
            tag,
            attributes,
            header: None,
        })
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.tag)?;
        for attribute in &self.attributes {
            write!(f, "+{}", attribute)?;
        }
        Ok(())
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A pattern for selecting columns, e.g. `#country+code+m49` or `org-funder`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct TagPattern {
    tag: String,
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl TagPattern {
    /// Build a pattern from a hashtag and required attributes.
    pub fn from_parts(tag: &str, include: &[&str]) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            include: include.iter().map(|a| a.to_ascii_lowercase()).collect(),
            exclude: BTreeSet::new(),
        }
    }

    /// Returns true if the column satisfies this pattern.
    pub fn matches(&self, column: &Column) -> bool {
        column.tag == self.tag
            && self.include.iter().all(|a| column.attributes.contains(a))
            && !self.exclude.iter().any(|a| column.attributes.contains(a))
    }
}

impl FromStr for TagPattern {
    type Err = SyncError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| SyncError::InvalidTagPattern {
            pattern: pattern.to_string(),
            message: message.to_string(),
        };

        let compact: String = pattern
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        let body = compact.strip_prefix('#').unwrap_or(&compact);

        let tag_end = body.find(['+', '-']).unwrap_or(body.len());
        let tag = &body[..tag_end];
        if !is_token(tag) {
            return Err(invalid("expected a hashtag like '#country'"));
        }

        let mut include = BTreeSet::new();
        let mut exclude = BTreeSet::new();
        let mut rest = &body[tag_end..];
        while let Some(sign) = rest.chars().next() {
            let after = &rest[1..];
            let end = after.find(['+', '-']).unwrap_or(after.len());
            let attribute = &after[..end];
            if !is_token(attribute) {
                return Err(invalid("attributes must be non-empty words"));
            }
            if sign == '+' {
                include.insert(attribute.to_string());
            } else {
                exclude.insert(attribute.to_string());
            }
            rest = &after[end..];
        }

        Ok(Self {
            tag: tag.to_string(),
            include,
            exclude,
        })
    }
}

impl TryFrom<String> for TagPattern {
    type Error = SyncError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        pattern.parse()
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.tag)?;
        for attribute in &self.include {
            write!(f, "+{}", attribute)?;
        }
        for attribute in &self.exclude {
            write!(f, "-{}", attribute)?;
        }
        Ok(())
    }
}

/// One data row below the hashtag row.
#[derive(Clone, Debug)]
pub struct HxlRow {
    columns: Rc<[Option<Column>]>,
    values: Vec<String>,
    /// 1-based line number in the source, for diagnostics.
    pub row_number: usize,
}

impl HxlRow {
    /// First non-empty value in a column matching `pattern`.
    pub fn get(&self, pattern: &TagPattern) -> Option<&str> {
        self.columns
            .iter()
            .zip(&self.values)
            .filter_map(|(column, value)| column.as_ref().map(|c| (c, value)))
            .filter(|(column, _)| pattern.matches(column))
            .map(|(_, value)| value.as_str())
            .find(|value| !value.is_empty())
    }

    /// Raw cell values, trimmed.
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Streaming reader over HXL-tagged CSV.
///
/// Rows are pulled lazily from the underlying reader; nothing beyond the
/// hashtag row is buffered.
pub struct HxlReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    columns: Rc<[Option<Column>]>,
    source_name: String,
    row_number: usize,
}

impl<R: Read> HxlReader<R> {
    /// Locate the hashtag row and prepare to stream the data rows after it.
    pub fn new(reader: R, source_name: impl Into<String>) -> Result<Self, SyncError> {
        let source_name = source_name.into();
        let mut records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records();

        let mut previous: Option<csv::StringRecord> = None;
        let mut row_number = 0;

        while row_number < TAG_ROW_SCAN_LIMIT {
            let Some(record) = records.next() else {
                break;
            };
            let record = record.map_err(|source| SyncError::HxlParse {
                source_name: source_name.clone(),
                source,
            })?;
            row_number += 1;

            if let Some(columns) = parse_tag_row(&record, previous.as_ref()) {
                log::debug!(
                    "{}: hashtag row found at line {} ({} tagged column(s))",
                    source_name,
                    row_number,
                    columns.iter().flatten().count()
                );
                for column in columns.iter().flatten() {
                    log::debug!(
                        "  {} <- {}",
                        column,
                        column.header.as_deref().unwrap_or("(no header)")
                    );
                }
                return Ok(Self {
                    records,
                    columns: columns.into(),
                    source_name,
                    row_number,
                });
            }
            previous = Some(record);
        }

        Err(SyncError::MissingTagRow {
            source_name,
            scanned: row_number,
        })
    }

    /// The tagged columns, in source order (`None` for untagged columns).
    pub fn columns(&self) -> &[Option<Column>] {
        &self.columns
    }
}

impl<R: Read> Iterator for HxlReader<R> {
    type Item = Result<HxlRow, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(source) => {
                    self.row_number += 1;
                    return Some(Err(SyncError::HxlParse {
                        source_name: self.source_name.clone(),
                        source,
                    }))
                }
            };
            self.row_number += 1;

            let values: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
            if values.iter().all(String::is_empty) {
                continue;
            }

            return Some(Ok(HxlRow {
                columns: Rc::clone(&self.columns),
                values,
                row_number: self.row_number,
            }));
        }
    }
}

/// A row is the hashtag row if it has at least one tag and every
/// non-empty cell is a valid tag spec.
fn parse_tag_row(
    record: &csv::StringRecord,
    headers: Option<&csv::StringRecord>,
) -> Option<Vec<Option<Column>>> {
    let mut columns = Vec::with_capacity(record.len());
    let mut tagged = 0;

    for (idx, cell) in record.iter().enumerate() {
        let cell = cell.trim();
        if cell.is_empty() {
            columns.push(None);
            continue;
        }
        let mut column = Column::parse(cell)?;
        column.header = headers
            .and_then(|h| h.get(idx))
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        columns.push(Some(column));
        tagged += 1;
    }

    (tagged > 0).then_some(columns)
}

/// Parse HXL rows from an in-memory string.
///
/// Useful for testing without file I/O.
pub fn from_hxl_str(data: &str) -> Result<Vec<HxlRow>, SyncError> {
    HxlReader::new(data.as_bytes(), "<string>")?.collect()
}

/// Parse HXL rows from a byte slice.
pub fn from_hxl_slice(data: &[u8]) -> Result<Vec<HxlRow>, SyncError> {
    HxlReader::new(data, "<bytes>")?.collect()
}
