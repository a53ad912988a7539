//! Record parser
//!
//! Turns raw registry lines (`ASN|ORG|REGISTRANT_ID|CIDR1|CIDR2|...`) into
//! [`SourceRecord`] values.

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::model::SourceRecord;

/// Minimum number of fields: ASN, organization, registrant id
const MIN_FIELDS: usize = 3;

/// A record together with the line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    /// 1-based line number
    pub line: usize,
    pub record: SourceRecord,
}

/// Outcome of parsing a whole input
#[derive(Debug, Default)]
pub struct ParsedLines {
    pub records: Vec<ParsedRecord>,
    /// One `MalformedRecord` error per skipped line
    pub skipped: Vec<Error>,
}

/// Delimiter-separated line parser
#[derive(Debug, Clone, Copy)]
pub struct RecordParser {
    delimiter: char,
}

impl RecordParser {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.delimiter)
    }

    /// Parse a single line
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: A well-formed record
    /// - `Ok(None)`: The line is blank
    /// - `Err(Error::MalformedRecord)`: Fewer than three fields, or an empty ASN/organization
    pub fn parse_line(&self, line_no: usize, line: &str) -> Result<Option<SourceRecord>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split(self.delimiter).map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            return Err(Error::malformed(
                line_no,
                format!(
                    "expected at least {} fields, found {}",
                    MIN_FIELDS,
                    fields.len()
                ),
            ));
        }

        let (asn, org, registrant_id) = (fields[0], fields[1], fields[2]);
        if asn.is_empty() {
            return Err(Error::malformed(line_no, "empty ASN field"));
        }
        if org.is_empty() {
            return Err(Error::malformed(line_no, "empty organization field"));
        }

        let cidrs = fields[MIN_FIELDS..].iter().filter(|f| !f.is_empty()).copied();

        Ok(Some(SourceRecord::new(asn, org, registrant_id, cidrs)))
    }

    /// Parse every line, collecting malformed ones instead of failing
    pub fn parse_all<S: AsRef<str>>(&self, lines: &[S]) -> ParsedLines {
        let mut parsed = ParsedLines::default();
        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;
            match self.parse_line(line_no, line.as_ref()) {
                Ok(Some(record)) => parsed.records.push(ParsedRecord {
                    line: line_no,
                    record,
                }),
                Ok(None) => {}
                Err(e) => parsed.skipped.push(e),
            }
        }
        parsed
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::from_config(&ParserConfig::default())
    }
}
