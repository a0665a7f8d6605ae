//! Tabular parser
//!
//! Turns delimited text into typed rows. Columns are mapped to fields by
//! header name and cells are trimmed. Parsing is all-or-nothing: a row with
//! the wrong number of cells or a value that does not deserialize fails the
//! whole input with the offending line number.

use crate::domain::{ParseError, PatientRecord};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;

/// A row type that can be read from a header-mapped table
pub trait TabularRecord: DeserializeOwned {
    /// Headers that must be present for the table to be accepted
    const REQUIRED_HEADERS: &'static [&'static str];
}

impl TabularRecord for PatientRecord {
    const REQUIRED_HEADERS: &'static [&'static str] =
        &["Identifier", "FirstName", "LastName", "BirthDate"];
}

/// Parses comma-separated bytes into records of type `T`
///
/// Input that contains nothing but whitespace yields an empty vector.
///
/// # Errors
///
/// Returns a [`ParseError`] if a required header is missing, a row has a
/// different number of cells than the header, or a cell cannot be converted.
pub fn parse_records<T: TabularRecord>(bytes: &[u8]) -> Result<Vec<T>, ParseError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader.headers().map_err(to_parse_error)?.clone();
    let missing: Vec<&str> = T::REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::new(
            1,
            format!("missing required column(s): {}", missing.join(", ")),
        ));
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<T>() {
        records.push(row.map_err(to_parse_error)?);
    }

    tracing::debug!(rows = records.len(), "Parsed tabular input");
    Ok(records)
}

/// Parses patient rows
pub fn parse_patients(bytes: &[u8]) -> Result<Vec<PatientRecord>, ParseError> {
    parse_records(bytes)
}

fn to_parse_error(err: csv::Error) -> ParseError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    let message = match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("found {len} field(s), expected {expected_len}"),
        csv::ErrorKind::Deserialize { err, .. } => match err.field() {
            Some(index) => format!("column {}: {}", index + 1, err.kind()),
            None => err.kind().to_string(),
        },
        csv::ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8: {err}"),
        _ => err.to_string(),
    };
    ParseError::new(line, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PATIENTS: &str = "\
Identifier,FirstName,LastName,BirthDate,Gender,Citizenship,MaritalStatus
PAT0001,Anna,Meyer,1990-01-31,female,DE,M
PAT0002, Jan ,Novak,01.12.1975,male,CZ,
PAT0003,Lea,Roth,2001-06-15,female,,S
";

    #[test]
    fn test_parse_patients_maps_by_header() {
        let records = parse_patients(PATIENTS.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].identifier, "PAT0001");
        assert_eq!(records[0].citizenship.as_deref(), Some("DE"));
        assert_eq!(records[1].first_name, "Jan");
        assert_eq!(records[1].birth_date, NaiveDate::from_ymd_opt(1975, 12, 1));
        assert_eq!(records[1].marital_status, None);
        assert_eq!(records[2].citizenship, None);
        assert!(records[2].email.is_none());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first = parse_patients(PATIENTS.as_bytes()).unwrap();
        let second = parse_patients(PATIENTS.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let input = "LastName,BirthDate,Identifier,FirstName\nMeyer,1990-01-31,PAT0001,Anna\n";
        let records = parse_patients(input.as_bytes()).unwrap();
        assert_eq!(records[0].identifier, "PAT0001");
        assert_eq!(records[0].last_name, "Meyer");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_patients(b"").unwrap().is_empty());
        assert!(parse_patients(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn test_header_only() {
        let records = parse_patients(b"Identifier,FirstName,LastName,BirthDate\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_wrong_column_count_fails_whole_parse() {
        let input = "Identifier,FirstName,LastName,BirthDate\nPAT0001,Anna,Meyer,1990-01-31\nPAT0002,Jan\n";
        let err = parse_patients(input.as_bytes()).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("expected 4"));
    }

    #[test]
    fn test_unparseable_date_fails() {
        let input = "Identifier,FirstName,LastName,BirthDate\nPAT0001,Anna,Meyer,31/01/1990\n";
        let err = parse_patients(input.as_bytes()).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("invalid date"));
    }

    #[test]
    fn test_empty_date_is_left_to_validator() {
        let input = "Identifier,FirstName,LastName,BirthDate\nPAT0001,Anna,Meyer,\n";
        let records = parse_patients(input.as_bytes()).unwrap();
        assert_eq!(records[0].birth_date, None);
    }

    #[test]
    fn test_missing_required_header() {
        let input = "Identifier,FirstName,BirthDate\nPAT0001,Anna,1990-01-31\n";
        let err = parse_patients(input.as_bytes()).unwrap_err();
        assert!(err.message.contains("LastName"));
    }
}
