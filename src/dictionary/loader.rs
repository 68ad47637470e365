//! Dictionary file parsing
//!
//! The dictionary is a delimited text file (tab by default) with one row
//! per source column and a mandatory header row. Parsing is strict:
//! unknown keywords and short rows are fatal, because a silently
//! mis-parsed directive on a text column is an information-leak risk.

use crate::dictionary::entry::{DataDictionaryEntry, Decision, SourceDatatype};
use crate::domain::errors::DictionaryError;
use crate::scrub::IdentifierKind;

/// Header columns, in required order
pub const EXPECTED_HEADER: [&str; 12] = [
    "source_db",
    "source_table",
    "source_field",
    "source_datatype",
    "decision",
    "dest_table",
    "dest_field",
    "dest_datatype",
    "is_patient_identifier",
    "identifier_kind",
    "index_requested",
    "comment",
];

/// Parse dictionary file content into entries.
///
/// Blank lines and lines starting with `#` are skipped. The header row
/// must match [`EXPECTED_HEADER`] exactly (case-insensitive).
pub fn parse_entries(
    content: &str,
    delimiter: char,
) -> Result<Vec<DataDictionaryEntry>, DictionaryError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'));

    let (_, header) = lines
        .next()
        .ok_or_else(|| DictionaryError::InvalidHeader("dictionary file is empty".to_string()))?;
    check_header(header, delimiter)?;

    let mut entries = Vec::new();
    for (line_no, line) in lines {
        entries.push(parse_line(line_no, line, delimiter)?);
    }

    Ok(entries)
}

fn check_header(header: &str, delimiter: char) -> Result<(), DictionaryError> {
    let fields: Vec<String> = header
        .split(delimiter)
        .map(|f| f.trim().to_lowercase())
        .collect();

    if fields.len() != EXPECTED_HEADER.len() {
        return Err(DictionaryError::InvalidHeader(format!(
            "expected {} columns, found {}",
            EXPECTED_HEADER.len(),
            fields.len()
        )));
    }

    for (found, expected) in fields.iter().zip(EXPECTED_HEADER.iter()) {
        if found != expected {
            return Err(DictionaryError::InvalidHeader(format!(
                "expected column '{expected}', found '{found}'"
            )));
        }
    }

    Ok(())
}

fn parse_line(
    line_no: usize,
    line: &str,
    delimiter: char,
) -> Result<DataDictionaryEntry, DictionaryError> {
    let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();

    if fields.len() != EXPECTED_HEADER.len() {
        return Err(DictionaryError::FieldCount {
            line: line_no,
            expected: EXPECTED_HEADER.len(),
            found: fields.len(),
        });
    }

    let decision =
        Decision::parse(fields[4]).ok_or_else(|| DictionaryError::UnknownDecision {
            line: line_no,
            value: fields[4].to_string(),
        })?;

    let source_datatype =
        SourceDatatype::parse(fields[3]).ok_or_else(|| DictionaryError::UnknownDatatype {
            line: line_no,
            value: fields[3].to_string(),
        })?;

    let identifier_kind = if fields[9].is_empty() {
        None
    } else {
        Some(IdentifierKind::parse(fields[9]).ok_or_else(|| {
            DictionaryError::UnknownIdentifierKind {
                line: line_no,
                value: fields[9].to_string(),
            }
        })?)
    };

    Ok(DataDictionaryEntry {
        source_db: fields[0].to_string(),
        source_table: fields[1].to_string(),
        source_field: fields[2].to_string(),
        source_datatype,
        decision,
        dest_table: fields[5].to_string(),
        dest_field: fields[6].to_string(),
        dest_datatype: fields[7].to_string(),
        is_patient_identifier: parse_bool(fields[8]),
        identifier_kind,
        index_requested: parse_bool(fields[10]),
        comment: fields[11].to_string(),
    })
}

/// Lenient boolean parse for dictionary flag columns.
///
/// Anything other than an affirmative keyword reads as false; dictionary
/// authors use a mix of spreadsheet conventions.
fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
        EXPECTED_HEADER.join("\t")
    }

    #[test]
    fn test_parse_single_entry() {
        let content = format!(
            "{}\nehr\tpatients\tforename\ttext\tOMIT\t\t\t\ttrue\tname\tfalse\tfed to scrubber\n",
            header()
        );
        let entries = parse_entries(&content, '\t').unwrap();

        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.source_table, "patients");
        assert_eq!(e.decision, Decision::Omit);
        assert!(e.is_patient_identifier);
        assert_eq!(e.identifier_kind, Some(IdentifierKind::Name));
        assert_eq!(e.comment, "fed to scrubber");
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let content = format!(
            "{}\n\n# internal note\nehr\tpatients\tpatient_id\tinteger\tPRIMARY_PID\tpatients\trid\ttext\tfalse\t\ttrue\t\n",
            header()
        );
        let entries = parse_entries(&content, '\t').unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].decision, Decision::PrimaryPid);
        assert!(entries[0].index_requested);
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        let content = "a\tb\tc\n";
        let err = parse_entries(content, '\t').unwrap_err();
        assert!(matches!(err, DictionaryError::InvalidHeader(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_decision() {
        let content = format!(
            "{}\nehr\tpatients\tforename\ttext\tKEEP\tp\tf\ttext\tfalse\t\tfalse\t\n",
            header()
        );
        let err = parse_entries(&content, '\t').unwrap_err();
        assert!(matches!(
            err,
            DictionaryError::UnknownDecision { line: 2, .. }
        ));
    }

    #[test]
    fn test_parse_rejects_short_row() {
        let content = format!("{}\nehr\tpatients\tforename\n", header());
        let err = parse_entries(&content, '\t').unwrap_err();
        assert!(matches!(err, DictionaryError::FieldCount { found: 3, .. }));
    }

    #[test]
    fn test_parse_bool_conventions() {
        assert!(parse_bool("true"));
        assert!(parse_bool("Yes"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("no"));
    }

    #[test]
    fn test_comma_delimiter() {
        let content = format!(
            "{}\nehr,notes,clinical_note,text,INCLUDE_SCRUBBED,notes,clinical_note,text,false,,false,\n",
            EXPECTED_HEADER.join(",")
        );
        let entries = parse_entries(&content, ',').unwrap();
        assert_eq!(entries[0].decision, Decision::IncludeScrubbed);
    }
}
