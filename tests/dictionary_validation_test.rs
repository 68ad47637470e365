//! Dictionary loading and validation from real files

use std::io::Write;
use tempfile::NamedTempFile;
use veil::dictionary::{Decision, Dictionary};
use veil::domain::errors::DictionaryError;

const HEADER: &str = "source_db\tsource_table\tsource_field\tsource_datatype\tdecision\tdest_table\tdest_field\tdest_datatype\tis_patient_identifier\tidentifier_kind\tindex_requested\tcomment";

fn write_dictionary(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_load_valid_dictionary_from_file() {
    let file = write_dictionary(&[
        "ehr\tpatients\tpatient_id\tinteger\tPRIMARY_PID\tpatients\trid\ttext\tfalse\t\ttrue\tjoin key",
        "ehr\tpatients\tforename\ttext\tOMIT\t\t\t\ttrue\tname\tfalse\tfed to scrubber",
        "ehr\tpatients\tsex\ttext\tINCLUDE_VERBATIM\tpatients\tsex\ttext\tfalse\t\tfalse\t",
    ]);

    let dd = Dictionary::load(file.path(), '\t').unwrap();
    assert_eq!(dd.entries().len(), 3);

    let policy = dd.table_policy("ehr", "patients").unwrap();
    assert!(!policy.is_system());
    assert_eq!(policy.primary_pid_column.as_deref(), Some("patient_id"));

    let pid_entry = dd
        .entries()
        .iter()
        .find(|e| e.source_field == "patient_id")
        .unwrap();
    assert_eq!(pid_entry.decision, Decision::PrimaryPid);
    assert!(pid_entry.index_requested);
    assert_eq!(pid_entry.comment, "join key");
}

#[test]
fn test_two_primary_pids_fatal() {
    let file = write_dictionary(&[
        "ehr\tpatients\tpatient_id\tinteger\tPRIMARY_PID\tpatients\trid\ttext\tfalse\t\ttrue\t",
        "ehr\tpatients\tlegacy_id\tinteger\tPRIMARY_PID\tpatients\trid2\ttext\tfalse\t\tfalse\t",
    ]);

    let err = Dictionary::load(file.path(), '\t').unwrap_err();
    assert!(matches!(err, DictionaryError::MultiplePrimaryPid { .. }));
}

#[test]
fn test_scrubbed_non_text_fatal() {
    let file = write_dictionary(&[
        "ehr\tpatients\tpatient_id\tinteger\tPRIMARY_PID\tpatients\trid\ttext\tfalse\t\ttrue\t",
        "ehr\tpatients\tdob\tdate\tINCLUDE_SCRUBBED\tpatients\tdob\tdate\tfalse\t\tfalse\t",
    ]);

    let err = Dictionary::load(file.path(), '\t').unwrap_err();
    assert!(matches!(err, DictionaryError::ScrubbedNonText { .. }));
}

#[test]
fn test_scrubbed_system_table_fatal() {
    // A scrub directive in a table with no PRIMARY_PID can never be
    // satisfied; catching it at load time is the leak guard
    let file = write_dictionary(&[
        "ehr\tlookups\tdescription\ttext\tINCLUDE_SCRUBBED\tlookups\tdescription\ttext\tfalse\t\tfalse\t",
    ]);

    let err = Dictionary::load(file.path(), '\t').unwrap_err();
    assert!(matches!(err, DictionaryError::ScrubbedSystemTable { .. }));
}

#[test]
fn test_unknown_decision_fatal() {
    let file = write_dictionary(&[
        "ehr\tpatients\tforename\ttext\tREDACT\tpatients\tforename\ttext\tfalse\t\tfalse\t",
    ]);

    let err = Dictionary::load(file.path(), '\t').unwrap_err();
    assert!(matches!(err, DictionaryError::UnknownDecision { .. }));
}

#[test]
fn test_duplicate_destination_fatal() {
    let file = write_dictionary(&[
        "ehr\tpatients\tforename\ttext\tINCLUDE_VERBATIM\tpatients\tname\ttext\tfalse\t\tfalse\t",
        "ehr\tpatients\tsurname\ttext\tINCLUDE_VERBATIM\tpatients\tname\ttext\tfalse\t\tfalse\t",
    ]);

    let err = Dictionary::load(file.path(), '\t').unwrap_err();
    assert!(matches!(err, DictionaryError::DuplicateDestination { .. }));
}

#[test]
fn test_missing_file_fatal() {
    let err = Dictionary::load("/no/such/dictionary.tsv", '\t').unwrap_err();
    assert!(matches!(err, DictionaryError::FileUnreadable { .. }));
}
