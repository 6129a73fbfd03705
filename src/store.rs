//! Record persistence for analysed studies.
//!
//! Stores are plain values handed to whoever needs them. Callers that must
//! not fail use [`save_or_placeholder`] and [`history_or_empty`], which log
//! the store error and carry on with a locally made-up result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::report::{DermAnalysis, RadiologyAnalysis};

/// Tables that hold per-patient clinical records.
pub const CLINICAL_TABLES: [&str; 3] = ["radiology", "dermatology", "clinical_note"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store at {path} is unavailable: {source}")]
    Unavailable { path: PathBuf, source: io::Error },

    #[error("Invalid table name `{0}`")]
    InvalidTable(String),

    #[error("Field `{0}` is assigned by the store")]
    ReservedField(String),

    #[error("Table `{table}` is corrupt: {source}")]
    Corrupt {
        table: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

pub trait RecordStore {
    /// Insert a record and return it with its assigned id.
    fn create(&mut self, table: &str, fields: Map<String, Value>) -> Result<Record, StoreError>;

    /// All records in `table` whose `field` equals `value`.
    fn select(&mut self, table: &str, field: &str, value: &Value)
    -> Result<Vec<Record>, StoreError>;
}

fn check_table(table: &str) -> Result<(), StoreError> {
    let valid = !table.is_empty()
        && table
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

/// Keys the store writes itself and callers may not supply.
const RESERVED_FIELDS: [&str; 1] = ["id"];

fn check_fields(fields: &Map<String, Value>) -> Result<(), StoreError> {
    match RESERVED_FIELDS.iter().find(|key| fields.contains_key(**key)) {
        Some(key) => Err(StoreError::ReservedField(key.to_string())),
        None => Ok(()),
    }
}

fn matching(records: &[Record], field: &str, value: &Value) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.fields.get(field) == Some(value))
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn create(&mut self, table: &str, fields: Map<String, Value>) -> Result<Record, StoreError> {
        check_table(table)?;
        check_fields(&fields)?;
        let records = self.tables.entry(table.to_string()).or_default();
        let record = Record {
            id: format!("{table}:{}", records.len() + 1),
            fields,
        };
        records.push(record.clone());
        Ok(record)
    }

    fn select(
        &mut self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        check_table(table)?;
        Ok(self
            .tables
            .get(table)
            .map(|records| matching(records, field, value))
            .unwrap_or_default())
    }
}

/// One JSON array file per table under a directory.
///
/// Reads never touch the filesystem beyond the table file, so a missing
/// directory is an empty store. The directory is created on the first write.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    connected: bool,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            connected: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn connect(&mut self) -> Result<(), StoreError> {
        if self.connected {
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Unavailable {
            path: self.root.clone(),
            source,
        })?;
        log::debug!("record store opened at {}", self.root.display());
        self.connected = true;
        Ok(())
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.json"))
    }

    fn read_table(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        check_table(table)?;
        let content = match fs::read_to_string(self.table_path(table)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            table: table.to_string(),
            source,
        })
    }
}

impl RecordStore for FileStore {
    fn create(&mut self, table: &str, fields: Map<String, Value>) -> Result<Record, StoreError> {
        check_fields(&fields)?;
        check_table(table)?;
        self.connect()?;
        let mut records = self.read_table(table)?;
        let record = Record {
            id: format!("{table}:{}", records.len() + 1),
            fields,
        };
        records.push(record.clone());
        let content = serde_json::to_string_pretty(&records).map_err(|source| {
            StoreError::Corrupt {
                table: table.to_string(),
                source,
            }
        })?;
        fs::write(self.table_path(table), content)?;
        Ok(record)
    }

    fn select(
        &mut self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        let records = self.read_table(table)?;
        Ok(matching(&records, field, value))
    }
}

/// Persist a record, or fabricate one if the store fails.
///
/// The placeholder carries the submitted fields under the id `<table>:next_id`.
pub fn save_or_placeholder<S: RecordStore + ?Sized>(
    store: &mut S,
    table: &str,
    fields: Map<String, Value>,
) -> Record {
    match store.create(table, fields.clone()) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("could not persist to {table}, using placeholder record: {e}");
            Record {
                id: format!("{table}:next_id"),
                fields,
            }
        }
    }
}

/// Every clinical record for a patient, or nothing if the store fails.
pub fn history_or_empty<S: RecordStore + ?Sized>(store: &mut S, patient_id: &str) -> Vec<Record> {
    let patient = Value::String(patient_id.to_string());
    let mut history = Vec::new();
    for table in CLINICAL_TABLES {
        match store.select(table, "patient", &patient) {
            Ok(records) => history.extend(records),
            Err(e) => {
                log::warn!("could not load history for {patient_id}: {e}");
                return Vec::new();
            }
        }
    }
    history
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn into_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Record fields for an analysed radiology upload.
pub fn radiology_study(patient_id: &str, analysis: &RadiologyAnalysis) -> Map<String, Value> {
    into_fields(json!({
        "study_id": format!("RAD-{}", timestamp_millis()),
        "patient": patient_id,
        "modality": "XR",
        "body_part": "Chest",
        "report": analysis.report_text(),
        "layman_report": analysis.layman_summary,
        "tags": analysis.tags,
    }))
}

/// Record fields for a dermatology triage.
pub fn derm_case(
    patient_id: &str,
    symptoms: &[String],
    duration: &str,
    analysis: &DermAnalysis,
) -> Map<String, Value> {
    into_fields(json!({
        "case_id": format!("DERM-{}", timestamp_millis()),
        "patient": patient_id,
        "symptoms": symptoms,
        "duration": duration,
        "assessment": analysis.assessment,
        "risk_tier": analysis.risk(),
        "next_steps": analysis.next_steps,
        "report": analysis.report_text(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(value: Value) -> Map<String, Value> {
        into_fields(value)
    }

    /// A store whose backend is always down.
    struct DownStore;

    impl RecordStore for DownStore {
        fn create(&mut self, _: &str, _: Map<String, Value>) -> Result<Record, StoreError> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "down").into())
        }

        fn select(&mut self, _: &str, _: &str, _: &Value) -> Result<Vec<Record>, StoreError> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "down").into())
        }
    }

    #[test]
    fn memory_store_assigns_ids_and_filters() {
        let mut store = MemoryStore::new();
        let a = store
            .create("radiology", fields(json!({"patient": "P123"})))
            .unwrap();
        store
            .create("radiology", fields(json!({"patient": "P999"})))
            .unwrap();
        assert_eq!(a.id, "radiology:1");

        let found = store
            .select("radiology", "patient", &json!("P123"))
            .unwrap();
        assert_eq!(found, vec![a]);
        assert!(store.select("dermatology", "patient", &json!("P123")).unwrap().is_empty());
    }

    #[test]
    fn table_names_are_checked() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.create("../etc", Map::new()),
            Err(StoreError::InvalidTable(_))
        ));
    }

    #[test]
    fn placeholder_on_failure() {
        let record = save_or_placeholder(&mut DownStore, "radiology", fields(json!({"x": 1})));
        assert_eq!(record.id, "radiology:next_id");
        assert_eq!(record.fields["x"], 1);
    }

    #[test]
    fn saved_record_on_success() {
        let mut store = MemoryStore::new();
        let record = save_or_placeholder(&mut store, "dermatology", Map::new());
        assert_eq!(record.id, "dermatology:1");
    }

    #[test]
    fn history_gathers_tables_or_falls_back() {
        let mut store = MemoryStore::new();
        store.create("radiology", fields(json!({"patient": "P123"}))).unwrap();
        store.create("clinical_note", fields(json!({"patient": "P123"}))).unwrap();
        store.create("clinical_note", fields(json!({"patient": "P1"}))).unwrap();
        assert_eq!(history_or_empty(&mut store, "P123").len(), 2);
        assert!(history_or_empty(&mut DownStore, "P123").is_empty());
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("records");

        let mut store = FileStore::new(&root);
        let saved = store
            .create("radiology", fields(json!({"patient": "P123", "report": "# Ok"})))
            .unwrap();
        assert_eq!(saved.id, "radiology:1");
        assert!(root.join("radiology.json").exists());

        let mut reopened = FileStore::new(&root);
        let found = reopened
            .select("radiology", "patient", &json!("P123"))
            .unwrap();
        assert_eq!(found, vec![saved]);
    }

    #[test]
    fn file_store_unavailable_when_root_is_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut store = FileStore::new(file.path().join("nested"));
        assert!(matches!(
            store.create("radiology", Map::new()),
            Err(StoreError::Unavailable { .. })
        ));
    }

    #[test]
    fn caller_ids_are_rejected() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.create("radiology", fields(json!({"id": "RAD-1", "patient": "P123"}))),
            Err(StoreError::ReservedField(key)) if key == "id"
        ));
        assert!(store.select("radiology", "patient", &json!("P123")).unwrap().is_empty());

        let record = save_or_placeholder(&mut store, "radiology", fields(json!({"id": "RAD-1"})));
        assert_eq!(record.id, "radiology:next_id");
    }

    #[test]
    fn file_table_stays_readable_after_a_caller_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        let first = store
            .create("radiology", fields(json!({"patient": "P123"})))
            .unwrap();
        assert!(matches!(
            store.create("radiology", fields(json!({"id": "RAD-1", "patient": "P123"}))),
            Err(StoreError::ReservedField(_))
        ));

        let second = store
            .create("radiology", fields(json!({"patient": "P123"})))
            .unwrap();
        assert_eq!(second.id, "radiology:2");
        assert_eq!(history_or_empty(&mut store, "P123"), vec![first, second]);
    }

    #[test]
    fn reading_a_missing_root_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("typo");
        let mut store = FileStore::new(&root);
        assert!(store.select("radiology", "patient", &json!("P123")).unwrap().is_empty());
        assert!(history_or_empty(&mut store, "P123").is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn file_store_reports_corrupt_tables() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("radiology.json"), "not json").unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(matches!(
            store.select("radiology", "patient", &json!("P123")),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn radiology_study_fields() {
        let analysis = RadiologyAnalysis {
            indication: String::new(),
            findings: "Clear.".to_string(),
            impression: "Normal.".to_string(),
            follow_up: String::new(),
            tags: vec!["XR".to_string()],
            layman_summary: "Fine.".to_string(),
        };
        let study = radiology_study("P123", &analysis);
        assert_eq!(study["patient"], "P123");
        assert_eq!(study["modality"], "XR");
        assert!(study["study_id"].as_str().unwrap().starts_with("RAD-"));
        assert_eq!(study["report"], analysis.report_text());
    }
}
