use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// One line of the output table. Field order is the column order on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRecord {
    pub legislation_id: String,
    pub legislation_term: String,
    pub legislation_term_definition: String,
}

pub fn checkpoint_path(dir: &Path, processed: usize) -> PathBuf {
    dir.join(format!("definitions_intermediate_{processed}.csv"))
}

/// Writes `records` as UTF-8 CSV with a header row, replacing any existing file.
pub fn write_records(path: &Path, records: &[DefinitionRecord]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AppError::write(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| AppError::csv(path, e))?;
    if records.is_empty() {
        // serialize() emits the header lazily; an empty run still gets one.
        writer
            .write_record(["legislation_id", "legislation_term", "legislation_term_definition"])
            .map_err(|e| AppError::csv(path, e))?;
    }
    for record in records {
        writer.serialize(record).map_err(|e| AppError::csv(path, e))?;
    }
    writer.flush().map_err(|e| AppError::write(path, e))
}

#[cfg(test)]
pub fn read_records(path: &Path) -> Result<Vec<DefinitionRecord>, AppError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| AppError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<DefinitionRecord>, _>>()
        .map_err(|e| AppError::csv(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, term: &str, definition: &str) -> DefinitionRecord {
        DefinitionRecord {
            legislation_id: id.to_string(),
            legislation_term: term.to_string(),
            legislation_term_definition: definition.to_string(),
        }
    }

    #[test]
    fn test_write_then_read_preserves_triples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let records = vec![
            record(
                "ERA 1996 s.230",
                "employee",
                "An individual who has entered into a contract of employment.\n\nSee also \"worker\", s.230(3).",
            ),
            record("Code civil art. 1231", "défaut", "Inexécution, retard; \"mise en demeure\""),
        ];

        write_records(&path, &records).unwrap();

        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn test_header_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_records(&path, &[record("id", "term", "def")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next(),
            Some("legislation_id,legislation_term,legislation_term_definition")
        );
    }

    #[test]
    fn test_empty_output_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_records(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), "legislation_id,legislation_term,legislation_term_definition");
        assert!(read_records(&path).unwrap().is_empty());
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.csv");
        write_records(&path, &[record("id", "term", "def")]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_checkpoint_path_encodes_count() {
        assert_eq!(
            checkpoint_path(Path::new("ckpt"), 20),
            PathBuf::from("ckpt").join("definitions_intermediate_20.csv")
        );
    }
}
