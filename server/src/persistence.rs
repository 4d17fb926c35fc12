// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Outcome of reading one data file.
#[derive(Debug, PartialEq)]
pub enum Loaded<T> {
    Found(T),
    Missing,
    Corrupt,
}

impl<T: Default> Loaded<T> {
    pub fn into_value(self) -> T {
        match self {
            Loaded::Found(value) => value,
            Loaded::Missing | Loaded::Corrupt => T::default(),
        }
    }
}

/// Reads and decodes a JSON data file.
///
/// A file that cannot be read or decoded is reported as `Corrupt` and left
/// untouched on disk; the next successful save overwrites it.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Loaded<T> {
    if !path.exists() {
        info!("Data file {} not found.", path.display());
        return Loaded::Missing;
    }

    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Could not read {}: {}. Using defaults.", path.display(), e);
            return Loaded::Corrupt;
        }
    };

    match serde_json::from_str(&data) {
        Ok(value) => {
            debug!("Loaded {}", path.display());
            Loaded::Found(value)
        }
        Err(e) => {
            warn!("Error loading {}: {}. Using defaults.", path.display(), e);
            Loaded::Corrupt
        }
    }
}

/// A collection file decoded record by record.
///
/// Entries that do not decode are kept as raw JSON in `unreadable` so they can
/// be written back unchanged after the readable records.
#[derive(Debug, PartialEq)]
pub struct Records<T> {
    pub records: Vec<T>,
    pub unreadable: Vec<Value>,
}

impl<T> Default for Records<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            unreadable: Vec::new(),
        }
    }
}

/// Reads a JSON array and decodes each element on its own.
///
/// One bad element does not discard the rest of the collection. A file whose
/// top level is not an array is `Corrupt`.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Loaded<Records<T>> {
    let values: Vec<Value> = match load_json(path) {
        Loaded::Found(values) => values,
        Loaded::Missing => return Loaded::Missing,
        Loaded::Corrupt => return Loaded::Corrupt,
    };

    let mut loaded = Records::default();
    for (index, value) in values.into_iter().enumerate() {
        match T::deserialize(&value) {
            Ok(record) => loaded.records.push(record),
            Err(e) => {
                warn!(
                    "Skipping entry {} of {}: {}. It is kept in the file as is.",
                    index,
                    path.display(),
                    e
                );
                loaded.unreadable.push(value);
            }
        }
    }
    Loaded::Found(loaded)
}

/// Writes `records` followed by the raw `unreadable` entries as one array.
pub fn save_records<T: Serialize>(path: &Path, records: &[T], unreadable: &[Value]) -> Result<()> {
    save_json(path, &Chained { records, unreadable })
}

struct Chained<'a, T> {
    records: &'a [T],
    unreadable: &'a [Value],
}

impl<T: Serialize> Serialize for Chained<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len() + self.unreadable.len()))?;
        for record in self.records {
            seq.serialize_element(record)?;
        }
        for value in self.unreadable {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

/// Writes `value` as 4-space indented JSON.
///
/// The data goes to a sibling `.tmp` file first and is then renamed over the
/// target, so a crash mid-write never leaves a truncated file behind.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent_dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent_dir)
            .with_context(|| format!("Failed to create directory {}", parent_dir.display()))?;
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .with_context(|| format!("Failed to encode {}", path.display()))?;

    let tmp = tmp_path(path);
    let mut file = fs::File::create(&tmp)
        .with_context(|| format!("Failed to create {}", tmp.display()))?;
    file.write_all(&buf)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync {}", tmp.display()))?;
    drop(file);

    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Appointment, Settings};
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let loaded: Loaded<Vec<String>> = load_json(&dir.path().join("nope.json"));
        assert_eq!(loaded, Loaded::Missing);
    }

    #[test]
    fn test_corrupt_file_falls_back_and_is_left_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded: Loaded<Settings> = load_json(&path);
        assert_eq!(loaded, Loaded::Corrupt);
        assert_eq!(loaded.into_value(), Settings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_writes_indented_json_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("values.json");

        save_json(&path, &vec!["a", "b"]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[\n    \"a\",\n    \"b\"\n]");
        assert!(!tmp_path(&path).exists());

        let loaded: Loaded<Vec<String>> = load_json(&path);
        assert_eq!(loaded, Loaded::Found(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_bad_record_is_skipped_and_written_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appointments.json");
        fs::write(
            &path,
            r#"[
                {"id": "a1", "date": "2025-03-04", "slot_number": "09:00"},
                {"id": "a2", "date": "not a date", "slot_number": "09:30"},
                {"date": "2025-03-05", "slot_number": "10:00"}
            ]"#,
        )
        .unwrap();

        let loaded: Records<Appointment> = match load_records(&path) {
            Loaded::Found(loaded) => loaded,
            other => panic!("unexpected load result: {:?}", other),
        };
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].id, "a1");
        assert_eq!(loaded.records[1].id, "");
        assert_eq!(loaded.unreadable.len(), 1);
        assert_eq!(loaded.unreadable[0]["id"], "a2");

        save_records(&path, &loaded.records[..1], &loaded.unreadable).unwrap();
        let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["id"], "a1");
        assert_eq!(written[1]["date"], "not a date");
    }

    #[test]
    fn test_non_array_collection_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clients.json");
        fs::write(&path, r#"{"id": "c1"}"#).unwrap();

        let loaded: Loaded<Records<Appointment>> = load_records(&path);
        assert_eq!(loaded, Loaded::Corrupt);
    }

    #[test]
    fn test_save_into_missing_directory_path_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let result = save_json(&blocker.join("values.json"), &vec!["a"]);
        assert!(result.is_err());
    }
}
