//
// testing.rs
// Dicom-Anonymizer-rs
//
// In-memory record and text codec used by unit tests to exercise failure paths without real DICOM files.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dicom::core::{Tag, VR};

use crate::dicom_access::{AttributeAccess, DicomCodec};
use crate::error::{AttributeError, FileError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapRecord {
    values: BTreeMap<Tag, String>,
    // present but refuses assignment, like a sequence element
    locked: BTreeSet<Tag>,
}

impl MapRecord {
    pub fn with(mut self, tag: Tag, value: &str) -> Self {
        self.values.insert(tag, value.to_string());
        self
    }

    pub fn locked(mut self, tag: Tag, value: &str) -> Self {
        self.locked.insert(tag);
        self.with(tag, value)
    }

    pub fn get(&self, tag: Tag) -> Option<&str> {
        self.values.get(&tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// One `GGGG,EEEE=value` line per attribute; locked ones are prefixed with `!`.
    pub fn to_text(&self) -> String {
        self.values
            .iter()
            .map(|(tag, value)| {
                let lock = if self.locked.contains(tag) { "!" } else { "" };
                format!("{}{:04X},{:04X}={}\n", lock, tag.group(), tag.element(), value)
            })
            .collect()
    }

    pub fn from_text(text: &str) -> Result<Self, String> {
        let mut record = MapRecord::default();
        for line in text.lines().filter(|l| !l.is_empty()) {
            let (key, value) = line.split_once('=').ok_or_else(|| format!("bad line: {line}"))?;
            let (locked, key) = match key.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, key),
            };
            let (group, element) = key.split_once(',').ok_or_else(|| format!("bad tag: {key}"))?;
            let parse = |s: &str| u16::from_str_radix(s, 16).map_err(|e| e.to_string());
            let tag = Tag(parse(group)?, parse(element)?);
            record = if locked {
                record.locked(tag, value)
            } else {
                record.with(tag, value)
            };
        }
        Ok(record)
    }
}

impl AttributeAccess for MapRecord {
    fn has_attribute(&self, tag: Tag) -> bool {
        self.values.contains_key(&tag)
    }

    fn attribute_str(&self, tag: Tag) -> Option<String> {
        self.values.get(&tag).cloned()
    }

    fn set_attribute(&mut self, tag: Tag, value: &str) -> Result<(), AttributeError> {
        if self.locked.contains(&tag) {
            return Err(AttributeError::IncompatibleVr { tag, vr: VR::SQ });
        }
        match self.values.get_mut(&tag) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(AttributeError::Missing { tag }),
        }
    }

    fn clear_attribute(&mut self, tag: Tag) -> Result<(), AttributeError> {
        self.set_attribute(tag, "")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum WriteBehavior {
    #[default]
    Normal,
    Fail,
    // writes bytes that no longer parse
    Corrupt,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCodec {
    writes: WriteBehavior,
    // raised after every successful write
    raise_after_write: Option<Arc<AtomicBool>>,
}

impl MemoryCodec {
    pub fn failing_writes() -> Self {
        Self {
            writes: WriteBehavior::Fail,
            ..Self::default()
        }
    }

    pub fn corrupting_writes() -> Self {
        Self {
            writes: WriteBehavior::Corrupt,
            ..Self::default()
        }
    }

    pub fn raising_after_write(flag: Arc<AtomicBool>) -> Self {
        Self {
            raise_after_write: Some(flag),
            ..Self::default()
        }
    }
}

impl DicomCodec for MemoryCodec {
    type Record = MapRecord;

    fn read(&self, path: &Path) -> Result<MapRecord, FileError> {
        let text = fs::read_to_string(path).map_err(|e| FileError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        MapRecord::from_text(&text).map_err(|message| FileError::Read {
            path: path.to_path_buf(),
            message,
        })
    }

    fn write(&self, record: &MapRecord, path: &Path) -> Result<(), FileError> {
        let text = match self.writes {
            WriteBehavior::Fail => {
                return Err(FileError::Write {
                    path: path.to_path_buf(),
                    message: "read-only medium".to_string(),
                })
            }
            WriteBehavior::Corrupt => "truncated".to_string(),
            WriteBehavior::Normal => record.to_text(),
        };
        fs::write(path, text).map_err(|e| FileError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(flag) = &self.raise_after_write {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}
