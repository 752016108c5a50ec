//
// anonymize.rs
// Dicom-Anonymizer-rs
//
// Record rewriter: applies the tag policy to one record, then persists it (optionally backing up the original).
//
// Thales Matheus Mendonça Santos - November 2025

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::AnonymizerConfig;
use crate::dicom_access::{AttributeAccess, DicomCodec};
use crate::error::FileError;
use crate::generator::ValueGenerator;
use crate::policy::{PolicyTable, Rule, PATIENT_ID, PATIENT_NAME};

/// What happened to the attributes of one record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub rewritten: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

/// Result of a successfully persisted file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub destination: PathBuf,
    pub original_patient_id: Option<String>,
    pub original_patient_name: Option<String>,
    pub new_identifier: String,
    pub attributes: RewriteOutcome,
}

/// Rewrite every policy attribute present in `record`. Absent attributes are skipped and a
/// failed assignment is logged without stopping the remaining ones.
pub fn rewrite_record<R: AttributeAccess>(
    record: &mut R,
    policy: &PolicyTable,
    identifier: &str,
    generator: &mut ValueGenerator,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();

    for entry in policy.entries() {
        if !record.has_attribute(entry.tag) {
            continue;
        }

        let result = match entry.rule {
            Rule::Empty => record.clear_attribute(entry.tag),
            Rule::SuppliedIdentifier => record.set_attribute(entry.tag, identifier),
            Rule::Fixed(value) => record.set_attribute(entry.tag, value),
            Rule::Generated(kind) => {
                let value = generator.value(kind);
                record.set_attribute(entry.tag, &value)
            }
        };

        match result {
            Ok(()) => outcome.rewritten.push(entry.name),
            Err(e) => {
                warn!(attribute = entry.name, error = %e, "Could not modify attribute");
                outcome.failed.push(entry.name);
            }
        }
    }

    outcome
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup");
    PathBuf::from(name)
}

/// Reads, rewrites and writes single files with one policy and one value generator.
pub struct Rewriter<C: DicomCodec> {
    codec: C,
    policy: PolicyTable,
    generator: ValueGenerator,
    supplied_identifier: String,
    backup: bool,
    validate: bool,
}

impl<C: DicomCodec> Rewriter<C> {
    pub fn new(codec: C, config: &AnonymizerConfig) -> Self {
        Self {
            codec,
            policy: PolicyTable::new(config.mode),
            generator: ValueGenerator::new(config.mode, config.id_prefix.clone(), config.seed),
            supplied_identifier: config.patient_id.clone(),
            backup: config.backup,
            validate: config.validate,
        }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Anonymize `source` into `destination` (which may be the same path).
    pub fn rewrite_file(&mut self, source: &Path, destination: &Path) -> Result<FileOutcome, FileError> {
        let mut record = self.codec.read(source)?;

        let original_patient_id = record.attribute_str(PATIENT_ID);
        let original_patient_name = record.attribute_str(PATIENT_NAME);
        let new_identifier = self
            .generator
            .identifier_for(original_patient_id.as_deref(), &self.supplied_identifier);

        let attributes = rewrite_record(&mut record, &self.policy, &new_identifier, &mut self.generator);

        if self.backup && source == destination {
            let backup = backup_path(source);
            fs::copy(source, &backup).map_err(|source| FileError::Backup {
                path: backup.clone(),
                source,
            })?;
            debug!(backup = %backup.display(), "Backup created");
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| FileError::Write {
                path: destination.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        self.codec.write(&record, destination)?;
        if self.validate {
            self.check_written(destination, &new_identifier, &attributes)?;
        }

        debug!(
            source = %source.display(),
            destination = %destination.display(),
            rewritten = attributes.rewritten.len(),
            failed = attributes.failed.len(),
            "Record rewritten"
        );

        Ok(FileOutcome {
            destination: destination.to_path_buf(),
            original_patient_id,
            original_patient_name,
            new_identifier,
            attributes,
        })
    }

    /// Re-read a written file. Only a PatientID this run rewrote is compared; attributes
    /// the source never had are not required.
    fn check_written(
        &self,
        destination: &Path,
        identifier: &str,
        attributes: &RewriteOutcome,
    ) -> Result<(), FileError> {
        let invalid = |message: String| FileError::Validation {
            path: destination.to_path_buf(),
            message,
        };
        let written = self.codec.read(destination).map_err(|e| invalid(e.to_string()))?;
        if attributes.rewritten.contains(&"PatientID") {
            match written.attribute_str(PATIENT_ID) {
                Some(id) if id == identifier => {}
                other => return Err(invalid(format!("PatientID reads back as {:?}", other))),
            }
        }
        debug!(file = %destination.display(), "Output validated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplacementMode;
    use crate::testing::{MapRecord, MemoryCodec};
    use dicom::core::Tag;
    use tempfile::tempdir;

    fn generator(mode: ReplacementMode) -> ValueGenerator {
        ValueGenerator::new(mode, "ANON", Some(3))
    }

    fn full_record() -> MapRecord {
        MapRecord::default()
            .with(Tag(0x0010, 0x0010), "Doe^Jane")
            .with(Tag(0x0010, 0x0020), "MRN-991")
            .with(Tag(0x0010, 0x0030), "19750314")
            .with(Tag(0x0010, 0x1040), "1 Main St")
            .with(Tag(0x0008, 0x0080), "General Hospital")
            .with(Tag(0x0008, 0x1048), "Dr^Who")
            .with(Tag(0x0008, 0x0020), "20240101")
            .with(Tag(0x0008, 0x0030), "081500")
            .with(Tag(0x0008, 0x0060), "CT")
    }

    #[test]
    fn fixed_mode_applies_documented_values() {
        let mut record = full_record();
        let policy = PolicyTable::new(ReplacementMode::Fixed);
        let outcome = rewrite_record(&mut record, &policy, "STUDY_7", &mut generator(ReplacementMode::Fixed));

        assert!(outcome.failed.is_empty());
        assert_eq!(record.get(Tag(0x0010, 0x0010)), Some("STUDY_7"));
        assert_eq!(record.get(Tag(0x0010, 0x0020)), Some("STUDY_7"));
        assert_eq!(record.get(Tag(0x0010, 0x0030)), Some("19000101"));
        assert_eq!(record.get(Tag(0x0010, 0x1040)), Some(""));
        assert_eq!(record.get(Tag(0x0008, 0x0080)), Some("ANONYMIZED"));
        assert_eq!(record.get(Tag(0x0008, 0x1048)), Some("STUDY_7"));
        assert_eq!(record.get(Tag(0x0008, 0x0020)), Some("20000101"));
        assert_eq!(record.get(Tag(0x0008, 0x0030)), Some("120000"));
        // Not in the policy.
        assert_eq!(record.get(Tag(0x0008, 0x0060)), Some("CT"));
    }

    #[test]
    fn absent_attributes_are_not_added() {
        let mut record = MapRecord::default().with(Tag(0x0010, 0x0010), "Doe^Jane");
        let policy = PolicyTable::new(ReplacementMode::Fixed);
        let outcome = rewrite_record(&mut record, &policy, "X", &mut generator(ReplacementMode::Fixed));

        assert_eq!(record.len(), 1);
        assert_eq!(outcome.rewritten, vec!["PatientName"]);
    }

    #[test]
    fn failing_attribute_does_not_stop_the_others() {
        let mut record = full_record().locked(Tag(0x0010, 0x0030), "19750314");
        let policy = PolicyTable::new(ReplacementMode::Fixed);
        let outcome = rewrite_record(&mut record, &policy, "X", &mut generator(ReplacementMode::Fixed));

        assert_eq!(outcome.failed, vec!["PatientBirthDate"]);
        assert_eq!(record.get(Tag(0x0010, 0x0030)), Some("19750314"));
        assert_eq!(record.get(Tag(0x0010, 0x0020)), Some("X"));
        assert_eq!(record.get(Tag(0x0008, 0x0030)), Some("120000"));
    }

    #[test]
    fn fixed_mode_is_idempotent() {
        let policy = PolicyTable::new(ReplacementMode::Fixed);
        let mut once = full_record();
        rewrite_record(&mut once, &policy, "X", &mut generator(ReplacementMode::Fixed));
        let mut twice = once.clone();
        rewrite_record(&mut twice, &policy, "X", &mut generator(ReplacementMode::Fixed));
        assert_eq!(once, twice);
    }

    #[test]
    fn rewrite_file_mirrors_into_missing_directories() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("in.dcm");
        fs::write(&source, full_record().to_text()).expect("write source");
        let destination = dir.path().join("out/a/b/in.dcm");

        let mut rewriter = Rewriter::new(MemoryCodec::default(), &AnonymizerConfig::default());
        let outcome = rewriter.rewrite_file(&source, &destination).expect("rewrite");

        assert_eq!(outcome.original_patient_id.as_deref(), Some("MRN-991"));
        assert_eq!(outcome.original_patient_name.as_deref(), Some("Doe^Jane"));
        assert_eq!(outcome.new_identifier, "ANON_PATIENT_001");
        let written = MapRecord::from_text(&fs::read_to_string(&destination).expect("read"))
            .expect("parse");
        assert_eq!(written.get(Tag(0x0010, 0x0020)), Some("ANON_PATIENT_001"));
        // Source untouched in mirror mode.
        assert_eq!(fs::read_to_string(&source).unwrap(), full_record().to_text());
    }

    #[test]
    fn in_place_with_backup_keeps_original_copy() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("IMG001");
        fs::write(&source, full_record().to_text()).expect("write source");

        let config = AnonymizerConfig {
            backup: true,
            ..AnonymizerConfig::default()
        };
        let mut rewriter = Rewriter::new(MemoryCodec::default(), &config);
        rewriter.rewrite_file(&source, &source).expect("rewrite");

        let backup = dir.path().join("IMG001.backup");
        assert_eq!(fs::read_to_string(&backup).unwrap(), full_record().to_text());
        let rewritten = MapRecord::from_text(&fs::read_to_string(&source).unwrap()).unwrap();
        assert_eq!(rewritten.get(Tag(0x0010, 0x0010)), Some("ANON_PATIENT_001"));
    }

    #[test]
    fn unreadable_and_unwritable_files_fail_whole_file() {
        let dir = tempdir().expect("tempdir");
        let broken = dir.path().join("broken.dcm");
        fs::write(&broken, "not a record").expect("write");
        let mut rewriter = Rewriter::new(MemoryCodec::default(), &AnonymizerConfig::default());
        let err = rewriter
            .rewrite_file(&broken, &dir.path().join("out.dcm"))
            .unwrap_err();
        assert!(matches!(err, FileError::Read { .. }));

        let good = dir.path().join("good.dcm");
        fs::write(&good, full_record().to_text()).expect("write");
        let mut rewriter = Rewriter::new(MemoryCodec::failing_writes(), &AnonymizerConfig::default());
        let err = rewriter.rewrite_file(&good, &dir.path().join("out.dcm")).unwrap_err();
        assert!(matches!(err, FileError::Write { .. }));
    }

    #[test]
    fn validation_rejects_output_that_does_not_read_back() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("in.dcm");
        fs::write(&source, full_record().to_text()).expect("write source");
        let config = AnonymizerConfig {
            validate: true,
            ..AnonymizerConfig::default()
        };

        let mut rewriter = Rewriter::new(MemoryCodec::corrupting_writes(), &config);
        let err = rewriter
            .rewrite_file(&source, &dir.path().join("out.dcm"))
            .unwrap_err();
        assert!(matches!(err, FileError::Validation { .. }));

        // Without validation the same write goes unnoticed.
        let mut rewriter = Rewriter::new(MemoryCodec::corrupting_writes(), &AnonymizerConfig::default());
        assert!(rewriter.rewrite_file(&source, &dir.path().join("out2.dcm")).is_ok());
    }

    #[test]
    fn validation_accepts_records_missing_optional_attributes() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("in.dcm");
        // No PatientID and no StudyInstanceUID.
        fs::write(&source, MapRecord::default().with(Tag(0x0008, 0x0060), "MR").to_text())
            .expect("write source");
        let config = AnonymizerConfig {
            validate: true,
            ..AnonymizerConfig::default()
        };

        let mut rewriter = Rewriter::new(MemoryCodec::default(), &config);
        let outcome = rewriter
            .rewrite_file(&source, &dir.path().join("out.dcm"))
            .expect("rewrite");
        assert!(outcome.attributes.rewritten.is_empty());
    }

    #[test]
    fn randomized_mode_assigns_synthetic_identifier() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("in.dcm");
        fs::write(&source, full_record().to_text()).expect("write source");
        let config = AnonymizerConfig {
            mode: ReplacementMode::Randomized,
            seed: Some(11),
            ..AnonymizerConfig::default()
        };
        let mut rewriter = Rewriter::new(MemoryCodec::default(), &config);
        let outcome = rewriter
            .rewrite_file(&source, &dir.path().join("out.dcm"))
            .expect("rewrite");

        assert!(outcome.new_identifier.starts_with("ANON_"));
        assert_ne!(outcome.new_identifier, "ANON_PATIENT_001");
        let written =
            MapRecord::from_text(&fs::read_to_string(dir.path().join("out.dcm")).unwrap()).unwrap();
        assert_eq!(written.get(Tag(0x0010, 0x0010)), Some(outcome.new_identifier.as_str()));
        let study_date = written.get(Tag(0x0008, 0x0020)).expect("study date");
        assert_eq!(study_date.len(), 8);
        assert!(study_date.chars().all(|c| c.is_ascii_digit()));
    }
}
