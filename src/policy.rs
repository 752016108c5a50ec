//
// policy.rs
// Dicom-Anonymizer-rs
//
// Static tag policy: which attributes get rewritten and how, resolved through an ordered rule table.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt;

use dicom::core::Tag;

use crate::config::ReplacementMode;

/// Attributes considered for rewriting, in processing order.
pub const ATTRIBUTES: &[(&str, Tag)] = &[
    // Patient identification
    ("PatientName", Tag(0x0010, 0x0010)),
    ("PatientID", Tag(0x0010, 0x0020)),
    ("PatientBirthDate", Tag(0x0010, 0x0030)),
    ("PatientSex", Tag(0x0010, 0x0040)),
    ("PatientAge", Tag(0x0010, 0x1010)),
    ("PatientAddress", Tag(0x0010, 0x1040)),
    ("PatientMotherBirthName", Tag(0x0010, 0x1060)),
    ("PatientTelephoneNumbers", Tag(0x0010, 0x2154)),
    // Institution and physicians
    ("InstitutionName", Tag(0x0008, 0x0080)),
    ("InstitutionAddress", Tag(0x0008, 0x0081)),
    ("ReferringPhysicianName", Tag(0x0008, 0x0090)),
    ("PerformingPhysicianName", Tag(0x0008, 0x1050)),
    ("OperatorsName", Tag(0x0008, 0x1070)),
    ("PhysiciansOfRecord", Tag(0x0008, 0x1048)),
    // Descriptions and comments
    ("StudyDescription", Tag(0x0008, 0x1030)),
    ("SeriesDescription", Tag(0x0008, 0x103E)),
    ("StudyComments", Tag(0x0032, 0x4000)),
    ("ImageComments", Tag(0x0020, 0x4000)),
    // Dates and times
    ("StudyDate", Tag(0x0008, 0x0020)),
    ("SeriesDate", Tag(0x0008, 0x0021)),
    ("AcquisitionDate", Tag(0x0008, 0x0022)),
    ("ContentDate", Tag(0x0008, 0x0023)),
    ("StudyTime", Tag(0x0008, 0x0030)),
    ("SeriesTime", Tag(0x0008, 0x0031)),
    ("AcquisitionTime", Tag(0x0008, 0x0032)),
    ("ContentTime", Tag(0x0008, 0x0033)),
];

pub const EMPTY_ATTRIBUTES: &[&str] = &[
    "PatientAddress",
    "PatientTelephoneNumbers",
    "InstitutionAddress",
    "StudyComments",
    "ImageComments",
    "PatientMotherBirthName",
];

pub const IDENTITY_ATTRIBUTES: &[&str] = &["PatientName", "PatientID"];

/// Attributes with a predetermined replacement, keyed by the kind of value they hold.
pub const VALUE_ATTRIBUTES: &[(&str, ValueKind)] = &[
    ("PatientBirthDate", ValueKind::BirthDate),
    ("PatientSex", ValueKind::Sex),
    ("PatientAge", ValueKind::Age),
    ("StudyDate", ValueKind::Date),
    ("SeriesDate", ValueKind::Date),
    ("AcquisitionDate", ValueKind::Date),
    ("ContentDate", ValueKind::Date),
    ("StudyTime", ValueKind::Time),
    ("SeriesTime", ValueKind::Time),
    ("AcquisitionTime", ValueKind::Time),
    ("ContentTime", ValueKind::Time),
];

pub const ANONYMIZED: &str = "ANONYMIZED";

const DESCRIPTIVE_MARKERS: &[&str] = &["Description", "Name"];

pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    BirthDate,
    Date,
    Time,
    Sex,
    Age,
}

impl ValueKind {
    /// Constant used in fixed mode.
    pub fn fixed_value(self) -> &'static str {
        match self {
            ValueKind::BirthDate => "19000101",
            ValueKind::Date => "20000101",
            ValueKind::Time => "120000",
            ValueKind::Sex => "O",
            ValueKind::Age => "000Y",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Empty,
    SuppliedIdentifier,
    Fixed(&'static str),
    Generated(ValueKind),
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Empty => write!(f, "empty"),
            Rule::SuppliedIdentifier => write!(f, "identifier"),
            Rule::Fixed(value) => write!(f, "fixed \"{}\"", value),
            Rule::Generated(kind) => write!(f, "generated {:?}", kind),
        }
    }
}

type Resolver = fn(&str, ReplacementMode) -> Option<Rule>;

fn empty_rule(name: &str, _mode: ReplacementMode) -> Option<Rule> {
    EMPTY_ATTRIBUTES.contains(&name).then_some(Rule::Empty)
}

fn identity_rule(name: &str, _mode: ReplacementMode) -> Option<Rule> {
    IDENTITY_ATTRIBUTES
        .contains(&name)
        .then_some(Rule::SuppliedIdentifier)
}

fn value_rule(name: &str, mode: ReplacementMode) -> Option<Rule> {
    let (_, kind) = VALUE_ATTRIBUTES.iter().find(|(n, _)| *n == name)?;
    Some(match mode {
        ReplacementMode::Fixed => Rule::Fixed(kind.fixed_value()),
        ReplacementMode::Randomized => Rule::Generated(*kind),
    })
}

fn descriptive_rule(name: &str, _mode: ReplacementMode) -> Option<Rule> {
    DESCRIPTIVE_MARKERS
        .iter()
        .any(|marker| name.contains(*marker))
        .then_some(Rule::Fixed(ANONYMIZED))
}

/// Resolution order: the first rule that matches wins; anything left falls back to the identifier.
pub const RESOLUTION_RULES: &[(&str, Resolver)] = &[
    ("empty", empty_rule),
    ("identity", identity_rule),
    ("predetermined value", value_rule),
    ("descriptive name", descriptive_rule),
];

pub fn resolve(name: &str, mode: ReplacementMode) -> Rule {
    RESOLUTION_RULES
        .iter()
        .find_map(|(_, resolver)| resolver(name, mode))
        .unwrap_or(Rule::SuppliedIdentifier)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    pub name: &'static str,
    pub tag: Tag,
    pub rule: Rule,
}

/// Immutable, fully resolved policy built once per run.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    mode: ReplacementMode,
    entries: Vec<PolicyEntry>,
}

impl PolicyTable {
    pub fn new(mode: ReplacementMode) -> Self {
        let entries = ATTRIBUTES
            .iter()
            .map(|&(name, tag)| PolicyEntry {
                name,
                tag,
                rule: resolve(name, mode),
            })
            .collect();
        Self { mode, entries }
    }

    pub fn mode(&self) -> ReplacementMode {
        self.mode
    }

    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&PolicyEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
