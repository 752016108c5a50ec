//
// generator.rs
// Dicom-Anonymizer-rs
//
// Produces replacement values: fixed constants, or plausible random dates/times/sex/age and synthetic identifiers.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ReplacementMode;
use crate::policy::ValueKind;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ID_SUFFIX_LEN: usize = 8;
const MIN_AGE_YEARS: i64 = 18;
const MAX_AGE_YEARS: i64 = 85;
const RECENT_DAYS: i64 = 5 * 365;

pub struct ValueGenerator {
    mode: ReplacementMode,
    today: NaiveDate,
    rng: StdRng,
    id_prefix: String,
    // original PatientID -> synthetic identifier
    assigned: HashMap<String, String>,
    issued: HashSet<String>,
}

impl ValueGenerator {
    pub fn new(mode: ReplacementMode, id_prefix: impl Into<String>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mode,
            today: Local::now().date_naive(),
            rng,
            id_prefix: id_prefix.into(),
            assigned: HashMap::new(),
            issued: HashSet::new(),
        }
    }

    /// Pin "today" so date arithmetic is deterministic.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn value(&mut self, kind: ValueKind) -> String {
        match self.mode {
            ReplacementMode::Fixed => kind.fixed_value().to_string(),
            ReplacementMode::Randomized => match kind {
                ValueKind::BirthDate => random_birth_date(&mut self.rng, self.today),
                ValueKind::Date => random_recent_date(&mut self.rng, self.today),
                ValueKind::Time => random_time(&mut self.rng),
                ValueKind::Sex => random_sex(&mut self.rng).to_string(),
                ValueKind::Age => random_age(&mut self.rng),
            },
        }
    }

    /// Identifier for a file whose original PatientID is `original`.
    ///
    /// Fixed mode always hands back `supplied`. Randomized mode allocates one synthetic
    /// identifier per distinct original and never issues the same one twice in a run.
    pub fn identifier_for(&mut self, original: Option<&str>, supplied: &str) -> String {
        if self.mode == ReplacementMode::Fixed {
            return supplied.to_string();
        }
        let key = original.unwrap_or_default().to_string();
        if let Some(existing) = self.assigned.get(&key) {
            return existing.clone();
        }
        let id = loop {
            let candidate = anonymous_id(&mut self.rng, &self.id_prefix, self.today);
            if self.issued.insert(candidate.clone()) {
                break candidate;
            }
        };
        self.assigned.insert(key, id.clone());
        id
    }
}

/// `{prefix}_{YYYYMMDD}_{8 chars of A-Z0-9}`.
pub fn anonymous_id<R: Rng>(rng: &mut R, prefix: &str, today: NaiveDate) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", prefix, today.format("%Y%m%d"), suffix)
}

pub fn random_birth_date<R: Rng>(rng: &mut R, today: NaiveDate) -> String {
    // Year lengths averaged to 365.25 days.
    let oldest = today - Duration::days(MAX_AGE_YEARS * 36525 / 100);
    let youngest = today - Duration::days(MIN_AGE_YEARS * 36525 / 100);
    let span = (youngest - oldest).num_days();
    let date = oldest + Duration::days(rng.gen_range(0..=span));
    date.format("%Y%m%d").to_string()
}

pub fn random_recent_date<R: Rng>(rng: &mut R, today: NaiveDate) -> String {
    let start = today - Duration::days(RECENT_DAYS);
    let date = start + Duration::days(rng.gen_range(0..=RECENT_DAYS));
    date.format("%Y%m%d").to_string()
}

pub fn random_time<R: Rng>(rng: &mut R) -> String {
    format!(
        "{:02}{:02}{:02}",
        rng.gen_range(0..24),
        rng.gen_range(0..60),
        rng.gen_range(0..60)
    )
}

pub fn random_sex<R: Rng>(rng: &mut R) -> &'static str {
    ["M", "F", "O"][rng.gen_range(0..3)]
}

/// Age strings are always four characters (`NNNY`).
pub fn random_age<R: Rng>(rng: &mut R) -> String {
    format!("{:03}Y", rng.gen_range(MIN_AGE_YEARS..=MAX_AGE_YEARS))
}
