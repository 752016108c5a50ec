//
// walker.rs
// Dicom-Anonymizer-rs
//
// Walks an input tree, anonymizes DICOM-like files into a mirrored (or the same) tree and copies everything else.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs::{self, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::anonymize::Rewriter;
use crate::dicom_access::DicomCodec;
use crate::error::{FileError, WalkError};
use crate::report::AuditLog;
use crate::stats::RunStats;

/// Extensions (case-insensitive) that mark a file as DICOM.
pub const DICOM_EXTENSIONS: &[&str] = &["dcm", "dicom"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    DicomLike,
    Opaque,
}

/// Where rewritten files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// `output_root` + path relative to the input root.
    Mirror(PathBuf),
    /// Overwrite the source; opaque files are left alone.
    InPlace,
}

/// DICOM-like: a known extension, or no `.` anywhere in the name.
pub fn classify(path: &Path) -> FileKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if !name.contains('.') {
        return FileKind::DicomLike;
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if DICOM_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)) => {
            FileKind::DicomLike
        }
        _ => FileKind::Opaque,
    }
}

/// Path of `path` below `root`; a root that is itself a file maps to its own name.
pub fn relative_path(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
    }
}

/// Byte-for-byte copy that also carries over permissions and access/modification times.
pub fn copy_preserving(from: &Path, to: &Path) -> Result<(), FileError> {
    let copy_err = |source| FileError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if same_file(from, to) {
        return Err(copy_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "source and destination are the same file",
        )));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(copy_err)?;
    }

    let metadata = fs::metadata(from).map_err(copy_err)?;
    let mut source = fs::File::open(from).map_err(copy_err)?;
    let mut target = fs::File::create(to).map_err(copy_err)?;
    io::copy(&mut source, &mut target).map_err(copy_err)?;

    // Times are set through the writable handle, before a read-only mode is applied.
    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    target.set_times(times).map_err(copy_err)?;
    drop(target);

    fs::set_permissions(to, metadata.permissions()).map_err(copy_err)?;
    Ok(())
}

/// Both paths exist and resolve to the same location.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub struct Walker<C: DicomCodec> {
    rewriter: Rewriter<C>,
    audit: Option<AuditLog>,
}

impl<C: DicomCodec> Walker<C> {
    pub fn new(rewriter: Rewriter<C>) -> Self {
        Self {
            rewriter,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Process every file under `input_root`. Only a missing root or an interrupt end the run
    /// early; per-file problems are counted in the returned stats.
    pub fn walk(
        &mut self,
        input_root: &Path,
        output: &OutputTarget,
        cancel: &AtomicBool,
    ) -> Result<RunStats, WalkError> {
        if !input_root.exists() {
            error!(input = %input_root.display(), "Input directory does not exist");
            return Err(WalkError::InputMissing(input_root.to_path_buf()));
        }

        if let OutputTarget::Mirror(root) = output {
            if same_file(input_root, root) {
                error!(output = %root.display(), "Output directory is the input directory");
                return Err(WalkError::OutputIsInput(root.clone()));
            }
            fs::create_dir_all(root).map_err(|source| WalkError::OutputRoot {
                path: root.clone(),
                source,
            })?;
        }

        info!(
            input = %input_root.display(),
            output = %describe(output),
            mode = ?self.rewriter.policy().mode(),
            "Starting anonymization"
        );

        // Enumerate up front so files written during the run (outputs, backups) are never revisited.
        // Symlinked files and directories are followed, so their targets are processed too.
        let files: Vec<PathBuf> = WalkDir::new(input_root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        debug!(count = files.len(), "Files found");

        let mut stats = RunStats::new();
        for path in files {
            if cancel.load(Ordering::SeqCst) {
                warn!(processed = stats.total_files, "Anonymization interrupted by user");
                self.flush_audit();
                return Err(WalkError::Interrupted { stats });
            }

            stats.record_visit();
            let relative = relative_path(input_root, &path);

            match classify(&path) {
                FileKind::DicomLike => {
                    let destination = match output {
                        OutputTarget::Mirror(root) => root.join(&relative),
                        OutputTarget::InPlace => path.clone(),
                    };
                    self.anonymize_one(&path, &destination, &relative, &mut stats);
                }
                FileKind::Opaque => match output {
                    OutputTarget::Mirror(root) => {
                        match copy_preserving(&path, &root.join(&relative)) {
                            Ok(()) => {
                                stats.record_copy();
                                debug!(file = %relative.display(), "Copied");
                            }
                            Err(e) => {
                                stats.record_failure();
                                warn!(file = %relative.display(), error = %e, "Copy failed");
                            }
                        }
                    }
                    OutputTarget::InPlace => {
                        stats.record_copy();
                        debug!(file = %relative.display(), "Left untouched");
                    }
                },
            }
        }

        self.flush_audit();
        info!(
            total = stats.total_files,
            anonymized = stats.anonymized,
            failed = stats.failed,
            copied = stats.copied_non_dicom,
            "Anonymization finished"
        );
        Ok(stats)
    }

    fn anonymize_one(&mut self, source: &Path, destination: &Path, relative: &Path, stats: &mut RunStats) {
        match self.rewriter.rewrite_file(source, destination) {
            Ok(outcome) => {
                stats.record_anonymized();
                debug!(file = %relative.display(), "Anonymized");
                if let Some(audit) = self.audit.as_mut() {
                    if let Err(e) = audit.record_success(source, &outcome) {
                        warn!(error = %e, "Could not write audit row");
                    }
                }
            }
            Err(e) => {
                stats.record_failure();
                warn!(file = %relative.display(), error = %e, "Failed");
                if let Some(audit) = self.audit.as_mut() {
                    if let Err(e) = audit.record_failure(source, &e) {
                        warn!(error = %e, "Could not write audit row");
                    }
                }
            }
        }
    }

    fn flush_audit(&mut self) {
        if let Some(audit) = self.audit.as_mut() {
            if let Err(e) = audit.flush() {
                warn!(error = %e, "Could not flush audit report");
            }
        }
    }
}

fn describe(output: &OutputTarget) -> String {
    match output {
        OutputTarget::Mirror(root) => root.display().to_string(),
        OutputTarget::InPlace => "in place".to_string(),
    }
}
