//! Report record access
//!
//! The engine does not own report records. It reaches the current-artifact
//! pointer and status through [`ReportRegistry`], so the same coordinator
//! can run against an in-process map or a directory of pointer files.

use crate::error::GenerationError;
use chrono::{DateTime, Utc};
use dossier_model::{GeneratedArtifact, ReportId, ReportStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Generation state of one report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub status: ReportStatus,
    /// Artifact currently served for the report
    pub current: Option<GeneratedArtifact>,
    /// Cause of the last failed run
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Current-artifact pointer and status of reports
pub trait ReportRegistry: Send + Sync + fmt::Debug {
    /// Full record; a report never generated yields the default record
    ///
    /// # Errors
    /// Returns `GenerationError::StorageWriteFailure` if the record store is unreadable
    fn record(&self, report: &ReportId) -> Result<ReportRecord, GenerationError>;

    /// Point the report at `artifact` and mark it generated
    ///
    /// Returns the artifact it replaced, if any.
    ///
    /// # Errors
    /// Returns `GenerationError::StorageWriteFailure` if the record cannot be written
    fn supersede(
        &self,
        report: &ReportId,
        artifact: GeneratedArtifact,
    ) -> Result<Option<GeneratedArtifact>, GenerationError>;

    /// Mark the report failed, keeping any previous artifact
    ///
    /// # Errors
    /// Returns `GenerationError::StorageWriteFailure` if the record cannot be written
    fn mark_failed(&self, report: &ReportId, reason: &str) -> Result<(), GenerationError>;

    /// Artifact currently served for the report
    ///
    /// # Errors
    /// Same as [`ReportRegistry::record`]
    fn current_artifact(
        &self,
        report: &ReportId,
    ) -> Result<Option<GeneratedArtifact>, GenerationError> {
        Ok(self.record(report)?.current)
    }

    /// Generation status of the report
    ///
    /// # Errors
    /// Same as [`ReportRegistry::record`]
    fn status(&self, report: &ReportId) -> Result<ReportStatus, GenerationError> {
        Ok(self.record(report)?.status)
    }
}

fn superseded(record: &mut ReportRecord, artifact: GeneratedArtifact) -> Option<GeneratedArtifact> {
    record.status = ReportStatus::Generated;
    record.last_error = None;
    record.updated_at = Some(Utc::now());
    record.current.replace(artifact)
}

fn failed(record: &mut ReportRecord, reason: &str) {
    record.status = ReportStatus::Failed;
    record.last_error = Some(reason.to_string());
    record.updated_at = Some(Utc::now());
}

/// Process-local registry
#[derive(Debug, Default)]
pub struct InMemoryReportRegistry {
    records: Mutex<HashMap<ReportId, ReportRecord>>,
}

impl InMemoryReportRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ReportRegistry for InMemoryReportRegistry {
    fn record(&self, report: &ReportId) -> Result<ReportRecord, GenerationError> {
        Ok(self.records.lock().get(report).cloned().unwrap_or_default())
    }

    fn supersede(
        &self,
        report: &ReportId,
        artifact: GeneratedArtifact,
    ) -> Result<Option<GeneratedArtifact>, GenerationError> {
        let mut records = self.records.lock();
        Ok(superseded(records.entry(report.clone()).or_default(), artifact))
    }

    fn mark_failed(&self, report: &ReportId, reason: &str) -> Result<(), GenerationError> {
        failed(self.records.lock().entry(report.clone()).or_default(), reason);
        Ok(())
    }
}

/// One JSON pointer file per report under a directory
///
/// Updates are written to a temporary file and renamed into place, so a
/// reader sees either the old or the new record. The mutex serialises
/// read-modify-write cycles within one process only.
#[derive(Debug)]
pub struct FileReportRegistry {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileReportRegistry {
    /// Registry rooted at `dir`, created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Pointer file of `report`
    #[must_use]
    pub fn record_path(&self, report: &ReportId) -> PathBuf {
        let name: String = report
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    fn load(&self, report: &ReportId) -> Result<ReportRecord, GenerationError> {
        let path = self.record_path(report);
        match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| GenerationError::storage(&path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ReportRecord::default()),
            Err(e) => Err(GenerationError::storage(&path, e)),
        }
    }

    fn save(&self, report: &ReportId, record: &ReportRecord) -> Result<(), GenerationError> {
        let path = self.record_path(report);
        std::fs::create_dir_all(&self.dir).map_err(|e| GenerationError::storage(&self.dir, e))?;
        let json = serde_json::to_vec_pretty(record)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| GenerationError::storage(&self.dir, e))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| GenerationError::storage(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| GenerationError::storage(&path, e.error))?;
        Ok(())
    }
}

impl ReportRegistry for FileReportRegistry {
    fn record(&self, report: &ReportId) -> Result<ReportRecord, GenerationError> {
        let _guard = self.lock.lock();
        self.load(report)
    }

    fn supersede(
        &self,
        report: &ReportId,
        artifact: GeneratedArtifact,
    ) -> Result<Option<GeneratedArtifact>, GenerationError> {
        let _guard = self.lock.lock();
        let mut record = self.load(report)?;
        let previous = superseded(&mut record, artifact);
        self.save(report, &record)?;
        Ok(previous)
    }

    fn mark_failed(&self, report: &ReportId, reason: &str) -> Result<(), GenerationError> {
        let _guard = self.lock.lock();
        let mut record = self.load(report)?;
        failed(&mut record, reason);
        self.save(report, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_model::{ArtifactFormat, ContentHash, GenerationId};

    fn artifact(name: &str) -> GeneratedArtifact {
        GeneratedArtifact {
            generation_id: GenerationId::new(),
            format: ArtifactFormat::ScratchDocx,
            path: PathBuf::from(name),
            size_bytes: 10,
            valid: true,
            content_hash: ContentHash::of_text(name),
            created_at: Utc::now(),
        }
    }

    fn exercise(registry: &dyn ReportRegistry) {
        let id = ReportId::new("rpt/1");
        assert_eq!(registry.status(&id).unwrap(), ReportStatus::Draft);
        assert!(registry.current_artifact(&id).unwrap().is_none());

        assert!(registry.supersede(&id, artifact("a.docx")).unwrap().is_none());
        let previous = registry.supersede(&id, artifact("b.docx")).unwrap().unwrap();
        assert_eq!(previous.path, PathBuf::from("a.docx"));
        assert_eq!(registry.status(&id).unwrap(), ReportStatus::Generated);

        registry.mark_failed(&id, "storage unwritable").unwrap();
        let record = registry.record(&id).unwrap();
        assert_eq!(record.status, ReportStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("storage unwritable"));
        assert_eq!(record.current.unwrap().path, PathBuf::from("b.docx"));
    }

    #[test]
    fn in_memory_registry_tracks_pointer() {
        let registry = InMemoryReportRegistry::new();
        exercise(&registry);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn file_registry_tracks_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileReportRegistry::new(dir.path().join("records"));
        exercise(&registry);
        let path = registry.record_path(&ReportId::new("rpt/1"));
        assert_eq!(path.file_name().unwrap(), "rpt_1.json");
        assert!(path.exists());
    }

    #[test]
    fn file_registry_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = ReportId::new("r");
        FileReportRegistry::new(dir.path())
            .supersede(&id, artifact("x.html"))
            .unwrap();
        let reopened = FileReportRegistry::new(dir.path());
        assert_eq!(
            reopened.current_artifact(&id).unwrap().unwrap().path,
            PathBuf::from("x.html")
        );
    }
}
