//! Artifact persistence
//!
//! Writes, validates and registers generated artifacts.
//!
//! # Invariants
//!
//! - A file is never overwritten: names collide only within one millisecond
//!   and a collision retries with a numeric suffix.
//! - An artifact is registered only after it re-opens cleanly; a file that
//!   fails validation is removed and reported as a storage failure.
//! - Registering a new artifact deletes the one it supersedes.

use crate::error::GenerationError;
use crate::registry::ReportRegistry;
use chrono::{DateTime, Utc};
use dossier_model::{ArtifactFormat, ContentHash, GeneratedArtifact, GenerationId, ReportDocument};
use dossier_template::TemplatePackage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

const MAX_NAME_ATTEMPTS: u32 = 32;
const MAX_SLUG_LEN: usize = 60;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));

/// Persists artifacts under one storage root
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write, validate and register `bytes` as the report's current artifact
    ///
    /// # Errors
    /// Returns `GenerationError::StorageWriteFailure` if the file cannot be
    /// written, fails validation, or the registry cannot be updated
    pub fn persist(
        &self,
        bytes: &[u8],
        format: ArtifactFormat,
        report: &ReportDocument,
        registry: &dyn ReportRegistry,
    ) -> Result<GeneratedArtifact, GenerationError> {
        self.persist_at(bytes, format, report, registry, Utc::now())
    }

    /// [`ArtifactStore::persist`] with an explicit creation time
    ///
    /// # Errors
    /// Same as [`ArtifactStore::persist`]
    pub fn persist_at(
        &self,
        bytes: &[u8],
        format: ArtifactFormat,
        report: &ReportDocument,
        registry: &dyn ReportRegistry,
        created_at: DateTime<Utc>,
    ) -> Result<GeneratedArtifact, GenerationError> {
        let stem = artifact_stem(&report.title, created_at);
        let path = self.write_new(&stem, format.extension(), bytes)?;

        let text = match validate_bytes(bytes_on_disk(&path)?.as_slice(), format.is_container()) {
            Ok(text) => text,
            Err(reason) => {
                discard(&path);
                return Err(GenerationError::storage(&path, reason));
            }
        };

        let artifact = GeneratedArtifact {
            generation_id: GenerationId::new(),
            format,
            path: path.clone(),
            size_bytes: bytes.len() as u64,
            valid: true,
            content_hash: ContentHash::of_text(&text),
            created_at,
        };

        let previous = match registry.supersede(&report.id, artifact.clone()) {
            Ok(previous) => previous,
            Err(err) => {
                discard(&path);
                return Err(err);
            }
        };
        if let Some(previous) = previous.filter(|p| p.path != path) {
            match std::fs::remove_file(&previous.path) {
                Ok(()) => tracing::debug!(path = %previous.path.display(), "removed superseded artifact"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %previous.path.display(),
                    error = %e,
                    "superseded artifact could not be removed"
                ),
            }
        }

        tracing::info!(
            report_id = %report.id,
            format = %format,
            path = %path.display(),
            size = artifact.size_bytes,
            hash = %artifact.content_hash.short(),
            "artifact persisted"
        );
        Ok(artifact)
    }

    /// Write `bytes` under a fresh name, never replacing an existing file
    fn write_new(&self, stem: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf, GenerationError> {
        std::fs::create_dir_all(&self.root).map_err(|e| GenerationError::storage(&self.root, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| GenerationError::storage(&self.root, e))?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| GenerationError::storage(tmp.path(), e))?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{stem}.{extension}")
            } else {
                format!("{stem}-{attempt}.{extension}")
            };
            let path = self.root.join(name);
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path.display(), "artifact name taken, retrying");
                    tmp = e.file;
                }
                Err(e) => return Err(GenerationError::storage(&path, e.error)),
            }
        }
        Err(GenerationError::storage(
            self.root.join(format!("{stem}.{extension}")),
            format!("no free name after {MAX_NAME_ATTEMPTS} attempts"),
        ))
    }
}

/// Re-open a stored file and fingerprint its text
///
/// The format is taken from the extension: `docx` is checked as a
/// container, anything else as markup.
///
/// # Errors
/// Returns `GenerationError::StorageWriteFailure` if the file is unreadable
/// or structurally invalid
pub fn validate_file(path: &Path) -> Result<ContentHash, GenerationError> {
    let container = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    let bytes = bytes_on_disk(path)?;
    validate_bytes(&bytes, container)
        .map(|text| ContentHash::of_text(&text))
        .map_err(|reason| GenerationError::storage(path, reason))
}

/// Structural check; returns the visible text on success
fn validate_bytes(bytes: &[u8], container: bool) -> Result<String, String> {
    if bytes.is_empty() {
        return Err("artifact is empty".to_string());
    }
    if container {
        TemplatePackage::verify(bytes).map_err(|e| e.to_string())?;
        let package = TemplatePackage::open(bytes).map_err(|e| e.to_string())?;
        return package.plain_text().map_err(|e| e.to_string());
    }

    let markup = std::str::from_utf8(bytes).map_err(|e| format!("markup is not utf-8: {e}"))?;
    let lower = markup.to_ascii_lowercase();
    match (lower.find("<html"), lower.rfind("</html>")) {
        (Some(open), Some(close)) if open < close => {}
        _ => return Err("markup lacks an html document element".to_string()),
    }
    let text = TAG_RE
        .replace_all(markup, "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(text)
}

fn bytes_on_disk(path: &Path) -> Result<Vec<u8>, GenerationError> {
    std::fs::read(path).map_err(|e| GenerationError::storage(path, e))
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "invalid artifact could not be removed");
    }
}

/// `{slug}_{YYYYMMDD_HHMMSS_mmm}`
#[must_use]
pub fn artifact_stem(title: &str, created_at: DateTime<Utc>) -> String {
    format!("{}_{}", slug(title), created_at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Lowercase ASCII slug; `report` when nothing usable remains
#[must_use]
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    for ch in title.chars() {
        if out.len() >= MAX_SLUG_LEN {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryReportRegistry;
    use chrono::TimeZone;
    use dossier_model::ReportStatus;
    use dossier_test_utils::{sample_report, TemplateBuilder};
    use pretty_assertions::assert_eq;

    const PAGE: &[u8] = b"<!doctype html><html><body><h1>Title</h1><p>Body</p></body></html>";

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 10, 30, 0).unwrap()
    }

    #[test]
    fn slug_is_filesystem_safe() {
        assert_eq!(slug("External Network Assessment"), "external_network_assessment");
        assert_eq!(slug("  Q3 / 2024: Web!! "), "q3_2024_web");
        assert_eq!(slug("日本語"), "report");
        assert!(slug(&"a".repeat(200)).len() <= MAX_SLUG_LEN);
    }

    #[test]
    fn stem_carries_timestamp() {
        assert_eq!(
            artifact_stem("Acme", at()),
            "acme_20240320_103000_000"
        );
    }

    #[test]
    fn persist_registers_and_fingerprints() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let registry = InMemoryReportRegistry::new();
        let report = sample_report();

        let artifact = store
            .persist_at(PAGE, ArtifactFormat::EmergencyHtml, &report, &registry, at())
            .unwrap();
        assert!(artifact.valid);
        assert_eq!(artifact.size_bytes, PAGE.len() as u64);
        assert_eq!(
            artifact.file_name(),
            Some("external_network_assessment_20240320_103000_000.html")
        );
        assert_eq!(artifact.content_hash, ContentHash::of_text("Title\nBody"));
        assert_eq!(registry.status(&report.id).unwrap(), ReportStatus::Generated);
    }

    #[test]
    fn colliding_names_get_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let report = sample_report();
        let first = store
            .persist_at(PAGE, ArtifactFormat::EmergencyHtml, &report, &InMemoryReportRegistry::new(), at())
            .unwrap();
        let second = store
            .persist_at(PAGE, ArtifactFormat::EmergencyHtml, &report, &InMemoryReportRegistry::new(), at())
            .unwrap();
        assert_ne!(first.path, second.path);
        assert!(second.file_name().unwrap().ends_with("-1.html"));
        assert!(first.path.exists() && second.path.exists());
    }

    #[test]
    fn superseded_artifact_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let registry = InMemoryReportRegistry::new();
        let report = sample_report();
        let old = store
            .persist(PAGE, ArtifactFormat::EmergencyHtml, &report, &registry)
            .unwrap();
        let new = store
            .persist(PAGE, ArtifactFormat::EmergencyHtml, &report, &registry)
            .unwrap();
        assert!(!old.path.exists());
        assert!(new.path.exists());
        assert_eq!(registry.current_artifact(&report.id).unwrap().unwrap().path, new.path);
    }

    #[test]
    fn invalid_container_is_removed_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let registry = InMemoryReportRegistry::new();
        let err = store
            .persist(b"not a zip", ArtifactFormat::ScratchDocx, &sample_report(), &registry)
            .unwrap_err();
        assert!(err.is_storage_fault());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(registry.status(&sample_report().id).unwrap(), ReportStatus::Draft);
    }

    #[test]
    fn truncated_markup_is_rejected() {
        assert!(validate_bytes(b"<html><body>cut", false).is_err());
        assert!(validate_bytes(b"", false).is_err());
    }

    #[test]
    fn validate_file_reads_containers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.docx");
        std::fs::write(&path, TemplateBuilder::new().paragraph("Hello").build()).unwrap();
        assert_eq!(validate_file(&path).unwrap(), ContentHash::of_text("Hello"));
    }
}
