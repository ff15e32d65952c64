//! Generated artifact records
//!
//! A [`GeneratedArtifact`] is created by whichever composer succeeds and is
//! persisted exactly once per successful run. The report record points at
//! the current one; regeneration supersedes it.

use crate::hash::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use ulid::Ulid;

/// Unique generation run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenerationId(pub Ulid);

impl GenerationId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for GenerationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which composer produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactFormat {
    /// Template populated in place
    #[serde(rename = "template-docx")]
    TemplateDocx,
    /// Fixed layout composed without a template
    #[serde(rename = "scratch-docx")]
    ScratchDocx,
    /// Last-resort markup
    #[serde(rename = "emergency-html")]
    EmergencyHtml,
}

impl ArtifactFormat {
    /// Stable tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TemplateDocx => "template-docx",
            Self::ScratchDocx => "scratch-docx",
            Self::EmergencyHtml => "emergency-html",
        }
    }

    /// File extension, without dot
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TemplateDocx | Self::ScratchDocx => "docx",
            Self::EmergencyHtml => "html",
        }
    }

    /// True for zip-based containers
    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::TemplateDocx | Self::ScratchDocx)
    }

    /// True when the artifact came from a fallback stage
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::TemplateDocx)
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "template-docx" => Ok(Self::TemplateDocx),
            "scratch-docx" => Ok(Self::ScratchDocx),
            "emergency-html" => Ok(Self::EmergencyHtml),
            other => Err(format!("unknown artifact format: {other}")),
        }
    }
}

/// Report generation status as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// No current artifact
    #[default]
    Draft,
    /// A current artifact exists
    Generated,
    /// Last run failed at every stage
    Failed,
}

/// A persisted, validated artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub generation_id: GenerationId,
    pub format: ArtifactFormat,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub valid: bool,
    /// Fingerprint of the extracted text content
    pub content_hash: ContentHash,
    pub created_at: DateTime<Utc>,
}

impl GeneratedArtifact {
    /// File name component of the storage path
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_tags_roundtrip() {
        for format in [
            ArtifactFormat::TemplateDocx,
            ArtifactFormat::ScratchDocx,
            ArtifactFormat::EmergencyHtml,
        ] {
            assert_eq!(format.tag().parse::<ArtifactFormat>().unwrap(), format);
        }
    }

    #[test]
    fn only_template_output_is_undegraded() {
        assert!(!ArtifactFormat::TemplateDocx.is_degraded());
        assert!(ArtifactFormat::ScratchDocx.is_degraded());
        assert!(ArtifactFormat::EmergencyHtml.is_degraded());
        assert_eq!(ArtifactFormat::EmergencyHtml.extension(), "html");
    }

    #[test]
    fn format_serializes_as_tag() {
        let json = serde_json::to_string(&ArtifactFormat::ScratchDocx).unwrap();
        assert_eq!(json, "\"scratch-docx\"");
    }
}
