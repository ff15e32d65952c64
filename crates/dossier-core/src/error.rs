//! Error types for the assembly engine
//!
//! Provides error handling for:
//! - Template loading and assembly failures
//! - Structural duplication failures
//! - Artifact persistence and validation
//! - Soft time-budget exhaustion
//!
//! Every variant is caught at a stage boundary by the coordinator. Only the
//! final stage's failure ever reaches the caller.

use dossier_template::{ExpandError, TemplateError};
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Template reference does not resolve to a readable file
    #[error("template not found: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    /// Container unreadable or missing a mandatory part
    #[error("template malformed: {0}")]
    TemplateMalformed(#[from] TemplateError),

    /// No placeholder for a field (never escalates)
    #[error("no placeholder bound for field {field}")]
    PlaceholderBindingMiss { field: String },

    /// Structural duplication could not complete
    #[error("block clone failed for {marker}: {reason}")]
    BlockCloneFailure { marker: String, reason: String },

    /// Artifact could not be written or failed validation
    #[error("storage write failed for {}: {reason}", path.display())]
    StorageWriteFailure { path: PathBuf, reason: String },

    /// Too little time left to start a stage
    #[error("execution budget exceeded before {stage} stage ({elapsed_ms}ms elapsed)")]
    ExecutionBudgetExceeded { stage: &'static str, elapsed_ms: u64 },

    /// The template stage failed as a whole
    #[error("template assembly failed: {0}")]
    TemplateAssemblyFailed(Box<GenerationError>),

    /// Output could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid engine configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    /// Wrap as a template-stage failure, without double wrapping
    #[must_use]
    pub fn assembly(inner: GenerationError) -> Self {
        match inner {
            Self::TemplateAssemblyFailed(_) => inner,
            other => Self::TemplateAssemblyFailed(Box::new(other)),
        }
    }

    /// Clone failure for `marker`
    #[must_use]
    pub fn clone_failure(marker: &str, source: &ExpandError) -> Self {
        Self::BlockCloneFailure {
            marker: marker.to_string(),
            reason: source.to_string(),
        }
    }

    /// Storage failure at `path`
    pub fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::StorageWriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the failure is attributable to the template
    #[inline]
    #[must_use]
    pub fn is_template_fault(&self) -> bool {
        match self {
            Self::TemplateNotFound { .. }
            | Self::TemplateMalformed(_)
            | Self::BlockCloneFailure { .. } => true,
            Self::TemplateAssemblyFailed(inner) => inner.is_template_fault(),
            _ => false,
        }
    }

    /// Check if the failure happened writing or validating output
    #[inline]
    #[must_use]
    pub fn is_storage_fault(&self) -> bool {
        match self {
            Self::StorageWriteFailure { .. } => true,
            Self::TemplateAssemblyFailed(inner) => inner.is_storage_fault(),
            _ => false,
        }
    }

    /// Short label of the taxonomy entry
    #[must_use]
    pub fn stage_label(&self) -> &'static str {
        match self {
            Self::TemplateNotFound { .. } => "template-not-found",
            Self::TemplateMalformed(_) => "template-malformed",
            Self::PlaceholderBindingMiss { .. } => "placeholder-binding-miss",
            Self::BlockCloneFailure { .. } => "block-clone-failure",
            Self::StorageWriteFailure { .. } => "storage-write-failure",
            Self::ExecutionBudgetExceeded { .. } => "execution-budget-exceeded",
            Self::TemplateAssemblyFailed(_) => "template-assembly-failed",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembly_does_not_double_wrap() {
        let inner = GenerationError::Serialization("zip".into());
        let once = GenerationError::assembly(inner);
        let twice = GenerationError::assembly(once);
        match twice {
            GenerationError::TemplateAssemblyFailed(inner) => {
                assert!(matches!(*inner, GenerationError::Serialization(_)));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn wrapped_template_fault_is_visible() {
        let err = GenerationError::assembly(GenerationError::BlockCloneFailure {
            marker: "block_findings".into(),
            reason: "closing marker missing".into(),
        });
        assert!(err.is_template_fault());
        assert!(!err.is_storage_fault());
        assert_eq!(err.stage_label(), "template-assembly-failed");
    }

    #[test]
    fn storage_fault_messages_name_path() {
        let err = GenerationError::storage("/tmp/out.docx", "disk full");
        assert!(err.is_storage_fault());
        assert!(err.to_string().contains("/tmp/out.docx"));
    }
}
