//! Error types for the template boundary
//!
//! Provides error handling for:
//! - Container operations (bytes → package, package → bytes)
//! - Structural expansion (block duplication, row duplication)

/// Errors while opening, reading or serializing a template container
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Container is not a usable package
    #[error("malformed template: {0}")]
    Malformed(String),

    /// Mandatory internal part absent
    #[error("missing mandatory part: {0}")]
    MissingPart(String),

    /// Markup part is not UTF-8
    #[error("part {part} is not valid UTF-8")]
    Encoding { part: String },

    /// Archive-level failure
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Markup does not parse
    #[error("markup error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// IO error while reading or writing entries
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// True when the container itself is unusable (as opposed to a write failure)
    #[inline]
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Errors during structural duplication
#[derive(Debug, thiserror::Error)]
pub enum ExpandError {
    /// Opening marker not present
    #[error("block marker not found: {0}")]
    BlockNotFound(String),

    /// Markers present but not usable as one region
    #[error("unbalanced block {marker}: {reason}")]
    UnbalancedBlock { marker: String, reason: String },

    /// Anchor placeholder not present
    #[error("placeholder not found: {0}")]
    PlaceholderNotFound(String),

    /// Anchor is not inside a table row
    #[error("no table row contains placeholder {0}")]
    RowNotFound(String),

    /// Markup did not parse before or after mutation
    #[error("markup error: {0}")]
    Xml(#[from] roxmltree::Error),
}

impl ExpandError {
    pub(crate) fn unbalanced(marker: &str, reason: impl Into<String>) -> Self {
        Self::UnbalancedBlock {
            marker: marker.to_string(),
            reason: reason.into(),
        }
    }
}
