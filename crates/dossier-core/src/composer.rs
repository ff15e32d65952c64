//! Template-free composers
//!
//! The two fallback stages share one seam: given a report, produce artifact
//! bytes in a fixed format. The coordinator holds them as trait objects so
//! either stage can be replaced (a different house layout, or a failing
//! double in tests).

use crate::error::GenerationError;
use dossier_model::{ArtifactFormat, ReportDocument};
use std::fmt;

/// Produces artifact bytes directly from a report
pub trait Composer: Send + Sync + fmt::Debug {
    /// Format of the bytes this composer produces
    fn format(&self) -> ArtifactFormat;

    /// Render `report`
    ///
    /// # Errors
    /// Returns `GenerationError::Serialization` if the output cannot be encoded
    fn compose(&self, report: &ReportDocument) -> Result<Vec<u8>, GenerationError>;
}
