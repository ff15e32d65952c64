//! Dossier Model
//!
//! Report snapshots consumed by the assembly engine and the artifact records
//! it produces.
//!
//! # Core Concepts
//!
//! - [`ReportDocument`]: immutable input snapshot for one generation run
//! - [`GeneratedArtifact`]: a persisted, validated output file
//! - [`ArtifactFormat`]: which fallback stage produced the artifact
//! - [`ContentHash`]: Blake3 fingerprint of extracted text
//!
//! # Example
//!
//! ```rust,ignore
//! use dossier_model::{FindingEntry, ReportDocument, Severity};
//!
//! let mut report = ReportDocument::new("r-17", "External Assessment");
//! report.findings.push(FindingEntry::new("Open redirect", Severity::Medium));
//! assert_eq!(report.severity_counts().medium, 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod hash;
mod report;
mod severity;

pub use artifact::{ArtifactFormat, GeneratedArtifact, GenerationId, ReportStatus};
pub use hash::{ContentHash, HashError};
pub use report::{
    ClientRef, FileRef, FindingEntry, MethodologyEntry, ProjectRef, ReportDocument, ReportId,
};
pub use severity::{Severity, SeverityCounts};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
