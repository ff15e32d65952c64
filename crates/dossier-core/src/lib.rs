//! Dossier Core - report assembly engine
//!
//! Turns a report snapshot into a downloadable document:
//! - Fills a customer template when one is assigned and usable
//! - Falls back to a fixed-layout document when it is not
//! - Falls back again to a self-contained HTML page as a last resort
//! - Persists, validates and registers the result
//!
//! # Example
//!
//! ```rust,ignore
//! use dossier_core::{EngineConfig, FallbackChainCoordinator, TemplateRef};
//!
//! let coordinator = FallbackChainCoordinator::new(EngineConfig::new());
//! let template = TemplateRef::Path("templates/pentest.docx".into());
//! let outcome = coordinator.run(&report, Some(&template));
//!
//! let artifact = outcome.into_result()?;
//! println!("{} at {}", artifact.format, artifact.path.display());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod assembler;
pub mod budget;
pub mod composer;
pub mod config;
pub mod content;
pub mod coordinator;
pub mod emergency;
pub mod error;
pub mod registry;
pub mod scratch;
pub mod store;

pub use assembler::{Assembly, DocumentAssembler};
pub use budget::ExecutionBudget;
pub use composer::Composer;
pub use config::EngineConfig;
pub use coordinator::{
    FallbackChainCoordinator, GenerationOutcome, GenerationState, StageFailure, TemplateRef,
};
pub use emergency::EmergencyComposer;
pub use error::GenerationError;
pub use registry::{FileReportRegistry, InMemoryReportRegistry, ReportRecord, ReportRegistry};
pub use scratch::ScratchComposer;
pub use store::{validate_file, ArtifactStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        EngineConfig, FallbackChainCoordinator, GenerationError, GenerationOutcome,
        GenerationState, ReportRegistry, TemplateRef,
    };
    pub use dossier_model::{ArtifactFormat, GeneratedArtifact, ReportDocument};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
