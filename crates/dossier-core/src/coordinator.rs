//! Fallback chain coordinator
//!
//! Drives one generation run through
//! `TemplateAttempt → ScratchAttempt → EmergencyAttempt → Done | Failed`.
//!
//! Every stage error is caught here, recorded as a [`StageFailure`] and
//! turned into a transition to the next cheaper stage. Only an emergency
//! stage failure ends the run in `Failed`. A run never panics past this
//! boundary and never loops: each state is entered at most once.

use crate::assembler::DocumentAssembler;
use crate::budget::ExecutionBudget;
use crate::composer::Composer;
use crate::config::EngineConfig;
use crate::emergency::EmergencyComposer;
use crate::error::GenerationError;
use crate::registry::{InMemoryReportRegistry, ReportRegistry};
use crate::scratch::ScratchComposer;
use crate::store::ArtifactStore;
use dossier_model::{ArtifactFormat, GeneratedArtifact, ReportDocument, ReportId};
use dossier_strategy::FamilyPlan;
use dossier_template::TemplateError;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// States of one generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    TemplateAttempt,
    ScratchAttempt,
    EmergencyAttempt,
    Done,
    Failed,
}

impl GenerationState {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::TemplateAttempt => "template",
            Self::ScratchAttempt => "scratch",
            Self::EmergencyAttempt => "emergency",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// State entered when this one fails
    #[must_use]
    pub fn fallback(&self) -> Self {
        match self {
            Self::TemplateAttempt => Self::ScratchAttempt,
            Self::ScratchAttempt => Self::EmergencyAttempt,
            Self::EmergencyAttempt | Self::Done | Self::Failed => Self::Failed,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a template comes from
#[derive(Debug, Clone)]
pub enum TemplateRef {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl TemplateRef {
    /// Read the template, refusing anything over `max_bytes`
    ///
    /// # Errors
    /// - `GenerationError::TemplateNotFound` if the path is not a readable file
    /// - `GenerationError::TemplateMalformed` if the template is too large
    pub fn load(&self, max_bytes: u64) -> Result<Cow<'_, [u8]>, GenerationError> {
        let too_large = |len: u64| {
            GenerationError::TemplateMalformed(TemplateError::Malformed(format!(
                "template is {len} bytes, limit is {max_bytes}"
            )))
        };
        match self {
            Self::Bytes(bytes) => {
                let len = bytes.len() as u64;
                if len > max_bytes {
                    return Err(too_large(len));
                }
                Ok(Cow::Borrowed(bytes.as_slice()))
            }
            Self::Path(path) => {
                let not_found = || GenerationError::TemplateNotFound { path: path.clone() };
                let meta = std::fs::metadata(path).map_err(|_| not_found())?;
                if !meta.is_file() {
                    return Err(not_found());
                }
                if meta.len() > max_bytes {
                    return Err(too_large(meta.len()));
                }
                std::fs::read(path).map(Cow::Owned).map_err(|_| not_found())
            }
        }
    }
}

impl From<PathBuf> for TemplateRef {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for TemplateRef {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// A stage that failed and the cause
#[derive(Debug)]
pub struct StageFailure {
    pub stage: GenerationState,
    pub error: GenerationError,
}

impl Serialize for StageFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("StageFailure", 3)?;
        s.serialize_field("stage", &self.stage)?;
        s.serialize_field("kind", self.error.stage_label())?;
        s.serialize_field("message", &self.error.to_string())?;
        s.end()
    }
}

/// Result of one run
#[derive(Debug, Serialize)]
pub struct GenerationOutcome {
    pub report_id: ReportId,
    /// `Done` or `Failed`
    pub state: GenerationState,
    pub artifact: Option<GeneratedArtifact>,
    /// Strategies chosen, when a template was introspected
    pub plan: Option<FamilyPlan>,
    /// Stage failures in the order they happened
    pub failures: Vec<StageFailure>,
    /// Placeholder binding misses of the template stage
    pub misses: Vec<String>,
    pub elapsed_ms: u64,
}

impl GenerationOutcome {
    fn new(report_id: ReportId) -> Self {
        Self {
            report_id,
            state: GenerationState::TemplateAttempt,
            artifact: None,
            plan: None,
            failures: Vec::new(),
            misses: Vec::new(),
            elapsed_ms: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == GenerationState::Done
    }

    /// Format of the produced artifact
    #[must_use]
    pub fn format(&self) -> Option<ArtifactFormat> {
        self.artifact.as_ref().map(|a| a.format)
    }

    /// Cause of the final failure
    #[must_use]
    pub fn last_error(&self) -> Option<&GenerationError> {
        self.failures.last().map(|f| &f.error)
    }

    /// The artifact, or the error that ended the run
    ///
    /// # Errors
    /// Returns the emergency stage's error when the run failed
    pub fn into_result(mut self) -> Result<GeneratedArtifact, GenerationError> {
        if let Some(artifact) = self.artifact.take() {
            return Ok(artifact);
        }
        Err(self.failures.pop().map_or_else(
            || GenerationError::Serialization("run ended without an artifact".to_string()),
            |f| f.error,
        ))
    }
}

/// Runs the fallback chain for one report at a time
#[derive(Debug)]
pub struct FallbackChainCoordinator {
    config: EngineConfig,
    assembler: DocumentAssembler,
    scratch: Box<dyn Composer>,
    emergency: Box<dyn Composer>,
    store: ArtifactStore,
    registry: Arc<dyn ReportRegistry>,
}

impl FallbackChainCoordinator {
    /// Coordinator with the built-in composers, a store at the configured
    /// root and an in-memory registry
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            assembler: DocumentAssembler::new(config.clone()),
            scratch: Box::new(ScratchComposer::new(config.date_format.clone())),
            emergency: Box::new(EmergencyComposer::new(config.date_format.clone())),
            store: ArtifactStore::new(config.storage_root.clone()),
            registry: Arc::new(InMemoryReportRegistry::new()),
            config,
        }
    }

    /// With report registry
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn ReportRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// With replacement scratch composer
    #[inline]
    #[must_use]
    pub fn with_scratch_composer(mut self, composer: impl Composer + 'static) -> Self {
        self.scratch = Box::new(composer);
        self
    }

    /// With replacement emergency composer
    #[inline]
    #[must_use]
    pub fn with_emergency_composer(mut self, composer: impl Composer + 'static) -> Self {
        self.emergency = Box::new(composer);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &dyn ReportRegistry {
        self.registry.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Generate an artifact for `report`
    ///
    /// Starts at the scratch stage when no template is given or the report
    /// asks to bypass templates. Always ends in `Done` or `Failed`.
    pub fn run(&self, report: &ReportDocument, template: Option<&TemplateRef>) -> GenerationOutcome {
        let span = tracing::info_span!("generate", report_id = %report.id);
        let _enter = span.enter();

        let budget = ExecutionBudget::start(self.config.time_budget());
        let mut outcome = GenerationOutcome::new(report.id.clone());

        let template = template.filter(|_| !report.generate_without_template);
        let mut state = if template.is_some() {
            GenerationState::TemplateAttempt
        } else {
            tracing::info!(
                bypass = report.generate_without_template,
                "no template in use, composing from scratch"
            );
            GenerationState::ScratchAttempt
        };

        while !state.is_terminal() {
            tracing::info!(
                stage = %state,
                remaining_ms = u64::try_from(budget.remaining().as_millis()).unwrap_or(u64::MAX),
                "entering stage"
            );
            let attempt = match (state, template) {
                (GenerationState::TemplateAttempt, Some(template)) => {
                    self.template_stage(template, report, &budget, &mut outcome)
                }
                (GenerationState::ScratchAttempt, _) => self.compose_stage(
                    self.scratch.as_ref(),
                    "scratch",
                    Some(self.config.min_scratch_budget()),
                    report,
                    &budget,
                ),
                (GenerationState::EmergencyAttempt, _) => {
                    self.compose_stage(self.emergency.as_ref(), "emergency", None, report, &budget)
                }
                _ => Err(GenerationError::Config(format!("no work defined for {state} stage"))),
            };

            state = match attempt {
                Ok(artifact) => {
                    tracing::info!(
                        stage = %state,
                        format = %artifact.format,
                        path = %artifact.path.display(),
                        "stage produced artifact"
                    );
                    outcome.artifact = Some(artifact);
                    GenerationState::Done
                }
                Err(error) => {
                    let next = state.fallback();
                    tracing::warn!(
                        stage = %state,
                        next = %next,
                        kind = error.stage_label(),
                        error = %error,
                        "stage failed"
                    );
                    outcome.failures.push(StageFailure { stage: state, error });
                    next
                }
            };
        }

        outcome.state = state;
        outcome.elapsed_ms = budget.elapsed_ms();

        if state == GenerationState::Failed {
            let reason = outcome
                .last_error()
                .map_or_else(|| "generation failed".to_string(), ToString::to_string);
            tracing::error!(reason = %reason, "generation failed at every stage");
            if let Err(e) = self.registry.mark_failed(&report.id, &reason) {
                tracing::error!(error = %e, "could not record failed status");
            }
        } else {
            tracing::info!(
                elapsed_ms = outcome.elapsed_ms,
                failures = outcome.failures.len(),
                "generation finished"
            );
        }
        outcome
    }

    fn template_stage(
        &self,
        template: &TemplateRef,
        report: &ReportDocument,
        budget: &ExecutionBudget,
        outcome: &mut GenerationOutcome,
    ) -> Result<GeneratedArtifact, GenerationError> {
        budget.check("template", self.config.min_template_budget())?;
        let bytes = template.load(self.config.max_template_bytes)?;
        let assembly = self.assembler.assemble(&bytes, report, budget)?;
        if !assembly.misses.is_empty() {
            tracing::debug!(count = assembly.misses.len(), "placeholder binding misses");
        }
        outcome.plan = Some(assembly.plan);
        outcome.misses = assembly.misses;
        self.store.persist(
            &assembly.bytes,
            ArtifactFormat::TemplateDocx,
            report,
            self.registry.as_ref(),
        )
    }

    fn compose_stage(
        &self,
        composer: &dyn Composer,
        stage: &'static str,
        needed: Option<Duration>,
        report: &ReportDocument,
        budget: &ExecutionBudget,
    ) -> Result<GeneratedArtifact, GenerationError> {
        if let Some(needed) = needed {
            budget.check(stage, needed)?;
        }
        let bytes = composer.compose(report)?;
        self.store
            .persist(&bytes, composer.format(), report, self.registry.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_order_is_fixed() {
        assert_eq!(
            GenerationState::TemplateAttempt.fallback(),
            GenerationState::ScratchAttempt
        );
        assert_eq!(
            GenerationState::ScratchAttempt.fallback(),
            GenerationState::EmergencyAttempt
        );
        assert_eq!(GenerationState::EmergencyAttempt.fallback(), GenerationState::Failed);
        assert!(GenerationState::Done.is_terminal());
    }

    #[test]
    fn missing_template_path_is_not_found() {
        let err = TemplateRef::Path(PathBuf::from("/nonexistent/t.docx"))
            .load(1024)
            .unwrap_err();
        assert!(matches!(err, GenerationError::TemplateNotFound { .. }));
    }

    #[test]
    fn oversized_template_is_malformed() {
        let err = TemplateRef::Bytes(vec![0; 16]).load(8).unwrap_err();
        assert!(matches!(err, GenerationError::TemplateMalformed(_)));
    }

    #[test]
    fn stage_failure_serializes_kind_and_message() {
        let failure = StageFailure {
            stage: GenerationState::ScratchAttempt,
            error: GenerationError::Serialization("zip".into()),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["stage"], "scratch_attempt");
        assert_eq!(json["kind"], "serialization");
        assert_eq!(json["message"], "serialization error: zip");
    }
}
