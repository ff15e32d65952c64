//! Template-based document assembly
//!
//! One full pass: introspect → select a strategy per family → bind report
//! scalars → apply each family's strategy → sweep leftovers → serialize.
//!
//! Any structural failure surfaces as `TemplateAssemblyFailed` for the
//! coordinator to handle. Binding misses never fail a pass.

use crate::budget::ExecutionBudget;
use crate::config::EngineConfig;
use crate::content::{
    aggregate_text, evidence_text, evidence_values, family_records, record_line, report_values,
    RecordValues,
};
use crate::error::GenerationError;
use chrono::Utc;
use dossier_model::ReportDocument;
use dossier_strategy::{BindingStrategy, CloneMode, FamilyPlan, FieldMap, IndexConvention, StrategySelector};
use dossier_template::{
    BindingMap, BlockExpander, ContentFamily, LogicalField, TemplateIntrospector, TemplatePackage,
    ValueBinder,
};
use std::time::Duration;

const STAGE: &str = "template";

/// Result of a successful assembly pass
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Serialized container
    pub bytes: Vec<u8>,
    /// Strategies applied
    pub plan: FamilyPlan,
    /// Fields and placeholders that found nothing to bind, plus records
    /// omitted for lack of a slot as `family[n]`
    pub misses: Vec<String>,
}

/// Fills a template from a report
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    config: EngineConfig,
}

impl DocumentAssembler {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Assemble `template` for `report`
    ///
    /// # Errors
    /// Returns `GenerationError::TemplateAssemblyFailed` wrapping the cause
    /// (malformed container, clone failure, serialization failure, or budget
    /// exhausted between phases)
    pub fn assemble(
        &self,
        template: &[u8],
        report: &ReportDocument,
        budget: &ExecutionBudget,
    ) -> Result<Assembly, GenerationError> {
        self.run(template, report, budget)
            .map_err(GenerationError::assembly)
    }

    fn run(
        &self,
        template: &[u8],
        report: &ReportDocument,
        budget: &ExecutionBudget,
    ) -> Result<Assembly, GenerationError> {
        let descriptor = TemplateIntrospector::new().introspect(template)?;
        let plan = StrategySelector::new().select_all(&descriptor);
        tracing::info!(
            report_id = %report.id,
            methodologies = %plan.methodologies,
            findings = %plan.findings,
            "binding strategies selected"
        );

        let mut package = descriptor.into_package();
        let mut misses = Vec::new();

        let today = Utc::now().date_naive();
        let mut binder = ValueBinder::new(&mut package);
        for (field, value) in report_values(report, &self.config.date_format, today) {
            binder.bind(field, Some(value.as_str()));
        }
        tracing::debug!(bound = binder.bound(), "report scalars bound");
        misses.extend(binder.into_misses());
        budget.check(STAGE, Duration::ZERO)?;

        for family in ContentFamily::ALL {
            apply(&mut package, plan.get(family), family, report, &mut misses)?;
            budget.check(STAGE, Duration::ZERO)?;
        }

        if self.config.clear_unbound_placeholders {
            let mut binder = ValueBinder::new(&mut package);
            let cleared = binder.clear_remaining();
            if !cleared.is_empty() {
                tracing::debug!(count = cleared.len(), "swept unbound placeholders");
            }
            misses.extend(binder.into_misses());
        }

        let bytes = package
            .to_bytes()
            .map_err(|e| GenerationError::Serialization(e.to_string()))?;
        Ok(Assembly {
            bytes,
            plan,
            misses,
        })
    }
}

fn apply(
    package: &mut TemplatePackage,
    strategy: &BindingStrategy,
    family: ContentFamily,
    report: &ReportDocument,
    misses: &mut Vec<String>,
) -> Result<(), GenerationError> {
    let records = family_records(report, family);
    match strategy {
        BindingStrategy::None => {
            tracing::debug!(family = %family, "template has no room for family");
        }
        BindingStrategy::AggregateText { placeholder } => {
            write_aggregate(package, family, placeholder, report);
        }
        BindingStrategy::RowClone { anchor, fields } => {
            let rows: Vec<BindingMap> = records.iter().map(|r| binding_map(fields, r, "")).collect();
            let expanded = BlockExpander::new(package).expand_rows(anchor, &rows);
            if let Err(err) = expanded {
                tracing::warn!(
                    family = %family,
                    anchor = %anchor,
                    error = %err,
                    "row clone failed, falling back to aggregate text"
                );
                write_aggregate(package, family, anchor, report);
            }
        }
        BindingStrategy::IndexedPlaceholder {
            base,
            convention,
            slots,
        } => {
            misses.extend(fill_slots(package, family, base, *convention, slots, &records));
        }
        BindingStrategy::BlockClone {
            marker,
            fields,
            mode: CloneMode::Immediate,
        } => {
            let maps: Vec<BindingMap> = records.iter().map(|r| binding_map(fields, r, "")).collect();
            BlockExpander::new(package)
                .duplicate(marker, &maps)
                .map_err(|e| GenerationError::clone_failure(marker, &e))?;
        }
        BindingStrategy::BlockClone {
            marker,
            fields,
            mode: CloneMode::IndexedWithRows { row_anchor },
        } => {
            clone_with_evidence(package, marker, fields, row_anchor, report, &records)?;
        }
    }
    Ok(())
}

/// Placeholder name (plus `suffix`) to value, for fields the template uses
fn binding_map(fields: &FieldMap, values: &RecordValues, suffix: &str) -> BindingMap {
    fields
        .iter()
        .filter_map(|(field, name)| {
            values
                .iter()
                .find(|(f, _)| *f == field)
                .map(|(_, value)| (format!("{name}{suffix}"), value.clone()))
        })
        .collect()
}

/// Write the whole family into `placeholder`, clearing the family's other
/// un-suffixed placeholders so each record appears once
fn write_aggregate(
    package: &mut TemplatePackage,
    family: ContentFamily,
    placeholder: &str,
    report: &ReportDocument,
) {
    let text = aggregate_text(report, family);
    let mut binder = ValueBinder::new(package);
    binder.set_value(placeholder, &text);

    let others = family
        .base_candidates()
        .iter()
        .chain(family.fields().iter().flat_map(|f| f.candidates().iter()));
    for name in others {
        if *name != placeholder {
            binder.clear(name);
        }
    }
}

/// Bind records into indexed slots; surplus slots are cleared and records
/// beyond the last slot are reported as misses
fn fill_slots(
    package: &mut TemplatePackage,
    family: ContentFamily,
    base: &str,
    convention: IndexConvention,
    slots: &[u32],
    records: &[RecordValues],
) -> Vec<String> {
    if records.len() > slots.len() {
        tracing::warn!(
            family = %family,
            records = records.len(),
            slots = slots.len(),
            "more records than indexed slots, surplus records omitted"
        );
    }
    let list_base = !family
        .fields()
        .iter()
        .any(|f| f.candidates().contains(&base));

    let mut binder = ValueBinder::new(package);
    for (slot, values) in slots.iter().zip(records) {
        let suffix = convention.suffix(*slot);
        for (field, value) in values {
            binder.bind_suffixed(*field, &suffix, Some(value.as_str()));
        }
        if list_base {
            binder.set_value(&format!("{base}{suffix}"), &record_line(family, values));
        }
    }
    for slot in slots.iter().skip(records.len()) {
        let suffix = convention.suffix(*slot);
        binder.clear(&format!("{base}{suffix}"));
        for field in family.fields() {
            for candidate in field.candidates() {
                binder.clear(&format!("{candidate}{suffix}"));
            }
        }
    }
    let mut misses = binder.into_misses();
    misses.extend((slots.len()..records.len()).map(|i| format!("{family}[{}]", i + 1)));
    misses
}

/// Two-pass clone: suffix every finding clone, expand its evidence rows,
/// then bind its values
fn clone_with_evidence(
    package: &mut TemplatePackage,
    marker: &str,
    fields: &FieldMap,
    row_anchor: &str,
    report: &ReportDocument,
    records: &[RecordValues],
) -> Result<(), GenerationError> {
    let findings = report.ordered_findings();
    BlockExpander::new(package)
        .duplicate_indexed(marker, findings.len())
        .map_err(|e| GenerationError::clone_failure(marker, &e))?;

    for (i, (finding, values)) in findings.iter().zip(records).enumerate() {
        let suffix = format!("#{}", i + 1);
        let anchor = format!("{row_anchor}{suffix}");
        let rows: Vec<BindingMap> = finding
            .rendered_evidence()
            .iter()
            .map(|file| {
                let mut map = BindingMap::new();
                for (field, value) in evidence_values(file) {
                    for candidate in field.candidates() {
                        map.insert(format!("{candidate}{suffix}"), value.clone());
                    }
                }
                map
            })
            .collect();

        let expanded = BlockExpander::new(package).expand_rows(&anchor, &rows);
        if let Err(err) = expanded {
            tracing::warn!(
                marker,
                anchor = %anchor,
                error = %err,
                "evidence rows not expandable, writing evidence as text"
            );
            let text = evidence_text(finding);
            let fallback = text
                .as_deref()
                .unwrap_or_else(|| LogicalField::FindingEvidence.default_text());
            ValueBinder::new(package).set_value(&anchor, fallback);
        }

        let mut binder = ValueBinder::new(package);
        for (name, value) in binding_map(fields, values, &suffix) {
            binder.set_value(&name, &value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_model::{FindingEntry, MethodologyEntry, Severity};
    use dossier_test_utils::{extract_all_text, extract_text, report_with_findings, sample_report, TemplateBuilder};
    use pretty_assertions::assert_eq;

    fn assembler() -> DocumentAssembler {
        DocumentAssembler::new(EngineConfig::new().with_date_format("%Y-%m-%d"))
    }

    fn budget() -> ExecutionBudget {
        ExecutionBudget::start(Duration::from_secs(60))
    }

    #[test]
    fn scalars_are_bound_everywhere() {
        let template = TemplateBuilder::new()
            .paragraph("${report_title}")
            .paragraph("Client: ${client}")
            .paragraph("Date: ${report_date}")
            .footer("${project_name}")
            .build();
        let assembly = assembler().assemble(&template, &sample_report(), &budget()).unwrap();
        let text = extract_all_text(&assembly.bytes);
        assert!(text.contains("External Network Assessment"));
        assert!(text.contains("Client: Acme Corp"));
        assert!(text.contains("Date: 2024-03-20"));
        assert!(text.contains("Perimeter Review"));
    }

    #[test]
    fn blank_template_binds_nothing_and_succeeds() {
        let template = TemplateBuilder::new().paragraph("Static text").build();
        let assembly = assembler().assemble(&template, &sample_report(), &budget()).unwrap();
        assert!(assembly.plan.methodologies.is_none());
        assert!(assembly.plan.findings.is_none());
        assert_eq!(extract_text(&assembly.bytes), "Static text");
    }

    #[test]
    fn methodology_block_and_finding_aggregate() {
        let template = TemplateBuilder::new()
            .block("block_methodologies", &["${methodology_title}", "${methodology_description}"])
            .paragraph("${finding_name}")
            .paragraph("${finding_severity}")
            .paragraph("${finding_description}")
            .build();
        let report = sample_report();
        let assembly = assembler().assemble(&template, &report, &budget()).unwrap();
        assert_eq!(assembly.plan.methodologies.label(), "block-clone");
        assert_eq!(assembly.plan.findings.label(), "aggregate-text");

        let text = extract_text(&assembly.bytes);
        assert!(text.starts_with("Reconnaissance\nPassive and active discovery\nExploitation"));
        for finding in &report.findings {
            assert_eq!(text.matches(finding.name.as_str()).count(), 1);
        }
        assert!(!text.contains("${"));
    }

    #[test]
    fn evidence_rows_expand_per_finding() {
        let template = TemplateBuilder::new()
            .paragraph("${block_findings}")
            .paragraph("${finding_name}: ${finding_evidence}")
            .table(&[&["${evidence_name}"]])
            .paragraph("${/block_findings}")
            .build();
        let assembly = assembler().assemble(&template, &sample_report(), &budget()).unwrap();
        let text = extract_text(&assembly.bytes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "SQL Injection in login: sqlmap-output.txt, login-request.png",
                "sqlmap-output.txt",
                "login-request.png",
                "Outdated TLS configuration: sslscan.txt",
                "sslscan.txt",
                "Verbose server banner: Evidence not included",
            ]
        );
    }

    #[test]
    fn indexed_slots_fill_and_clear() {
        let template = TemplateBuilder::new()
            .paragraph("${finding_name_1} / ${finding_severity_1}")
            .paragraph("${finding_name_2} / ${finding_severity_2}")
            .paragraph("${finding_name_3} / ${finding_severity_3}")
            .build();
        let report = report_with_findings(2);
        let assembly = assembler().assemble(&template, &report, &budget()).unwrap();
        assert_eq!(
            extract_text(&assembly.bytes),
            "Finding 000 / Critical\nFinding 001 / High\n / "
        );
    }

    #[test]
    fn hash_and_zero_based_slots_fill() {
        let template = TemplateBuilder::new()
            .paragraph("${finding_name#1}|${finding_severity#1}")
            .paragraph("${finding_name#2}")
            .build();
        let assembly = assembler()
            .assemble(&template, &report_with_findings(2), &budget())
            .unwrap();
        assert_eq!(extract_text(&assembly.bytes), "Finding 000|Critical\nFinding 001");

        let template = TemplateBuilder::new()
            .paragraph("${finding_name_0} (${finding_severity_0})")
            .paragraph("${finding_name_1}")
            .build();
        let assembly = assembler()
            .assemble(&template, &report_with_findings(1), &budget())
            .unwrap();
        assert_eq!(extract_text(&assembly.bytes), "Finding 000 (Critical)\n");
    }

    #[test]
    fn surplus_records_are_reported_as_misses() {
        let template = TemplateBuilder::new()
            .paragraph("${finding_name_1}")
            .paragraph("${finding_name_2}")
            .build();
        let assembly = assembler()
            .assemble(&template, &report_with_findings(4), &budget())
            .unwrap();
        assert_eq!(extract_text(&assembly.bytes), "Finding 000\nFinding 001");
        assert!(assembly.misses.contains(&"findings[3]".to_string()));
        assert!(assembly.misses.contains(&"findings[4]".to_string()));
    }

    #[test]
    fn split_placeholders_are_repaired_before_binding() {
        let template = TemplateBuilder::new()
            .split_paragraph(&["Title: $", "{report_", "title}"])
            .split_paragraph(&["${client_", "name}"])
            .build();
        let assembly = assembler().assemble(&template, &sample_report(), &budget()).unwrap();
        assert_eq!(
            extract_text(&assembly.bytes),
            "Title: External Network Assessment\nAcme Corp"
        );
    }

    #[test]
    fn inline_block_clones_within_paragraph() {
        let template = TemplateBuilder::new()
            .paragraph("Items: ${block_findings}[${finding_name}] ${/block_findings}done")
            .build();
        let assembly = assembler().assemble(&template, &sample_report(), &budget()).unwrap();
        assert_eq!(assembly.plan.findings.label(), "block-clone");
        assert_eq!(
            extract_text(&assembly.bytes),
            "Items: [SQL Injection in login] [Outdated TLS configuration] [Verbose server banner] done"
        );
    }

    #[test]
    fn placeholder_syntax_in_finding_name_is_kept() {
        let mut report = ReportDocument::new("rpt-l4s", "Log4Shell retest");
        report.findings = vec![FindingEntry::new("Log4Shell ${jndi:ldap://x/a}", Severity::Critical)];
        let template = TemplateBuilder::new().paragraph("${findings}").build();
        let assembly = assembler().assemble(&template, &report, &budget()).unwrap();
        let text = extract_text(&assembly.bytes);
        assert_eq!(text.matches("Log4Shell ${jndi:ldap://x/a}").count(), 1);
    }

    #[test]
    fn placeholder_syntax_in_summary_survives_sweep() {
        let mut report = sample_report();
        report.executive_summary = Some("Payload ${jndi:ldap://x/a} was accepted".into());
        let template = TemplateBuilder::new().paragraph("${executive_summary}").build();
        let assembly = assembler().assemble(&template, &report, &budget()).unwrap();
        assert_eq!(
            extract_text(&assembly.bytes),
            "Payload ${jndi:ldap://x/a} was accepted"
        );
    }

    #[test]
    fn methodology_text_is_not_rebound_by_findings() {
        let mut report = ReportDocument::new("rpt-ssti", "Template injection review");
        report.methodologies = vec![MethodologyEntry::new("Fuzzing", "Tested ${finding_name} injection", 1)];
        report.findings = vec![FindingEntry::new("SSTI", Severity::High)];
        let template = TemplateBuilder::new()
            .block("block_methodologies", &["${methodology_description}"])
            .paragraph("${finding_name}")
            .build();
        let assembly = assembler().assemble(&template, &report, &budget()).unwrap();
        let text = extract_text(&assembly.bytes);
        assert!(text.starts_with("Tested ${finding_name} injection\n"));
        assert_eq!(text.matches("SSTI").count(), 1);
    }

    #[test]
    fn row_clone_fills_table() {
        let template = TemplateBuilder::new()
            .table(&[&["Name", "Severity"], &["${finding_name}", "${finding_severity}"]])
            .build();
        let assembly = assembler().assemble(&template, &sample_report(), &budget()).unwrap();
        assert_eq!(
            extract_text(&assembly.bytes),
            "Name\nSeverity\nSQL Injection in login\nCritical\nOutdated TLS configuration\nMedium\nVerbose server banner\nLow"
        );
    }

    #[test]
    fn zero_findings_remove_block() {
        let template = TemplateBuilder::new()
            .paragraph("Before")
            .block("block_findings", &["${finding_name}"])
            .paragraph("After")
            .build();
        let assembly = assembler()
            .assemble(&template, &report_with_findings(0), &budget())
            .unwrap();
        assert_eq!(extract_text(&assembly.bytes), "Before\nAfter");
    }

    #[test]
    fn unbalanced_block_fails_assembly() {
        let template = TemplateBuilder::new()
            .paragraph("${block_findings}")
            .table(&[&["${finding_name}", "${/block_findings}"]])
            .build();
        let err = assembler()
            .assemble(&template, &sample_report(), &budget())
            .unwrap_err();
        let GenerationError::TemplateAssemblyFailed(inner) = err else {
            panic!("expected assembly failure");
        };
        assert!(matches!(*inner, GenerationError::BlockCloneFailure { .. }));
    }

    #[test]
    fn corrupt_template_is_malformed() {
        let err = assembler()
            .assemble(b"not a zip", &sample_report(), &budget())
            .unwrap_err();
        assert!(err.is_template_fault());
    }

    #[test]
    fn sweep_can_be_disabled() {
        let template = TemplateBuilder::new().paragraph("${unknown_field}").build();
        let assembler = DocumentAssembler::new(EngineConfig::new().with_clear_unbound(false));
        let assembly = assembler.assemble(&template, &sample_report(), &budget()).unwrap();
        assert_eq!(extract_text(&assembly.bytes), "${unknown_field}");
    }
}
