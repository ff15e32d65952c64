use dossier_core::{DocumentAssembler, EngineConfig, ExecutionBudget};
use dossier_model::{FindingEntry, ReportDocument, Severity};
use dossier_test_utils::{extract_text, report_with_findings, TemplateBuilder};
use proptest::prelude::*;
use std::time::Duration;

fn assemble(template: &[u8], report: &ReportDocument) -> String {
    let assembler = DocumentAssembler::new(EngineConfig::new());
    let budget = ExecutionBudget::start(Duration::from_secs(60));
    let assembly = assembler.assemble(template, report, &budget).unwrap();
    extract_text(&assembly.bytes)
}

fn named_report(names: &[String]) -> ReportDocument {
    let mut report = ReportDocument::new("prop", "Property report");
    report.findings = names
        .iter()
        .enumerate()
        .map(|(i, name)| FindingEntry::new(format!("F{i}-{name}"), Severity::Medium))
        .collect();
    report
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn finding_block_clones_once_per_finding(n in 0usize..12) {
        let template = TemplateBuilder::new()
            .paragraph("Before")
            .block("block_findings", &["${finding_name}"])
            .paragraph("After")
            .build();
        let report = report_with_findings(n);
        let text = assemble(&template, &report);

        let mut expected = vec!["Before".to_string()];
        expected.extend(report.findings.iter().map(|f| f.name.clone()));
        expected.push("After".to_string());
        prop_assert_eq!(text.lines().map(str::to_string).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn aggregate_names_each_finding_once_in_order(
        names in prop::collection::vec("[A-Za-z &<>${}]{1,16}", 0..8)
    ) {
        let template = TemplateBuilder::new()
            .paragraph("${findings}")
            .build();
        let report = named_report(&names);
        let text = assemble(&template, &report);

        if report.findings.is_empty() {
            prop_assert_eq!(text, "No findings recorded");
        } else {
            let mut last = 0;
            for finding in &report.findings {
                prop_assert_eq!(text.matches(finding.name.as_str()).count(), 1);
                let at = text.find(finding.name.as_str()).unwrap();
                prop_assert!(at >= last);
                last = at;
            }
        }
    }
}
