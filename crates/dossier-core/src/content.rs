//! Report content as bindable text
//!
//! Every composer renders the same values; this module is where a report
//! record turns into (field, text) pairs and aggregate blobs.

use chrono::NaiveDate;
use dossier_model::{FileRef, FindingEntry, MethodologyEntry, ReportDocument};
use dossier_template::{resolve_text, ContentFamily, LogicalField};
use std::fmt::Write as _;

/// Bound into a finding's evidence field when evidence was opted out
pub const EVIDENCE_EXCLUDED: &str = "Evidence not included";

/// One record's resolved field values, in field order
pub type RecordValues = Vec<(LogicalField, String)>;

/// Format `date` with a strftime pattern, ISO form if the pattern is invalid
#[must_use]
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() {
        return date.to_string();
    }
    out
}

fn resolved(field: LogicalField, value: Option<&str>) -> (LogicalField, String) {
    (field, resolve_text(field, value).to_string())
}

/// Report-level scalar values
///
/// `today` is used when the report carries no date.
#[must_use]
pub fn report_values(report: &ReportDocument, date_format: &str, today: NaiveDate) -> RecordValues {
    let date = |d: Option<NaiveDate>| d.map(|d| format_date(d, date_format));
    let counts = report.severity_counts();
    let count = |n: usize| Some(n.to_string());

    vec![
        resolved(LogicalField::ReportTitle, Some(report.title.as_str())),
        resolved(LogicalField::ClientName, report.client.name.as_deref()),
        resolved(LogicalField::ClientContact, report.client.contact.as_deref()),
        resolved(LogicalField::ProjectName, report.project.name.as_deref()),
        resolved(
            LogicalField::ProjectStartDate,
            date(report.project.start_date).as_deref(),
        ),
        resolved(
            LogicalField::ProjectEndDate,
            date(report.project.end_date).as_deref(),
        ),
        resolved(
            LogicalField::ReportDate,
            Some(format_date(report.report_date.unwrap_or(today), date_format).as_str()),
        ),
        resolved(LogicalField::ExecutiveSummary, report.executive_summary.as_deref()),
        resolved(LogicalField::FindingCount, count(report.findings.len()).as_deref()),
        resolved(
            LogicalField::MethodologyCount,
            count(report.methodologies.len()).as_deref(),
        ),
        resolved(LogicalField::CriticalCount, count(counts.critical).as_deref()),
        resolved(LogicalField::HighCount, count(counts.high).as_deref()),
        resolved(LogicalField::MediumCount, count(counts.medium).as_deref()),
        resolved(LogicalField::LowCount, count(counts.low).as_deref()),
        resolved(
            LogicalField::InformationalCount,
            count(counts.informational).as_deref(),
        ),
    ]
}

/// Values of the methodology at one-based `number`
#[must_use]
pub fn methodology_values(number: usize, methodology: &MethodologyEntry) -> RecordValues {
    vec![
        resolved(LogicalField::MethodologyNumber, Some(number.to_string().as_str())),
        resolved(LogicalField::MethodologyTitle, Some(methodology.title.as_str())),
        resolved(LogicalField::MethodologyBody, methodology.body.as_deref()),
    ]
}

/// Values of the finding at one-based `number`
#[must_use]
pub fn finding_values(number: usize, finding: &FindingEntry) -> RecordValues {
    vec![
        resolved(LogicalField::FindingNumber, Some(number.to_string().as_str())),
        resolved(LogicalField::FindingName, Some(finding.name.as_str())),
        resolved(LogicalField::FindingSeverity, Some(finding.severity.label())),
        resolved(LogicalField::FindingDescription, finding.description.as_deref()),
        resolved(LogicalField::FindingImpact, finding.impact.as_deref()),
        resolved(
            LogicalField::FindingRecommendations,
            finding.recommendations.as_deref(),
        ),
        resolved(LogicalField::FindingEvidence, evidence_text(finding).as_deref()),
    ]
}

/// Values of one evidence file
#[must_use]
pub fn evidence_values(file: &FileRef) -> RecordValues {
    vec![
        resolved(LogicalField::EvidenceName, Some(file.name.as_str())),
        resolved(LogicalField::EvidenceDescription, file.description.as_deref()),
    ]
}

/// Evidence summary of a finding; `None` when it has no files
#[must_use]
pub fn evidence_text(finding: &FindingEntry) -> Option<String> {
    if !finding.evidence_included {
        return Some(EVIDENCE_EXCLUDED.to_string());
    }
    if finding.evidence_refs.is_empty() {
        return None;
    }
    Some(
        finding
            .evidence_refs
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Per-record values of a family, in rendering order
#[must_use]
pub fn family_records(report: &ReportDocument, family: ContentFamily) -> Vec<RecordValues> {
    match family {
        ContentFamily::Methodologies => report
            .ordered_methodologies()
            .into_iter()
            .enumerate()
            .map(|(i, m)| methodology_values(i + 1, m))
            .collect(),
        ContentFamily::Findings => report
            .ordered_findings()
            .iter()
            .enumerate()
            .map(|(i, f)| finding_values(i + 1, f))
            .collect(),
    }
}

/// One-line summary of a record, used for list placeholders
#[must_use]
pub fn record_line(family: ContentFamily, values: &RecordValues) -> String {
    let get = |field: LogicalField| {
        values
            .iter()
            .find(|(f, _)| *f == field)
            .map_or("", |(_, v)| v.as_str())
    };
    match family {
        ContentFamily::Methodologies => get(LogicalField::MethodologyTitle).to_string(),
        ContentFamily::Findings => format!(
            "{} ({})",
            get(LogicalField::FindingName),
            get(LogicalField::FindingSeverity)
        ),
    }
}

/// Every record of a family as one formatted text blob
///
/// Each record's name appears exactly once, records in input order.
#[must_use]
pub fn aggregate_text(report: &ReportDocument, family: ContentFamily) -> String {
    let records = family_records(report, family);
    if records.is_empty() {
        return family.empty_text().to_string();
    }
    let blocks: Vec<String> = records
        .iter()
        .map(|values| {
            let mut lines = Vec::with_capacity(values.len());
            let mut number = String::new();
            for (field, value) in values {
                match field {
                    LogicalField::MethodologyNumber | LogicalField::FindingNumber => {
                        number.clone_from(value);
                    }
                    LogicalField::MethodologyTitle | LogicalField::FindingName => {
                        lines.push(format!("{number}. {value}"));
                    }
                    LogicalField::MethodologyBody => lines.push(value.clone()),
                    other => lines.push(format!("{}: {value}", field_label(*other))),
                }
            }
            lines.join("\n")
        })
        .collect();
    blocks.join("\n\n")
}

/// Human label of a per-record field
#[must_use]
pub fn field_label(field: LogicalField) -> &'static str {
    match field {
        LogicalField::FindingSeverity => "Severity",
        LogicalField::FindingDescription | LogicalField::EvidenceDescription => "Description",
        LogicalField::FindingImpact => "Impact",
        LogicalField::FindingRecommendations => "Recommendations",
        LogicalField::FindingEvidence => "Evidence",
        LogicalField::EvidenceName => "File",
        _ => "Value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_model::Severity;
    use dossier_test_utils::sample_report;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn report_values_format_dates_and_counts() {
        let values = report_values(&sample_report(), "%Y-%m-%d", today());
        let get = |f: LogicalField| values.iter().find(|(x, _)| *x == f).unwrap().1.clone();
        assert_eq!(get(LogicalField::ReportDate), "2024-03-20");
        assert_eq!(get(LogicalField::ProjectStartDate), "2024-03-04");
        assert_eq!(get(LogicalField::FindingCount), "3");
        assert_eq!(get(LogicalField::CriticalCount), "1");
        assert_eq!(get(LogicalField::HighCount), "0");
    }

    #[test]
    fn missing_values_use_defaults() {
        let report = ReportDocument::new("r", "Empty");
        let values = report_values(&report, "%Y", today());
        let get = |f: LogicalField| values.iter().find(|(x, _)| *x == f).unwrap().1.clone();
        assert_eq!(get(LogicalField::ClientName), "Not specified");
        assert_eq!(get(LogicalField::ExecutiveSummary), "No executive summary provided");
        assert_eq!(get(LogicalField::ReportDate), "2024");
    }

    #[test]
    fn excluded_evidence_is_labelled() {
        let report = sample_report();
        assert_eq!(
            evidence_text(&report.findings[2]).as_deref(),
            Some(EVIDENCE_EXCLUDED)
        );
        assert_eq!(
            evidence_text(&report.findings[0]).as_deref(),
            Some("sqlmap-output.txt, login-request.png")
        );
        let bare = FindingEntry::new("x", Severity::Low);
        assert_eq!(evidence_text(&bare), None);
    }

    #[test]
    fn methodologies_follow_order_field() {
        let records = family_records(&sample_report(), ContentFamily::Methodologies);
        assert_eq!(records[0][1].1, "Reconnaissance");
        assert_eq!(records[0][0].1, "1");
        assert_eq!(records[1][1].1, "Exploitation");
    }

    #[test]
    fn aggregate_lists_findings_in_order() {
        let text = aggregate_text(&sample_report(), ContentFamily::Findings);
        let sqli = text.find("1. SQL Injection in login").unwrap();
        let tls = text.find("2. Outdated TLS configuration").unwrap();
        let banner = text.find("3. Verbose server banner").unwrap();
        assert!(sqli < tls && tls < banner);
        assert!(text.contains("Severity: Critical"));
        assert!(text.contains("Evidence: Evidence not included"));
    }

    #[test]
    fn empty_family_aggregates_to_placeholder_text() {
        let report = ReportDocument::new("r", "Empty");
        assert_eq!(
            aggregate_text(&report, ContentFamily::Findings),
            "No findings recorded"
        );
    }

    #[test]
    fn invalid_pattern_falls_back_to_iso() {
        assert_eq!(format_date(today(), "%Q"), "2024-01-01");
    }
}
