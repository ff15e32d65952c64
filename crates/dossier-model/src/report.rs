//! Report snapshot types
//!
//! A [`ReportDocument`] is the immutable input of one generation run. It is
//! owned by the report-management side; the engine only reads it.

use crate::severity::{Severity, SeverityCounts};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// External report identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub String);

impl ReportId {
    /// Create from anything string-like
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Client the report is written for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub contact: Option<String>,
}

/// Project the report covers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// One methodology section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodologyEntry {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Rendering position; ties keep input order
    #[serde(default)]
    pub order: u32,
}

impl MethodologyEntry {
    /// Create entry
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>, order: u32) -> Self {
        Self {
            title: title.into(),
            body: Some(body.into()),
            order,
        }
    }
}

/// Reference to an uploaded evidence file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FileRef {
    /// Evidence reference by file name only
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            description: None,
        }
    }
}

/// One finding in rendering order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingEntry {
    pub name: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub recommendations: Option<String>,
    #[serde(default = "default_true")]
    pub evidence_included: bool,
    #[serde(default)]
    pub evidence_refs: Vec<FileRef>,
}

fn default_true() -> bool {
    true
}

impl FindingEntry {
    /// Create finding with only name and severity populated
    #[must_use]
    pub fn new(name: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            severity,
            description: None,
            impact: None,
            recommendations: None,
            evidence_included: true,
            evidence_refs: Vec::new(),
        }
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With impact
    #[must_use]
    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }

    /// With recommendations
    #[must_use]
    pub fn with_recommendations(mut self, recommendations: impl Into<String>) -> Self {
        self.recommendations = Some(recommendations.into());
        self
    }

    /// With evidence files
    #[must_use]
    pub fn with_evidence(mut self, refs: Vec<FileRef>) -> Self {
        self.evidence_refs = refs;
        self
    }

    /// Exclude evidence from rendering
    #[must_use]
    pub fn without_evidence(mut self) -> Self {
        self.evidence_included = false;
        self
    }

    /// Evidence files that should be rendered
    ///
    /// Empty when the finding opted out of evidence.
    #[must_use]
    pub fn rendered_evidence(&self) -> &[FileRef] {
        if self.evidence_included {
            &self.evidence_refs
        } else {
            &[]
        }
    }
}

/// Immutable report snapshot for one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub id: ReportId,
    pub title: String,
    #[serde(default)]
    pub executive_summary: Option<String>,
    #[serde(default)]
    pub client: ClientRef,
    #[serde(default)]
    pub project: ProjectRef,
    /// Date printed on the report; the generation date when absent
    #[serde(default)]
    pub report_date: Option<NaiveDate>,
    #[serde(default)]
    pub methodologies: Vec<MethodologyEntry>,
    #[serde(default)]
    pub findings: Vec<FindingEntry>,
    /// Compose from scratch even when a template is assigned
    #[serde(default)]
    pub generate_without_template: bool,
}

impl ReportDocument {
    /// Create an empty report
    #[must_use]
    pub fn new(id: impl Into<ReportId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            executive_summary: None,
            client: ClientRef::default(),
            project: ProjectRef::default(),
            report_date: None,
            methodologies: Vec::new(),
            findings: Vec::new(),
            generate_without_template: false,
        }
    }

    /// Methodologies sorted by `order`, stable for equal keys
    #[must_use]
    pub fn ordered_methodologies(&self) -> Vec<&MethodologyEntry> {
        let mut ordered: Vec<&MethodologyEntry> = self.methodologies.iter().collect();
        ordered.sort_by_key(|m| m.order);
        ordered
    }

    /// Findings in rendering order
    #[inline]
    #[must_use]
    pub fn ordered_findings(&self) -> &[FindingEntry] {
        &self.findings
    }

    /// Finding totals per severity
    #[must_use]
    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for finding in &self.findings {
            counts.record(finding.severity);
        }
        counts
    }
}

impl From<String> for ReportId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methodologies_sort_by_order_stably() {
        let mut report = ReportDocument::new("r1", "Report");
        report.methodologies = vec![
            MethodologyEntry::new("second", "b", 2),
            MethodologyEntry::new("first-a", "a", 1),
            MethodologyEntry::new("first-b", "a", 1),
        ];

        let titles: Vec<&str> = report
            .ordered_methodologies()
            .iter()
            .map(|m| m.title.as_str())
            .collect();
        assert_eq!(titles, vec!["first-a", "first-b", "second"]);
    }

    #[test]
    fn excluded_evidence_is_not_rendered() {
        let finding = FindingEntry::new("XSS", Severity::High)
            .with_evidence(vec![FileRef::named("shot.png")])
            .without_evidence();
        assert!(finding.rendered_evidence().is_empty());
    }

    #[test]
    fn deserializes_sparse_json() {
        let json = r#"{
            "id": "42",
            "title": "Q3 Assessment",
            "findings": [{"name": "SQLi", "severity": "High"}]
        }"#;
        let report: ReportDocument = serde_json::from_str(json).unwrap();
        assert_eq!(report.id.as_str(), "42");
        assert_eq!(report.findings[0].severity, Severity::High);
        assert!(report.findings[0].evidence_included);
        assert!(report.client.name.is_none());
    }

    proptest::proptest! {
        #[test]
        fn ordering_is_sorted_and_complete(orders in proptest::collection::vec(0u32..5, 0..24)) {
            let mut report = ReportDocument::new("r", "t");
            report.methodologies = orders
                .iter()
                .enumerate()
                .map(|(i, order)| MethodologyEntry::new(i.to_string(), "", *order))
                .collect();

            let ordered = report.ordered_methodologies();
            proptest::prop_assert_eq!(ordered.len(), orders.len());
            for pair in ordered.windows(2) {
                proptest::prop_assert!(pair[0].order <= pair[1].order);
                if pair[0].order == pair[1].order {
                    let a: usize = pair[0].title.parse().unwrap();
                    let b: usize = pair[1].title.parse().unwrap();
                    proptest::prop_assert!(a < b);
                }
            }
        }
    }

    #[test]
    fn severity_counts_cover_findings() {
        let mut report = ReportDocument::new("r1", "Report");
        report.findings = vec![
            FindingEntry::new("a", Severity::Critical),
            FindingEntry::new("b", Severity::Critical),
            FindingEntry::new("c", Severity::Low),
        ];
        let counts = report.severity_counts();
        assert_eq!(counts.critical, 2);
        assert_eq!(counts.low, 1);
    }
}
