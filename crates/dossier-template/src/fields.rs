//! Logical fields and their accepted placeholder spellings
//!
//! Template authors are inconsistent, so each logical field accepts two to
//! four spellings. The first spelling present in a template wins.

use serde::Serialize;
use std::fmt;

/// A value the engine knows how to bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    ReportTitle,
    ClientName,
    ClientContact,
    ProjectName,
    ProjectStartDate,
    ProjectEndDate,
    ReportDate,
    ExecutiveSummary,
    FindingCount,
    MethodologyCount,
    CriticalCount,
    HighCount,
    MediumCount,
    LowCount,
    InformationalCount,

    MethodologyTitle,
    MethodologyBody,
    MethodologyNumber,

    FindingName,
    FindingSeverity,
    FindingDescription,
    FindingImpact,
    FindingRecommendations,
    FindingNumber,
    FindingEvidence,

    EvidenceName,
    EvidenceDescription,
}

impl LogicalField {
    /// Report-level scalars, bound once per document
    pub const REPORT: [LogicalField; 15] = [
        LogicalField::ReportTitle,
        LogicalField::ClientName,
        LogicalField::ClientContact,
        LogicalField::ProjectName,
        LogicalField::ProjectStartDate,
        LogicalField::ProjectEndDate,
        LogicalField::ReportDate,
        LogicalField::ExecutiveSummary,
        LogicalField::FindingCount,
        LogicalField::MethodologyCount,
        LogicalField::CriticalCount,
        LogicalField::HighCount,
        LogicalField::MediumCount,
        LogicalField::LowCount,
        LogicalField::InformationalCount,
    ];

    /// Per-evidence-file fields
    pub const EVIDENCE: [LogicalField; 2] =
        [LogicalField::EvidenceName, LogicalField::EvidenceDescription];

    /// Accepted placeholder names, in preference order
    #[must_use]
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            Self::ReportTitle => &["report_title", "title", "document_title"],
            Self::ClientName => &["client_name", "client", "company_name", "customer_name"],
            Self::ClientContact => &["client_contact", "contact_name", "client_email"],
            Self::ProjectName => &["project_name", "project", "engagement_name"],
            Self::ProjectStartDate => &["project_start_date", "start_date", "testing_start"],
            Self::ProjectEndDate => &["project_end_date", "end_date", "testing_end"],
            Self::ReportDate => &["report_date", "date", "generation_date", "generated_date"],
            Self::ExecutiveSummary => &["executive_summary", "summary", "report_summary"],
            Self::FindingCount => &["finding_count", "total_findings", "vulnerability_count"],
            Self::MethodologyCount => &["methodology_count", "total_methodologies"],
            Self::CriticalCount => &["critical_count", "critical_findings"],
            Self::HighCount => &["high_count", "high_findings"],
            Self::MediumCount => &["medium_count", "medium_findings"],
            Self::LowCount => &["low_count", "low_findings"],
            Self::InformationalCount => &["info_count", "informational_count", "info_findings"],

            Self::MethodologyTitle => &["methodology_title", "methodology_name", "method_title"],
            Self::MethodologyBody => &[
                "methodology_description",
                "methodology_body",
                "methodology_content",
            ],
            Self::MethodologyNumber => &["methodology_number", "methodology_index", "methodology_order"],

            Self::FindingName => &["finding_name", "finding_title", "vulnerability_name"],
            Self::FindingSeverity => &["finding_severity", "vulnerability_severity", "severity"],
            Self::FindingDescription => &[
                "finding_description",
                "vulnerability_description",
                "description",
            ],
            Self::FindingImpact => &["finding_impact", "vulnerability_impact", "impact"],
            Self::FindingRecommendations => &[
                "finding_recommendations",
                "finding_recommendation",
                "vulnerability_recommendations",
                "recommendations",
            ],
            Self::FindingNumber => &["finding_number", "finding_index", "finding_id"],
            Self::FindingEvidence => &["finding_evidence", "vulnerability_evidence", "evidence"],

            Self::EvidenceName => &["evidence_name", "evidence_file", "evidence_filename"],
            Self::EvidenceDescription => &["evidence_description", "evidence_caption"],
        }
    }

    /// Text bound when the source value is absent or blank
    #[must_use]
    pub fn default_text(&self) -> &'static str {
        match self {
            Self::ReportTitle => "Untitled report",
            Self::ExecutiveSummary => "No executive summary provided",
            Self::MethodologyTitle => "Untitled methodology",
            Self::MethodologyBody => "No description provided",
            Self::FindingName => "Untitled finding",
            Self::FindingDescription => "No description provided",
            Self::FindingImpact => "No impact provided",
            Self::FindingRecommendations => "No recommendations provided",
            Self::FindingEvidence => "No evidence attached",
            Self::EvidenceDescription => "No description provided",
            Self::FindingCount
            | Self::MethodologyCount
            | Self::CriticalCount
            | Self::HighCount
            | Self::MediumCount
            | Self::LowCount
            | Self::InformationalCount => "0",
            _ => "Not specified",
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.candidates()[0])
    }
}

/// A repeating content family chosen for independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFamily {
    Methodologies,
    Findings,
}

impl ContentFamily {
    /// Both families, in rendering order
    pub const ALL: [ContentFamily; 2] = [ContentFamily::Methodologies, ContentFamily::Findings];

    /// Accepted block marker names
    #[must_use]
    pub fn block_markers(&self) -> &'static [&'static str] {
        match self {
            Self::Methodologies => &["block_methodologies", "methodologies_block", "methodology_block"],
            Self::Findings => &[
                "block_findings",
                "findings_block",
                "finding_block",
                "block_vulnerabilities",
            ],
        }
    }

    /// Base placeholder names, in preference order
    ///
    /// Dedicated list placeholders come first, then the primary per-record field.
    #[must_use]
    pub fn base_candidates(&self) -> &'static [&'static str] {
        match self {
            Self::Methodologies => &[
                "methodologies",
                "methodology_list",
                "methodology_title",
                "methodology_name",
            ],
            Self::Findings => &[
                "findings",
                "findings_list",
                "vulnerabilities",
                "finding_name",
                "finding_title",
                "vulnerability_name",
            ],
        }
    }

    /// Per-record fields
    #[must_use]
    pub fn fields(&self) -> &'static [LogicalField] {
        match self {
            Self::Methodologies => &[
                LogicalField::MethodologyNumber,
                LogicalField::MethodologyTitle,
                LogicalField::MethodologyBody,
            ],
            Self::Findings => &[
                LogicalField::FindingNumber,
                LogicalField::FindingName,
                LogicalField::FindingSeverity,
                LogicalField::FindingDescription,
                LogicalField::FindingImpact,
                LogicalField::FindingRecommendations,
                LogicalField::FindingEvidence,
            ],
        }
    }

    /// Text used when the family has no records
    #[must_use]
    pub fn empty_text(&self) -> &'static str {
        match self {
            Self::Methodologies => "No methodologies recorded",
            Self::Findings => "No findings recorded",
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Methodologies => "methodologies",
            Self::Findings => "findings",
        }
    }
}

impl fmt::Display for ContentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_field_has_two_to_four_spellings() {
        let all = LogicalField::REPORT
            .iter()
            .chain(ContentFamily::Findings.fields())
            .chain(ContentFamily::Methodologies.fields())
            .chain(LogicalField::EVIDENCE.iter());
        for field in all {
            let n = field.candidates().len();
            assert!((2..=4).contains(&n), "{field:?} has {n} spellings");
        }
    }

    #[test]
    fn spellings_do_not_collide_across_fields() {
        let mut seen = HashSet::new();
        let all = LogicalField::REPORT
            .iter()
            .chain(ContentFamily::Findings.fields())
            .chain(ContentFamily::Methodologies.fields())
            .chain(LogicalField::EVIDENCE.iter());
        for field in all {
            for name in field.candidates() {
                assert!(seen.insert(*name), "{name} used twice");
            }
        }
    }

    #[test]
    fn base_candidates_include_primary_field() {
        let bases = ContentFamily::Findings.base_candidates();
        for name in LogicalField::FindingName.candidates() {
            assert!(bases.contains(name));
        }
    }

    #[test]
    fn display_uses_canonical_spelling() {
        assert_eq!(LogicalField::FindingSeverity.to_string(), "finding_severity");
    }
}
