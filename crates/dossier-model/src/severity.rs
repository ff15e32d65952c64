//! Finding severity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity rating attached to a finding
///
/// Parsed leniently from whatever the report-management side stored; text
/// that does not name a known rating becomes [`Severity::Unrated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    /// Critical
    Critical,
    /// High
    High,
    /// Medium
    Medium,
    /// Low
    Low,
    /// Informational
    Informational,
    /// No rating supplied
    #[default]
    Unrated,
}

impl Severity {
    /// All ratings, most severe first
    pub const ALL: [Severity; 6] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Informational,
        Severity::Unrated,
    ];

    /// Parse free text case-insensitively
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" | "crit" | "p1" => Self::Critical,
            "high" | "p2" => Self::High,
            "medium" | "moderate" | "med" | "p3" => Self::Medium,
            "low" | "p4" => Self::Low,
            "info" | "informational" | "information" | "none" => Self::Informational,
            _ => Self::Unrated,
        }
    }

    /// Display label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Informational => "Informational",
            Self::Unrated => "Not specified",
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-severity finding counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub informational: usize,
    pub unrated: usize,
}

impl SeverityCounts {
    /// Add one finding of `severity`
    pub fn record(&mut self, severity: Severity) {
        let slot = match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
            Severity::Informational => &mut self.informational,
            Severity::Unrated => &mut self.unrated,
        };
        *slot += 1;
    }

    /// Count for a single rating
    #[must_use]
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Informational => self.informational,
            Severity::Unrated => self.unrated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Severity::parse_lenient("HIGH"), Severity::High);
        assert_eq!(Severity::parse_lenient(" Moderate "), Severity::Medium);
        assert_eq!(Severity::parse_lenient("info"), Severity::Informational);
    }

    #[test]
    fn unknown_text_is_unrated() {
        assert_eq!(Severity::parse_lenient("spicy"), Severity::Unrated);
        assert_eq!(Severity::Unrated.label(), "Not specified");
    }

    #[test]
    fn counts_accumulate() {
        let mut counts = SeverityCounts::default();
        counts.record(Severity::High);
        counts.record(Severity::High);
        counts.record(Severity::Low);
        assert_eq!(counts.get(Severity::High), 2);
        assert_eq!(counts.get(Severity::Low), 1);
        assert_eq!(counts.get(Severity::Critical), 0);
    }
}
