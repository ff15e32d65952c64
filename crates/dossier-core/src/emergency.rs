//! Last-resort markup composer
//!
//! Renders the report as one self-contained HTML page: inline style, no
//! external assets, no container format. Only string formatting happens
//! here, so the stage fails only if the store cannot write the result.

use crate::composer::Composer;
use crate::content::{evidence_text, family_records, field_label, report_values, RecordValues};
use crate::error::GenerationError;
use chrono::Utc;
use dossier_model::{ArtifactFormat, ReportDocument};
use dossier_template::{ContentFamily, LogicalField};
use std::fmt::Write as _;

/// Escape text for HTML
fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaped text with line breaks kept
fn esc_lines(s: &str) -> String {
    esc(s).replace("\r\n", "\n").replace('\n', "<br>")
}

struct HtmlBuilder {
    buf: String,
}

impl HtmlBuilder {
    fn new() -> Self {
        Self {
            buf: String::with_capacity(16 * 1024),
        }
    }

    fn start(&mut self, title: &str) {
        let _ = write!(
            self.buf,
            "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
             <title>{}</title>\
             <style>\
             body{{font-family:Arial,Helvetica,sans-serif;margin:24px;max-width:60em}}\
             h1,h2,h3{{margin:0.4em 0}}\
             .muted{{opacity:0.8}}\
             .banner{{padding:8px;border:1px solid #c60;background:#fff4e5}}\
             table{{border-collapse:collapse}}\
             td,th{{padding:4px 8px;border:1px solid #ccc;text-align:left}}\
             </style></head><body>",
            esc(title)
        );
    }

    fn finish(mut self) -> String {
        self.buf.push_str("</body></html>");
        self.buf
    }

    fn banner(&mut self) {
        self.buf.push_str(
            "<p class=\"banner\">This is a simplified rendering produced because the \
             formatted document could not be generated.</p>",
        );
    }

    fn heading(&mut self, level: u8, text: &str) {
        let _ = write!(self.buf, "<h{level}>{}</h{level}>", esc(text));
    }

    fn paragraph(&mut self, text: &str) {
        let _ = write!(self.buf, "<p>{}</p>", esc_lines(text));
    }

    fn key_values<'b, I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (&'b str, &'b str)>,
    {
        self.buf.push_str("<ul>");
        for (k, v) in items {
            let _ = write!(self.buf, "<li><b>{}</b>: {}</li>", esc(k), esc_lines(v));
        }
        self.buf.push_str("</ul>");
    }

    fn table(&mut self, header: &[&str], rows: &[Vec<&str>]) {
        self.buf.push_str("<table><thead><tr>");
        for cell in header {
            let _ = write!(self.buf, "<th>{}</th>", esc(cell));
        }
        self.buf.push_str("</tr></thead><tbody>");
        for row in rows {
            self.buf.push_str("<tr>");
            for cell in row {
                let _ = write!(self.buf, "<td>{}</td>", esc(cell));
            }
            self.buf.push_str("</tr>");
        }
        self.buf.push_str("</tbody></table>");
    }
}

/// Composes the `emergency-html` format
#[derive(Debug, Clone)]
pub struct EmergencyComposer {
    date_format: String,
}

impl EmergencyComposer {
    #[must_use]
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    /// Full page for `report`
    #[must_use]
    pub fn render(&self, report: &ReportDocument) -> String {
        let scalars = report_values(report, &self.date_format, Utc::now().date_naive());
        let scalar = |field: LogicalField| value_of(&scalars, field);

        let mut h = HtmlBuilder::new();
        h.start(scalar(LogicalField::ReportTitle));
        h.banner();
        h.heading(1, scalar(LogicalField::ReportTitle));
        h.key_values([
            ("Client", scalar(LogicalField::ClientName)),
            ("Project", scalar(LogicalField::ProjectName)),
            ("Report date", scalar(LogicalField::ReportDate)),
        ]);

        h.heading(2, "Executive Summary");
        h.paragraph(scalar(LogicalField::ExecutiveSummary));

        h.heading(2, "Methodology");
        let methodologies = family_records(report, ContentFamily::Methodologies);
        if methodologies.is_empty() {
            h.paragraph(ContentFamily::Methodologies.empty_text());
        }
        for values in &methodologies {
            h.heading(3, value_of(values, LogicalField::MethodologyTitle));
            h.paragraph(value_of(values, LogicalField::MethodologyBody));
        }

        h.heading(2, "Findings");
        let findings = family_records(report, ContentFamily::Findings);
        if findings.is_empty() {
            h.paragraph(ContentFamily::Findings.empty_text());
        } else {
            let rows: Vec<Vec<&str>> = findings
                .iter()
                .map(|values| {
                    vec![
                        value_of(values, LogicalField::FindingNumber),
                        value_of(values, LogicalField::FindingName),
                        value_of(values, LogicalField::FindingSeverity),
                    ]
                })
                .collect();
            h.table(&["#", "Finding", "Severity"], &rows);

            for (finding, values) in report.ordered_findings().iter().zip(&findings) {
                h.heading(
                    3,
                    &format!(
                        "{}. {}",
                        value_of(values, LogicalField::FindingNumber),
                        value_of(values, LogicalField::FindingName)
                    ),
                );
                let evidence = evidence_text(finding);
                h.key_values([
                    LogicalField::FindingSeverity,
                    LogicalField::FindingDescription,
                    LogicalField::FindingImpact,
                    LogicalField::FindingRecommendations,
                ]
                .into_iter()
                .map(|field| (field_label(field), value_of(values, field)))
                .chain(std::iter::once((
                    field_label(LogicalField::FindingEvidence),
                    evidence
                        .as_deref()
                        .unwrap_or_else(|| LogicalField::FindingEvidence.default_text()),
                ))));
            }
        }

        h.finish()
    }
}

impl Composer for EmergencyComposer {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::EmergencyHtml
    }

    fn compose(&self, report: &ReportDocument) -> Result<Vec<u8>, GenerationError> {
        Ok(self.render(report).into_bytes())
    }
}

fn value_of(values: &RecordValues, field: LogicalField) -> &str {
    values
        .iter()
        .find(|(f, _)| *f == field)
        .map_or_else(|| field.default_text(), |(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_test_utils::sample_report;

    #[test]
    fn page_is_self_contained() {
        let html = EmergencyComposer::new("%Y-%m-%d").render(&sample_report());
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.ends_with("</body></html>"));
        assert!(!html.contains("src="));
        assert!(!html.contains("href="));
    }

    #[test]
    fn content_is_escaped() {
        let mut report = ReportDocument::new("r", "A <b> & C");
        report.executive_summary = Some("line one\nline two".into());
        let html = EmergencyComposer::new("%Y").render(&report);
        assert!(html.contains("A &lt;b&gt; &amp; C"));
        assert!(html.contains("line one<br>line two"));
    }

    #[test]
    fn every_finding_is_listed_in_order() {
        let html = EmergencyComposer::new("%Y").render(&sample_report());
        let a = html.find("1. SQL Injection in login").unwrap();
        let b = html.find("2. Outdated TLS configuration").unwrap();
        let c = html.find("3. Verbose server banner").unwrap();
        assert!(a < b && b < c);
        assert!(html.contains("Evidence not included"));
    }
}
