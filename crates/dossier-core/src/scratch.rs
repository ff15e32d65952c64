//! Fixed-layout document composer
//!
//! Writes a complete word-processing container from the report alone:
//! title page, executive summary, methodology list, findings summary table
//! and one section per finding. No template is read, so nothing here can
//! fail on template structure.

use crate::composer::Composer;
use crate::content::{evidence_text, family_records, field_label, report_values, RecordValues};
use crate::error::GenerationError;
use chrono::{SecondsFormat, Utc};
use dossier_model::{ArtifactFormat, ReportDocument};
use dossier_template::{
    escape_text, text_fragment, write_archive, ContentFamily, LogicalField, CONTENT_TYPES_PART,
    MAIN_PART, W_NS,
};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="56"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:pPr><w:keepNext/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4"/><w:left w:val="single" w:sz="4"/><w:bottom w:val="single" w:sz="4"/><w:right w:val="single" w:sz="4"/><w:insideH w:val="single" w:sz="4"/><w:insideV w:val="single" w:sz="4"/></w:tblBorders></w:tblPr></w:style></w:styles>"#;

/// Composes the fixed-layout `scratch-docx` format
#[derive(Debug, Clone)]
pub struct ScratchComposer {
    date_format: String,
}

impl ScratchComposer {
    #[must_use]
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    /// Main document part for `report`
    #[must_use]
    pub fn document_xml(&self, report: &ReportDocument) -> String {
        let scalars = report_values(report, &self.date_format, Utc::now().date_naive());
        let scalar = |field: LogicalField| value_of(&scalars, field);

        let mut body = BodyWriter::new();

        body.styled("Title", scalar(LogicalField::ReportTitle));
        body.paragraph(&format!("Client: {}", scalar(LogicalField::ClientName)));
        body.paragraph(&format!("Project: {}", scalar(LogicalField::ProjectName)));
        body.paragraph(&format!(
            "Testing period: {} to {}",
            scalar(LogicalField::ProjectStartDate),
            scalar(LogicalField::ProjectEndDate)
        ));
        body.paragraph(&format!("Report date: {}", scalar(LogicalField::ReportDate)));
        body.page_break();

        body.heading(1, "Executive Summary");
        body.paragraph(scalar(LogicalField::ExecutiveSummary));

        body.heading(1, "Methodology");
        let methodologies = family_records(report, ContentFamily::Methodologies);
        if methodologies.is_empty() {
            body.paragraph(ContentFamily::Methodologies.empty_text());
        }
        for values in &methodologies {
            body.heading(
                2,
                &format!(
                    "{}. {}",
                    value_of(values, LogicalField::MethodologyNumber),
                    value_of(values, LogicalField::MethodologyTitle)
                ),
            );
            body.paragraph(value_of(values, LogicalField::MethodologyBody));
        }

        body.heading(1, "Findings Summary");
        let findings = family_records(report, ContentFamily::Findings);
        if findings.is_empty() {
            body.paragraph(ContentFamily::Findings.empty_text());
        } else {
            let mut rows = vec![vec!["#".to_string(), "Finding".to_string(), "Severity".to_string()]];
            rows.extend(findings.iter().map(|values| {
                vec![
                    value_of(values, LogicalField::FindingNumber).to_string(),
                    value_of(values, LogicalField::FindingName).to_string(),
                    value_of(values, LogicalField::FindingSeverity).to_string(),
                ]
            }));
            body.table(&rows);

            body.heading(1, "Findings");
            for (finding, values) in report.ordered_findings().iter().zip(&findings) {
                body.heading(
                    2,
                    &format!(
                        "{}. {}",
                        value_of(values, LogicalField::FindingNumber),
                        value_of(values, LogicalField::FindingName)
                    ),
                );
                for field in [
                    LogicalField::FindingSeverity,
                    LogicalField::FindingDescription,
                    LogicalField::FindingImpact,
                    LogicalField::FindingRecommendations,
                ] {
                    body.heading(3, field_label(field));
                    body.paragraph(value_of(values, field));
                }
                body.heading(3, field_label(LogicalField::FindingEvidence));
                match finding.rendered_evidence() {
                    [] => body.paragraph(
                        evidence_text(finding)
                            .as_deref()
                            .unwrap_or_else(|| LogicalField::FindingEvidence.default_text()),
                    ),
                    files => {
                        for file in files {
                            let line = match file.description.as_deref() {
                                Some(description) if !description.trim().is_empty() => {
                                    format!("{}: {description}", file.name)
                                }
                                _ => file.name.clone(),
                            };
                            body.paragraph(&line);
                        }
                    }
                }
            }
        }

        body.finish()
    }
}

impl Composer for ScratchComposer {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::ScratchDocx
    }

    fn compose(&self, report: &ReportDocument) -> Result<Vec<u8>, GenerationError> {
        let document = self.document_xml(report);
        let core = core_properties(&report.title);
        let parts: [(&str, &[u8]); 6] = [
            (CONTENT_TYPES_PART, CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            (MAIN_PART, document.as_bytes()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
            ("word/styles.xml", STYLES.as_bytes()),
            ("docProps/core.xml", core.as_bytes()),
        ];
        let bytes =
            write_archive(parts).map_err(|e| GenerationError::Serialization(e.to_string()))?;
        tracing::debug!(report_id = %report.id, bytes = bytes.len(), "composed scratch document");
        Ok(bytes)
    }
}

fn value_of(values: &RecordValues, field: LogicalField) -> &str {
    values
        .iter()
        .find(|(f, _)| *f == field)
        .map_or_else(|| field.default_text(), |(_, v)| v.as_str())
}

fn core_properties(title: &str) -> String {
    let created = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
         <dc:title>{}</dc:title><dc:creator>dossier</dc:creator>\
         <dcterms:created xsi:type=\"dcterms:W3CDTF\">{created}</dcterms:created>\
         </cp:coreProperties>",
        escape_text(title)
    )
}

/// Accumulates `w:body` content
struct BodyWriter {
    buf: String,
}

impl BodyWriter {
    fn new() -> Self {
        Self {
            buf: String::with_capacity(16 * 1024),
        }
    }

    fn run(text: &str) -> String {
        format!(
            "<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r>",
            text_fragment(text)
        )
    }

    fn paragraph(&mut self, text: &str) {
        self.buf.push_str("<w:p>");
        self.buf.push_str(&Self::run(text));
        self.buf.push_str("</w:p>");
    }

    fn styled(&mut self, style: &str, text: &str) {
        self.buf.push_str("<w:p><w:pPr><w:pStyle w:val=\"");
        self.buf.push_str(style);
        self.buf.push_str("\"/></w:pPr>");
        self.buf.push_str(&Self::run(text));
        self.buf.push_str("</w:p>");
    }

    fn heading(&mut self, level: u8, text: &str) {
        self.styled(&format!("Heading{level}"), text);
    }

    fn page_break(&mut self) {
        self.buf.push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>");
    }

    /// First row is the header row
    fn table(&mut self, rows: &[Vec<String>]) {
        self.buf.push_str(
            "<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/><w:tblW w:w=\"5000\" w:type=\"pct\"/></w:tblPr><w:tblGrid/>",
        );
        for (i, row) in rows.iter().enumerate() {
            self.buf.push_str("<w:tr>");
            if i == 0 {
                self.buf.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            for cell in row {
                self.buf.push_str("<w:tc><w:p>");
                self.buf.push_str(&Self::run(cell));
                self.buf.push_str("</w:p></w:tc>");
            }
            self.buf.push_str("</w:tr>");
        }
        self.buf.push_str("</w:tbl>");
    }

    fn finish(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"{W_NS}\"><w:body>{}<w:sectPr/></w:body></w:document>",
            self.buf
        )
    }
}
