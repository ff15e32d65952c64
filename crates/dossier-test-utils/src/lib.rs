//! Testing utilities for the dossier workspace
//!
//! In-memory template packages and sample reports.

#![allow(missing_docs)]

use chrono::NaiveDate;
use dossier_model::{
    ClientRef, FileRef, FindingEntry, MethodologyEntry, ProjectRef, ReportDocument, Severity,
};
use dossier_template::{write_archive, TemplatePackage, CONTENT_TYPES_PART, MAIN_PART, W_NS};

const W14_NS: &str = "http://schemas.microsoft.com/office/word/2010/wordml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Builds a minimal word-processing template in memory
///
/// Text is inserted verbatim, so placeholders like `${finding_name}` can be
/// written directly.
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    body: String,
    headers: Vec<String>,
    footers: Vec<String>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph with a single run
    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&paragraph_xml(&[text]));
        self
    }

    /// Paragraph with one run per piece, as an editor would split typed text
    pub fn split_paragraph(mut self, pieces: &[&str]) -> Self {
        self.body.push_str(&paragraph_xml(pieces));
        self
    }

    /// Table, one paragraph per cell
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl><w:tblPr/><w:tblGrid/>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in *row {
                self.body.push_str("<w:tc>");
                self.body.push_str(&paragraph_xml(&[*cell]));
                self.body.push_str("</w:tc>");
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    /// Marker paragraph, one paragraph per inner line, closing marker paragraph
    pub fn block(mut self, marker: &str, inner: &[&str]) -> Self {
        self = self.paragraph(&format!("${{{marker}}}"));
        for line in inner {
            self = self.paragraph(line);
        }
        self.paragraph(&format!("${{/{marker}}}"))
    }

    pub fn header(mut self, text: &str) -> Self {
        self.headers.push(text.to_string());
        self
    }

    pub fn footer(mut self, text: &str) -> Self {
        self.footers.push(text.to_string());
        self
    }

    /// Main document part
    pub fn document_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"{W_NS}\" xmlns:w14=\"{W14_NS}\"><w:body>{}<w:sectPr/></w:body></w:document>",
            self.body
        )
    }

    /// Container bytes
    pub fn build(&self) -> Vec<u8> {
        let main = self.document_xml();
        let mut parts: Vec<(String, String)> = vec![
            (CONTENT_TYPES_PART.to_string(), CONTENT_TYPES.to_string()),
            ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
            (MAIN_PART.to_string(), main),
        ];
        for (i, text) in self.headers.iter().enumerate() {
            parts.push((format!("word/header{}.xml", i + 1), side_part("hdr", text)));
        }
        for (i, text) in self.footers.iter().enumerate() {
            parts.push((format!("word/footer{}.xml", i + 1), side_part("ftr", text)));
        }
        write_archive(parts.iter().map(|(n, d)| (n.as_str(), d.as_bytes()))).unwrap()
    }
}

fn paragraph_xml(pieces: &[&str]) -> String {
    let runs: String = pieces
        .iter()
        .map(|piece| format!("<w:r><w:t xml:space=\"preserve\">{piece}</w:t></w:r>"))
        .collect();
    format!("<w:p w14:paraId=\"0F0F0F0F\">{runs}</w:p>")
}

fn side_part(root: &str, text: &str) -> String {
    format!(
        "<w:{root} xmlns:w=\"{W_NS}\" xmlns:w14=\"{W14_NS}\">{}</w:{root}>",
        paragraph_xml(&[text])
    )
}

/// Visible main-document text of a container, one line per paragraph
pub fn extract_text(bytes: &[u8]) -> String {
    TemplatePackage::open(bytes).unwrap().plain_text().unwrap()
}

/// Visible text of every editable part (body, headers, footers)
pub fn extract_all_text(bytes: &[u8]) -> String {
    let package = TemplatePackage::open(bytes).unwrap();
    package
        .editable_parts()
        .map(|(_, xml)| dossier_template::paragraph_texts(xml).unwrap().join("\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Report with 2 methodologies and 3 findings, the last without evidence
pub fn sample_report() -> ReportDocument {
    let mut report = ReportDocument::new("rpt-0001", "External Network Assessment");
    report.executive_summary = Some("Three issues were identified.\nOne is critical.".into());
    report.client = ClientRef {
        id: Some("c-1".into()),
        name: Some("Acme Corp".into()),
        contact: Some("Jane Doe".into()),
    };
    report.project = ProjectRef {
        id: Some("p-1".into()),
        name: Some("Perimeter Review".into()),
        start_date: NaiveDate::from_ymd_opt(2024, 3, 4),
        end_date: NaiveDate::from_ymd_opt(2024, 3, 15),
    };
    report.report_date = NaiveDate::from_ymd_opt(2024, 3, 20);
    report.methodologies = vec![
        MethodologyEntry::new("Exploitation", "Manual verification of candidates", 2),
        MethodologyEntry::new("Reconnaissance", "Passive and active discovery", 1),
    ];
    report.findings = vec![
        FindingEntry::new("SQL Injection in login", Severity::Critical)
            .with_description("The username parameter is concatenated into a query.")
            .with_impact("Full database compromise.")
            .with_recommendations("Use parameterised queries.")
            .with_evidence(vec![
                FileRef::named("sqlmap-output.txt"),
                FileRef::named("login-request.png"),
            ]),
        FindingEntry::new("Outdated TLS configuration", Severity::Medium)
            .with_description("TLS 1.0 is still accepted.")
            .with_evidence(vec![FileRef::named("sslscan.txt")]),
        FindingEntry::new("Verbose server banner", Severity::Low)
            .with_description("The server discloses its version.")
            .with_evidence(vec![FileRef::named("banner.txt")])
            .without_evidence(),
    ];
    report
}

/// Report with `n` generated findings of rotating severity
pub fn report_with_findings(n: usize) -> ReportDocument {
    let mut report = ReportDocument::new(format!("rpt-{n:04}"), format!("Report with {n} findings"));
    report.findings = (0..n)
        .map(|i| {
            let severity = Severity::ALL[i % Severity::ALL.len()];
            FindingEntry::new(format!("Finding {i:03}"), severity)
                .with_description(format!("Description of finding {i}"))
        })
        .collect();
    report
}
