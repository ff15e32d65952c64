//! Template container
//!
//! A [`TemplatePackage`] is the owned, in-memory form of a zip-based office
//! document. Every archive entry is kept in its original order; the markup
//! parts the engine edits (main document, headers, footers) are held as
//! decoded strings so mutation never re-reads the archive.

use crate::error::TemplateError;
use crate::markup;
use crate::normalize::repair_placeholders;
use indexmap::IndexMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Main document part
pub const MAIN_PART: &str = "word/document.xml";

/// Package content-type manifest
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// True for parts that may carry scalar placeholders
fn is_editable_part(name: &str) -> bool {
    if name == MAIN_PART {
        return true;
    }
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    !file.contains('/')
        && file.ends_with(".xml")
        && (file.starts_with("header") || file.starts_with("footer"))
}

/// Owned office-document container
#[derive(Debug, Clone)]
pub struct TemplatePackage {
    /// Raw archive entries in archive order
    entries: IndexMap<String, Vec<u8>>,
    /// Decoded editable markup, keyed by entry name
    markup: IndexMap<String, String>,
}

impl TemplatePackage {
    /// Open container bytes
    ///
    /// Editable parts are decoded and their split placeholders repaired.
    ///
    /// # Errors
    /// - `TemplateError::Zip` if the bytes are not a readable archive
    /// - `TemplateError::MissingPart` if the main document part is absent
    /// - `TemplateError::Encoding` if an editable part is not UTF-8
    /// - `TemplateError::Xml` if the main part is not well-formed
    pub fn open(bytes: &[u8]) -> Result<Self, TemplateError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = IndexMap::with_capacity(archive.len());
        let mut markup = IndexMap::new();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)?;

            if is_editable_part(&name) {
                let text = String::from_utf8(data.clone())
                    .map_err(|_| TemplateError::Encoding { part: name.clone() })?;
                markup.insert(name.clone(), repair_placeholders(&text).into_owned());
            }
            entries.insert(name, data);
        }

        let main = markup
            .get(MAIN_PART)
            .ok_or_else(|| TemplateError::MissingPart(MAIN_PART.to_string()))?;
        roxmltree::Document::parse(main)?;

        tracing::debug!(
            entries = entries.len(),
            editable = markup.len(),
            "opened template package"
        );
        Ok(Self { entries, markup })
    }

    /// Main document markup
    #[must_use]
    pub fn main_part(&self) -> &str {
        self.markup.get(MAIN_PART).map_or("", String::as_str)
    }

    /// Replace main document markup
    pub(crate) fn set_main_part(&mut self, xml: String) {
        self.markup.insert(MAIN_PART.to_string(), xml);
    }

    /// Editable parts as (name, markup)
    pub fn editable_parts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.markup.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn editable_parts_mut(&mut self) -> impl Iterator<Item = (&String, &mut String)> {
        self.markup.iter_mut()
    }

    /// Names of all archive entries
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Visible text of the main document, one entry per paragraph
    ///
    /// # Errors
    /// Returns error if the main part is not well-formed
    pub fn paragraphs(&self) -> Result<Vec<String>, TemplateError> {
        Ok(markup::paragraph_texts(self.main_part())?)
    }

    /// Visible text of the main document, paragraphs joined by newlines
    ///
    /// # Errors
    /// Returns error if the main part is not well-formed
    pub fn plain_text(&self) -> Result<String, TemplateError> {
        Ok(self.paragraphs()?.join("\n"))
    }

    /// Serialize back to container bytes
    ///
    /// Entries keep their original order; edited parts replace their originals.
    ///
    /// # Errors
    /// Returns error if the archive cannot be written
    pub fn to_bytes(&self) -> Result<Vec<u8>, TemplateError> {
        let parts = self.entries.iter().map(|(name, data)| {
            let bytes = self
                .markup
                .get(name)
                .map_or(data.as_slice(), |text| text.as_bytes());
            (name.as_str(), bytes)
        });
        write_archive(parts)
    }

    /// Check that `bytes` is a usable office document
    ///
    /// The archive must open and carry the content-type manifest, and every
    /// editable part (body, headers, footers) must be well-formed.
    ///
    /// # Errors
    /// Returns the first structural problem found
    pub fn verify(bytes: &[u8]) -> Result<(), TemplateError> {
        let package = Self::open(bytes)?;
        if !package.entries.contains_key(CONTENT_TYPES_PART) {
            return Err(TemplateError::MissingPart(CONTENT_TYPES_PART.to_string()));
        }
        for (name, xml) in package.editable_parts() {
            if let Err(err) = roxmltree::Document::parse(xml) {
                tracing::debug!(part = name, error = %err, "editable part is not well-formed");
                return Err(err.into());
            }
        }
        Ok(())
    }
}

/// Write named parts into a deflated zip archive
///
/// # Errors
/// Returns error if an entry cannot be written
pub fn write_archive<'a>(
    parts: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> Result<Vec<u8>, TemplateError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in parts {
        writer.start_file(name, options)?;
        writer.write_all(data)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::W_NS;

    fn document(body: &str) -> String {
        format!("<w:document xmlns:w=\"{W_NS}\"><w:body>{body}</w:body></w:document>")
    }

    fn package_bytes(main: &str) -> Vec<u8> {
        let header = format!("<w:hdr xmlns:w=\"{W_NS}\"/>");
        write_archive([
            (CONTENT_TYPES_PART, b"<Types/>".as_slice()),
            (MAIN_PART, main.as_bytes()),
            ("word/header1.xml", header.as_bytes()),
            ("word/media/image1.png", b"\x89PNG".as_slice()),
        ])
        .unwrap()
    }

    #[test]
    fn open_keeps_entries_and_decodes_markup() {
        let main = document("<w:p><w:r><w:t>${title}</w:t></w:r></w:p>");
        let package = TemplatePackage::open(&package_bytes(&main)).unwrap();

        let names: Vec<&str> = package.entry_names().collect();
        assert_eq!(names.len(), 4);
        let editable: Vec<&str> = package.editable_parts().map(|(n, _)| n).collect();
        assert_eq!(editable, vec![MAIN_PART, "word/header1.xml"]);
        assert_eq!(package.plain_text().unwrap(), "${title}");
    }

    #[test]
    fn open_repairs_split_tokens() {
        let main = document("<w:p><w:r><w:t>$</w:t></w:r><w:r><w:t>{title}</w:t></w:r></w:p>");
        let package = TemplatePackage::open(&package_bytes(&main)).unwrap();
        assert!(package.main_part().contains("${title}"));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = TemplatePackage::open(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, TemplateError::Zip(_)));
    }

    #[test]
    fn missing_main_part_is_rejected() {
        let bytes = write_archive([(CONTENT_TYPES_PART, b"<Types/>".as_slice())]).unwrap();
        let err = TemplatePackage::open(&bytes).unwrap_err();
        assert!(matches!(err, TemplateError::MissingPart(_)));
    }

    #[test]
    fn roundtrip_preserves_binary_entries() {
        let main = document("<w:p><w:r><w:t>x</w:t></w:r></w:p>");
        let package = TemplatePackage::open(&package_bytes(&main)).unwrap();
        let reopened = TemplatePackage::open(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(
            reopened.entries.get("word/media/image1.png").unwrap(),
            b"\x89PNG"
        );
        assert!(TemplatePackage::verify(&package.to_bytes().unwrap()).is_ok());
    }

    #[test]
    fn verify_requires_content_types() {
        let main = document("<w:p/>");
        let bytes = write_archive([(MAIN_PART, main.as_bytes())]).unwrap();
        assert!(matches!(
            TemplatePackage::verify(&bytes),
            Err(TemplateError::MissingPart(_))
        ));
    }

    #[test]
    fn verify_rejects_broken_header() {
        let main = document("<w:p/>");
        let bytes = write_archive([
            (CONTENT_TYPES_PART, b"<Types/>".as_slice()),
            (MAIN_PART, main.as_bytes()),
            ("word/header1.xml", b"<w:hdr><w:p></w:hdr>".as_slice()),
        ])
        .unwrap();
        assert!(TemplatePackage::open(&bytes).is_ok());
        assert!(matches!(
            TemplatePackage::verify(&bytes),
            Err(TemplateError::Xml(_))
        ));
    }

    #[test]
    fn header_parts_are_editable() {
        assert!(is_editable_part("word/header2.xml"));
        assert!(is_editable_part("word/footer1.xml"));
        assert!(!is_editable_part("word/styles.xml"));
        assert!(!is_editable_part("word/theme/header1.xml"));
    }
}
