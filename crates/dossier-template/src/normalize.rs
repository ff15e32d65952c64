//! Broken placeholder repair
//!
//! Word processors split typed text into runs at will, so `${finding_name}`
//! often reaches us as `$</w:t></w:r><w:r><w:t>{finding_</w:t>...<w:t>name}`.
//! Tokens are made contiguous before anything looks for them.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// `$`, optional markup, `{`, then anything up to the next `}`
static BROKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(?:<[^>]*>)*\{[^}$]*\}").expect("static regex"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/?[A-Za-z0-9_.#\-]+$").expect("static regex"));

/// Make every split placeholder token contiguous
///
/// Markup between the pieces of a token is dropped; the token text lands in
/// the run where the `$` was typed. Candidates whose stripped text is not a
/// plausible placeholder name are left untouched.
#[must_use]
pub fn repair_placeholders(xml: &str) -> Cow<'_, str> {
    BROKEN_RE.replace_all(xml, |caps: &Captures<'_>| {
        let raw = &caps[0];
        if !raw.contains('<') {
            return raw.to_string();
        }
        let stripped = TAG_RE.replace_all(raw, "");
        let name = &stripped[2..stripped.len() - 1];
        if NAME_RE.is_match(name) {
            stripped.into_owned()
        } else {
            raw.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn contiguous_tokens_are_unchanged() {
        let xml = "<w:t>${finding_name}</w:t>";
        assert_eq!(repair_placeholders(xml), xml);
    }

    #[test]
    fn dollar_split_from_brace_is_joined() {
        let xml = "<w:r><w:t>$</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>{title}</w:t></w:r>";
        assert_eq!(
            repair_placeholders(xml),
            "<w:r><w:t>${title}</w:t></w:r>"
        );
    }

    #[test]
    fn name_split_across_runs_is_joined() {
        let xml = "<w:t>${client_</w:t></w:r><w:r><w:t>name} rest</w:t>";
        assert_eq!(repair_placeholders(xml), "<w:t>${client_name} rest</w:t>");
    }

    #[test]
    fn non_identifier_text_is_left_alone() {
        let xml = "<w:t>${not a name</w:t></w:r><w:r><w:t>}</w:t>";
        assert_eq!(repair_placeholders(xml), xml);
    }

    #[test]
    fn closing_block_marker_is_repaired() {
        let xml = "<w:t>${/block_</w:t><w:t>findings}</w:t>";
        assert_eq!(repair_placeholders(xml), "<w:t>${/block_findings}</w:t>");
    }
}
