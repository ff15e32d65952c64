//! WordprocessingML helpers shared by introspection, binding and expansion

use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;

/// WordprocessingML main namespace
pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// A contiguous `${name}` token; names never contain markup or braces
pub(crate) static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^{}$<>]+)\}").expect("static regex"));

/// Render a placeholder token for `name`
#[inline]
#[must_use]
pub fn token(name: &str) -> String {
    format!("${{{name}}}")
}

/// All tokens in `xml` as (byte offset, name)
pub(crate) fn tokens(xml: &str) -> impl Iterator<Item = (usize, &str)> {
    TOKEN_RE.captures_iter(xml).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        Some((whole.start(), name.as_str()))
    })
}

/// Escape text for element content
///
/// `$` is written as a character reference so inserted text can never form
/// a live `${name}` token for a later pass.
#[must_use]
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '$' => out.push_str("&#36;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaped replacement text for a token sitting inside `<w:t>`
///
/// Line breaks close the current text element, emit `<w:br/>` and reopen it.
#[must_use]
pub fn text_fragment(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n");
    let mut lines = normalized.split('\n');
    let mut out = escape_text(lines.next().unwrap_or_default());
    for line in lines {
        out.push_str("</w:t><w:br/><w:t xml:space=\"preserve\">");
        out.push_str(&escape_text(line));
    }
    out
}

/// True when `node` is the `w:{local}` element
#[inline]
pub(crate) fn is_w(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local && node.tag_name().namespace() == Some(W_NS)
}

/// Visible text of a paragraph: runs concatenated, tabs and breaks kept
pub(crate) fn paragraph_text(paragraph: Node<'_, '_>) -> String {
    let mut text = String::new();
    for node in paragraph.descendants() {
        if is_w(node, "t") {
            text.push_str(node.text().unwrap_or_default());
        } else if is_w(node, "tab") {
            text.push('\t');
        } else if is_w(node, "br") || is_w(node, "cr") {
            text.push('\n');
        }
    }
    text
}

/// Visible text of every body paragraph, in document order
///
/// Paragraphs nested in tables are included; nested paragraphs are not
/// reported twice.
///
/// # Errors
/// Returns error if `xml` is not well-formed
pub fn paragraph_texts(xml: &str) -> Result<Vec<String>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(doc
        .descendants()
        .filter(|n| is_w(*n, "p"))
        .filter(|n| !n.ancestors().skip(1).any(|a| is_w(a, "p")))
        .map(paragraph_text)
        .collect())
}
