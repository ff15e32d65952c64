//! Structural duplication of repeating regions
//!
//! # Core Concepts
//!
//! - **Block**: the markup between `${name}` and `${/name}`. When the markers
//!   sit in separate paragraphs (or table rows) the marker containers are
//!   dropped and everything between them is cloned once per record.
//! - **Inline block**: both markers in one paragraph; the text between them
//!   is cloned in place.
//! - **Row clone**: the innermost table row around an anchor placeholder is
//!   cloned once per record.
//!
//! Clones never carry the source's paragraph identity attributes, and a
//! vertical merge restart is only kept on the first cloned row. The main part
//! is re-parsed after every mutation; a result that does not parse is
//! rejected and the package is left untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut expander = BlockExpander::new(&mut package);
//! expander.duplicate("block_methodologies", &bindings)?;
//! expander.expand_rows("evidence_name#1", &rows)?;
//! ```

use crate::error::ExpandError;
use crate::markup::{self, is_w, TOKEN_RE};
use crate::package::TemplatePackage;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use roxmltree::{Document, Node};
use std::ops::Range;

/// Placeholder name to raw value, for one clone
pub type BindingMap = IndexMap<String, String>;

static PARA_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+w14:(?:paraId|textId)="[^"]*""#).expect("static regex"));

static VMERGE_RESTART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:vMerge\s+w:val="restart"\s*/>"#).expect("static regex"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));

/// Where a block lives in the main part
#[derive(Debug, Clone, PartialEq, Eq)]
enum Region {
    /// Marker containers are separate paragraphs or rows
    Structural {
        outer: Range<usize>,
        inner: Range<usize>,
    },
    /// Both markers inside one paragraph
    Inline {
        outer: Range<usize>,
        inner: Range<usize>,
        paragraph: Option<Range<usize>>,
    },
}

/// Duplicates blocks and table rows in a package's main part
#[derive(Debug)]
pub struct BlockExpander<'a> {
    package: &'a mut TemplatePackage,
}

impl<'a> BlockExpander<'a> {
    #[must_use]
    pub fn new(package: &'a mut TemplatePackage) -> Self {
        Self { package }
    }

    /// Clone block `marker` once per binding map, substituting as it goes
    ///
    /// An empty slice removes the block and its markers.
    ///
    /// # Errors
    /// - `ExpandError::BlockNotFound` if the opening marker is absent
    /// - `ExpandError::UnbalancedBlock` if the markers do not delimit one region
    /// - `ExpandError::Xml` if the result would not be well-formed
    pub fn duplicate(&mut self, marker: &str, bindings: &[BindingMap]) -> Result<usize, ExpandError> {
        self.expand_block(marker, bindings.len(), |i, body| substitute(body, &bindings[i]))
    }

    /// Clone block `marker` `count` times, suffixing every inner placeholder
    ///
    /// Clone `k` (one-based) renames `${x}` to `${x#k}` so nested structure can
    /// be expanded per clone before values are bound.
    ///
    /// # Errors
    /// Same as [`BlockExpander::duplicate`]
    pub fn duplicate_indexed(&mut self, marker: &str, count: usize) -> Result<usize, ExpandError> {
        self.expand_block(marker, count, |i, body| index_tokens(body, i + 1))
    }

    /// Clone the table row containing `${anchor}` once per binding map
    ///
    /// An empty slice removes the row, or the whole table when it was the
    /// table's only row.
    ///
    /// # Errors
    /// - `ExpandError::PlaceholderNotFound` if the anchor is absent
    /// - `ExpandError::RowNotFound` if the anchor is not inside a row
    /// - `ExpandError::Xml` if the result would not be well-formed
    pub fn expand_rows(&mut self, anchor: &str, rows: &[BindingMap]) -> Result<usize, ExpandError> {
        let xml = self.package.main_part();
        let token = markup::token(anchor);
        let start = xml
            .find(&token)
            .ok_or_else(|| ExpandError::PlaceholderNotFound(anchor.to_string()))?;
        let span = start..start + token.len();

        let (row, table) = {
            let doc = Document::parse(xml)?;
            let row = deepest_element(&doc, &span, |n| is_w(n, "tr"))
                .ok_or_else(|| ExpandError::RowNotFound(anchor.to_string()))?;
            let table = row.parent().filter(|t| {
                is_w(*t, "tbl") && t.children().filter(|c| is_w(*c, "tr")).count() == 1
            });
            (row.range(), table.map(|t| t.range()))
        };

        let replacement = if rows.is_empty() {
            String::new()
        } else {
            let source = &xml[row.clone()];
            rows.iter()
                .enumerate()
                .map(|(i, bindings)| {
                    let clone = strip_identity(&substitute(source, bindings));
                    if i == 0 {
                        clone
                    } else {
                        VMERGE_RESTART_RE.replace_all(&clone, "<w:vMerge/>").into_owned()
                    }
                })
                .collect()
        };
        let target = match table {
            Some(table) if rows.is_empty() => table,
            _ => row,
        };
        let updated = splice(xml, target, &replacement);
        self.commit(updated)?;

        tracing::debug!(anchor, rows = rows.len(), "expanded table row");
        Ok(rows.len())
    }

    fn expand_block(
        &mut self,
        marker: &str,
        count: usize,
        render: impl Fn(usize, &str) -> String,
    ) -> Result<usize, ExpandError> {
        let xml = self.package.main_part();
        let region = locate_block(xml, marker)?;

        let updated = match region {
            Region::Structural { outer, inner } => {
                let body = &xml[inner];
                let clones: String = (0..count).map(|i| strip_identity(&render(i, body))).collect();
                splice(xml, outer, &clones)
            }
            Region::Inline {
                outer,
                inner,
                paragraph,
            } => {
                let body = &xml[inner];
                let clones: String = (0..count).map(|i| render(i, body)).collect();
                match paragraph {
                    Some(p) if count == 0 && left_empty(xml, &p, &outer) => splice(xml, p, ""),
                    _ => splice(xml, outer, &clones),
                }
            }
        };
        self.commit(updated)?;

        tracing::debug!(marker, count, "expanded block");
        Ok(count)
    }

    fn commit(&mut self, updated: String) -> Result<(), ExpandError> {
        Document::parse(&updated)?;
        self.package.set_main_part(updated);
        Ok(())
    }
}

/// Find the region delimited by `${marker}` and `${/marker}`
fn locate_block(xml: &str, marker: &str) -> Result<Region, ExpandError> {
    let open_token = markup::token(marker);
    let close_token = markup::token(&format!("/{marker}"));

    let open_at = xml
        .find(&open_token)
        .ok_or_else(|| ExpandError::BlockNotFound(marker.to_string()))?;
    let open = open_at..open_at + open_token.len();
    let close_at = match xml[open.end..].find(&close_token) {
        Some(rel) => open.end + rel,
        None if xml.contains(&close_token) => {
            return Err(ExpandError::unbalanced(marker, "closing marker precedes opening"));
        }
        None => return Err(ExpandError::unbalanced(marker, "closing marker missing")),
    };
    let close = close_at..close_at + close_token.len();

    let doc = Document::parse(xml)?;
    let open_el = deepest_element(&doc, &open, |_| true)
        .ok_or_else(|| ExpandError::unbalanced(marker, "opening marker outside any element"))?;
    let close_el = deepest_element(&doc, &close, |_| true)
        .ok_or_else(|| ExpandError::unbalanced(marker, "closing marker outside any element"))?;
    let common = open_el
        .ancestors()
        .find(|a| a.is_element() && contains(a.range(), &close))
        .ok_or_else(|| ExpandError::unbalanced(marker, "markers share no container"))?;

    let paragraph = common.ancestors().find(|a| is_w(*a, "p"));
    if paragraph.is_some() || is_w(common, "r") || is_w(common, "t") {
        return Ok(Region::Inline {
            outer: open.start..close.end,
            inner: open.end..close.start,
            paragraph: paragraph.map(|p| p.range()),
        });
    }

    let open_child = child_toward(open_el, common)
        .ok_or_else(|| ExpandError::unbalanced(marker, "opening marker container not found"))?;
    let close_child = child_toward(close_el, common)
        .ok_or_else(|| ExpandError::unbalanced(marker, "closing marker container not found"))?;
    let same_kind = (is_w(open_child, "p") && is_w(close_child, "p"))
        || (is_w(open_child, "tr") && is_w(close_child, "tr"));
    if !same_kind {
        return Err(ExpandError::unbalanced(
            marker,
            format!(
                "markers sit in different container kinds ({} and {})",
                open_child.tag_name().name(),
                close_child.tag_name().name()
            ),
        ));
    }

    Ok(Region::Structural {
        outer: open_child.range().start..close_child.range().end,
        inner: open_child.range().end..close_child.range().start,
    })
}

/// Deepest element matching `accept` whose range covers `span`
///
/// Elements covering the same point always nest, so the last match in
/// document order is the deepest.
fn deepest_element<'a, 'input>(
    doc: &'a Document<'input>,
    span: &Range<usize>,
    accept: impl Fn(Node<'a, 'input>) -> bool,
) -> Option<Node<'a, 'input>> {
    doc.descendants()
        .filter(|n| n.is_element() && contains(n.range(), span) && accept(*n))
        .last()
}

/// Ancestor-or-self of `node` whose parent is `container`
fn child_toward<'a, 'input>(
    node: Node<'a, 'input>,
    container: Node<'a, 'input>,
) -> Option<Node<'a, 'input>> {
    node.ancestors().find(|a| a.parent() == Some(container))
}

#[inline]
fn contains(outer: Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

fn splice(xml: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(xml.len() - range.len() + replacement.len());
    out.push_str(&xml[..range.start]);
    out.push_str(replacement);
    out.push_str(&xml[range.end..]);
    out
}

/// True when removing `removed` leaves paragraph `p` without visible text
fn left_empty(xml: &str, p: &Range<usize>, removed: &Range<usize>) -> bool {
    let before = &xml[p.start..removed.start];
    let after = &xml[removed.end..p.end];
    TAG_RE.replace_all(before, "").trim().is_empty() && TAG_RE.replace_all(after, "").trim().is_empty()
}

/// Substitute bound tokens in one pass; unbound tokens stay
fn substitute(fragment: &str, bindings: &BindingMap) -> String {
    TOKEN_RE
        .replace_all(fragment, |caps: &Captures<'_>| match bindings.get(&caps[1]) {
            Some(value) => markup::text_fragment(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Rename every `${x}` to `${x#k}`
fn index_tokens(fragment: &str, k: usize) -> String {
    TOKEN_RE
        .replace_all(fragment, |caps: &Captures<'_>| format!("${{{}#{k}}}", &caps[1]))
        .into_owned()
}

fn strip_identity(fragment: &str) -> String {
    PARA_ID_RE.replace_all(fragment, "").into_owned()
}
