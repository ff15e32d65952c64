//! Template introspection
//!
//! Reports which scalar placeholders and which repeating-block markers a
//! template contains. Read-only: the package is parsed, inspected and handed
//! back untouched inside the [`TemplateDescriptor`].
//!
//! Finding nothing is a valid result. Templates are user-authored and any
//! naming scheme (or none) may be in use.

use crate::error::TemplateError;
use crate::markup::{self, is_w};
use crate::package::TemplatePackage;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::ops::Range;

/// Separator between a base name and its numeric suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SuffixSeparator {
    /// `name_0`, `name_1`
    Underscore,
    /// `name#1`, `name#2`
    Hash,
}

/// Flat set of scalar placeholder names
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaceholderSet {
    names: IndexSet<String>,
    /// Names found inside a table row of the main part
    in_rows: IndexSet<String>,
}

impl PlaceholderSet {
    /// True if `name` appears as a scalar placeholder
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// True if `name` appears inside a table row
    #[inline]
    #[must_use]
    pub fn in_table_row(&self, name: &str) -> bool {
        self.in_rows.contains(name)
    }

    /// Iterate names in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Numerically suffixed forms of `base` present in the set
    ///
    /// Returns (separator, index) pairs sorted by index.
    #[must_use]
    pub fn suffixed_forms(&self, base: &str) -> Vec<(SuffixSeparator, u32)> {
        let mut forms: Vec<(SuffixSeparator, u32)> = self
            .names
            .iter()
            .filter_map(|name| split_suffix(name))
            .filter(|(stem, _, _)| *stem == base)
            .map(|(_, separator, index)| (separator, index))
            .collect();
        forms.sort_by_key(|(_, index)| *index);
        forms
    }

    fn insert(&mut self, name: &str, in_row: bool) {
        self.names.insert(name.to_string());
        if in_row {
            self.in_rows.insert(name.to_string());
        }
    }
}

/// Split `name_3` / `name#3` into (stem, separator, index)
#[must_use]
pub fn split_suffix(name: &str) -> Option<(&str, SuffixSeparator, u32)> {
    let cut = name.rfind(|c| c == '_' || c == '#')?;
    let (stem, rest) = name.split_at(cut);
    let digits = &rest[1..];
    if stem.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = digits.parse().ok()?;
    let separator = if rest.starts_with('#') {
        SuffixSeparator::Hash
    } else {
        SuffixSeparator::Underscore
    };
    Some((stem, separator, index))
}

/// A repeating region delimited by `${name}` ... `${/name}`
#[derive(Debug, Clone, Serialize)]
pub struct BlockMarker {
    pub name: String,
    /// Placeholders between the markers
    pub inner: IndexSet<String>,
    /// Inner placeholders that sit inside a table row
    pub row_anchors: IndexSet<String>,
}

/// Block markers by name, in document order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockMarkerSet {
    blocks: IndexMap<String, BlockMarker>,
}

impl BlockMarkerSet {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BlockMarker> {
        self.blocks.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockMarker> {
        self.blocks.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// What a template offers, plus the package it was read from
///
/// Computed fresh per generation run; templates can change between runs.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateDescriptor {
    #[serde(skip)]
    pub package: TemplatePackage,
    pub placeholders: PlaceholderSet,
    pub blocks: BlockMarkerSet,
}

impl TemplateDescriptor {
    /// Consume the descriptor, keeping only the package
    #[must_use]
    pub fn into_package(self) -> TemplatePackage {
        self.package
    }
}

/// Parses templates into descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateIntrospector;

impl TemplateIntrospector {
    /// Create new introspector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Open container bytes and describe them
    ///
    /// # Errors
    /// Returns error if the container is unreadable or lacks the main part
    pub fn introspect(&self, bytes: &[u8]) -> Result<TemplateDescriptor, TemplateError> {
        let package = TemplatePackage::open(bytes)?;
        self.describe(package)
    }

    /// Describe an already opened package
    ///
    /// # Errors
    /// Returns error if the main part is not well-formed
    pub fn describe(&self, package: TemplatePackage) -> Result<TemplateDescriptor, TemplateError> {
        let main = package.main_part();
        let rows = table_row_ranges(main)?;
        let in_row = |offset: usize| rows.iter().any(|r| r.contains(&offset));

        let tokens: Vec<(usize, &str)> = markup::tokens(main).collect();
        let closers: IndexSet<&str> = tokens
            .iter()
            .filter_map(|(_, name)| name.strip_prefix('/'))
            .collect();

        let mut placeholders = PlaceholderSet::default();
        let mut blocks = BlockMarkerSet::default();

        for (offset, name) in &tokens {
            if name.starts_with('/') {
                continue;
            }
            if closers.contains(name) {
                if !blocks.contains(name) {
                    blocks
                        .blocks
                        .insert((*name).to_string(), block_marker(name, *offset, &tokens, &in_row));
                }
                continue;
            }
            placeholders.insert(name, in_row(*offset));
        }

        for (part, xml) in package.editable_parts() {
            if part == crate::package::MAIN_PART {
                continue;
            }
            for (_, name) in markup::tokens(xml) {
                if !name.starts_with('/') {
                    placeholders.insert(name, false);
                }
            }
        }

        tracing::debug!(
            placeholders = placeholders.len(),
            blocks = blocks.len(),
            "introspected template"
        );
        Ok(TemplateDescriptor {
            package,
            placeholders,
            blocks,
        })
    }
}

fn block_marker(
    name: &str,
    open_at: usize,
    tokens: &[(usize, &str)],
    in_row: &impl Fn(usize) -> bool,
) -> BlockMarker {
    let closer = format!("/{name}");
    let close_at = tokens
        .iter()
        .find(|(offset, n)| *offset > open_at && *n == closer)
        .map_or(usize::MAX, |(offset, _)| *offset);

    let mut marker = BlockMarker {
        name: name.to_string(),
        inner: IndexSet::new(),
        row_anchors: IndexSet::new(),
    };
    for (offset, inner) in tokens {
        if *offset <= open_at || *offset >= close_at || inner.starts_with('/') {
            continue;
        }
        marker.inner.insert((*inner).to_string());
        if in_row(*offset) {
            marker.row_anchors.insert((*inner).to_string());
        }
    }
    marker
}

/// Byte ranges of every `w:tr` element
fn table_row_ranges(xml: &str) -> Result<Vec<Range<usize>>, TemplateError> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(doc
        .descendants()
        .filter(|n| is_w(*n, "tr"))
        .map(|n| n.range())
        .collect())
}
