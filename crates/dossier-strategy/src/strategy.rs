//! Binding strategy types
//!
//! Provides [`BindingStrategy`], the tagged choice of how one content family
//! is written into a template, and the supporting [`IndexConvention`],
//! [`CloneMode`] and [`FieldMap`] types.

use dossier_template::{ContentFamily, LogicalField, SuffixSeparator};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Numbering scheme of indexed placeholders
///
/// Detection rule: `#n` forms win over `_n` forms; `_n` forms that include
/// `_0` are zero-based, otherwise one-based. At least two distinct indices
/// of the winning separator are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexConvention {
    /// `name_0`, `name_1`, ...
    UnderscoreZero,
    /// `name_1`, `name_2`, ...
    UnderscoreOne,
    /// `name#1`, `name#2`, ...
    HashOne,
}

impl IndexConvention {
    /// Detect the convention from suffixed forms of one base name
    ///
    /// Returns the convention and the distinct indices present, ascending.
    #[must_use]
    pub fn detect(forms: &[(SuffixSeparator, u32)]) -> Option<(Self, Vec<u32>)> {
        let indices = |separator: SuffixSeparator| {
            let mut found: Vec<u32> = forms
                .iter()
                .filter(|(s, _)| *s == separator)
                .map(|(_, i)| *i)
                .collect();
            found.sort_unstable();
            found.dedup();
            found
        };

        let hashed = indices(SuffixSeparator::Hash);
        if hashed.len() >= 2 {
            return Some((Self::HashOne, hashed));
        }
        let underscored = indices(SuffixSeparator::Underscore);
        if underscored.len() >= 2 {
            let convention = if underscored.first() == Some(&0) {
                Self::UnderscoreZero
            } else {
                Self::UnderscoreOne
            };
            return Some((convention, underscored));
        }
        None
    }

    #[inline]
    #[must_use]
    pub fn separator(&self) -> SuffixSeparator {
        match self {
            Self::UnderscoreZero | Self::UnderscoreOne => SuffixSeparator::Underscore,
            Self::HashOne => SuffixSeparator::Hash,
        }
    }

    /// Suffix for template index `index`
    #[must_use]
    pub fn suffix(&self, index: u32) -> String {
        match self.separator() {
            SuffixSeparator::Underscore => format!("_{index}"),
            SuffixSeparator::Hash => format!("#{index}"),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnderscoreZero => "_0",
            Self::UnderscoreOne => "_1",
            Self::HashOne => "#1",
        }
    }
}

/// How a cloned block's inner placeholders are made addressable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CloneMode {
    /// Values substituted while cloning
    Immediate,
    /// Inner names suffixed `#k`, then `row_anchor#k` rows expanded per clone
    IndexedWithRows { row_anchor: String },
}

/// Logical field to the placeholder spelling a template uses for it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    entries: IndexMap<LogicalField, String>,
}

impl FieldMap {
    /// Resolve each field to its first spelling accepted by `present`
    ///
    /// Fields with no present spelling are left out.
    #[must_use]
    pub fn resolve(fields: &[LogicalField], present: impl Fn(&str) -> bool) -> Self {
        let entries = fields
            .iter()
            .filter_map(|field| {
                field
                    .candidates()
                    .iter()
                    .find(|name| present(name))
                    .map(|name| (*field, (*name).to_string()))
            })
            .collect();
        Self { entries }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, field: LogicalField) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogicalField, &str)> {
        self.entries.iter().map(|(f, n)| (*f, n.as_str()))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How one content family is written into a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingStrategy {
    /// Clone a marked block once per record
    BlockClone {
        marker: String,
        fields: FieldMap,
        mode: CloneMode,
    },
    /// Fill `base_0`, `base_1`, ... style placeholders, one slot per record
    IndexedPlaceholder {
        base: String,
        convention: IndexConvention,
        slots: Vec<u32>,
    },
    /// Clone the table row holding `anchor` once per record
    RowClone { anchor: String, fields: FieldMap },
    /// Write every record into one placeholder as formatted text
    AggregateText { placeholder: String },
    /// Template has no room for this family
    None,
}

impl BindingStrategy {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::BlockClone { .. } => "block-clone",
            Self::IndexedPlaceholder { .. } => "indexed-placeholder",
            Self::RowClone { .. } => "row-clone",
            Self::AggregateText { .. } => "aggregate-text",
            Self::None => "none",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for BindingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockClone { marker, .. } => write!(f, "block-clone({marker})"),
            Self::IndexedPlaceholder {
                base, convention, ..
            } => write!(f, "indexed-placeholder({base}, {})", convention.label()),
            Self::RowClone { anchor, .. } => write!(f, "row-clone({anchor})"),
            Self::AggregateText { placeholder } => write!(f, "aggregate-text({placeholder})"),
            Self::None => f.write_str("none"),
        }
    }
}

/// Strategies chosen for both families of one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyPlan {
    pub methodologies: BindingStrategy,
    pub findings: BindingStrategy,
}

impl FamilyPlan {
    #[must_use]
    pub fn get(&self, family: ContentFamily) -> &BindingStrategy {
        match family {
            ContentFamily::Methodologies => &self.methodologies,
            ContentFamily::Findings => &self.findings,
        }
    }
}
