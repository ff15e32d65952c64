//! Scalar value binding
//!
//! Substitutes values into placeholders across every editable part. A field
//! whose spellings are all absent is a binding miss: recorded and logged,
//! never an error.

use crate::fields::LogicalField;
use crate::markup::{self, TOKEN_RE};
use crate::package::TemplatePackage;

/// Source text for `field`, or its default when absent or blank
#[must_use]
pub fn resolve_text<'v>(field: LogicalField, value: Option<&'v str>) -> &'v str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => field.default_text(),
    }
}

/// Binds scalar values into a package
#[derive(Debug)]
pub struct ValueBinder<'a> {
    package: &'a mut TemplatePackage,
    bound: usize,
    misses: Vec<String>,
}

impl<'a> ValueBinder<'a> {
    #[must_use]
    pub fn new(package: &'a mut TemplatePackage) -> Self {
        Self {
            package,
            bound: 0,
            misses: Vec::new(),
        }
    }

    /// Bind `value` to the first spelling of `field` the template uses
    ///
    /// Returns false on a binding miss.
    pub fn bind(&mut self, field: LogicalField, value: Option<&str>) -> bool {
        self.bind_suffixed(field, "", value)
    }

    /// Bind `value` to `{spelling}{suffix}` for the first spelling present
    pub fn bind_suffixed(&mut self, field: LogicalField, suffix: &str, value: Option<&str>) -> bool {
        let text = resolve_text(field, value);
        for candidate in field.candidates() {
            let name = format!("{candidate}{suffix}");
            if self.set_value(&name, text) > 0 {
                return true;
            }
        }
        let miss = format!("{field}{suffix}");
        tracing::debug!(field = %miss, "placeholder binding miss");
        self.misses.push(miss);
        false
    }

    /// Replace every `${name}` with `raw`, returning the number replaced
    ///
    /// `raw` is escaped; line breaks become soft breaks.
    pub fn set_value(&mut self, name: &str, raw: &str) -> usize {
        let token = markup::token(name);
        let fragment = markup::text_fragment(raw);
        let mut replaced = 0;
        for (_, xml) in self.package.editable_parts_mut() {
            let count = xml.matches(token.as_str()).count();
            if count > 0 {
                *xml = xml.replace(token.as_str(), &fragment);
                replaced += count;
            }
        }
        self.bound += replaced;
        replaced
    }

    /// Remove every `${name}`
    pub fn clear(&mut self, name: &str) -> usize {
        self.set_value(name, "")
    }

    /// Remove every placeholder still present, returning the names removed
    pub fn clear_remaining(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        for (part, xml) in self.package.editable_parts_mut() {
            if !TOKEN_RE.is_match(xml) {
                continue;
            }
            for caps in TOKEN_RE.captures_iter(xml) {
                let name = caps[1].to_string();
                tracing::debug!(field = %name, part = %part, "clearing unbound placeholder");
                removed.push(name);
            }
            *xml = TOKEN_RE.replace_all(xml, "").into_owned();
        }
        self.misses.extend(removed.iter().cloned());
        removed
    }

    /// Placeholders replaced so far
    #[inline]
    #[must_use]
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Fields and names that found no placeholder
    #[inline]
    #[must_use]
    pub fn misses(&self) -> &[String] {
        &self.misses
    }

    /// Consume the binder, returning recorded misses
    #[must_use]
    pub fn into_misses(self) -> Vec<String> {
        self.misses
    }
}
