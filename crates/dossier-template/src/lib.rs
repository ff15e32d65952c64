//! Dossier Template Boundary
//!
//! Everything that touches the inside of an office-document template:
//! opening the container, discovering its placeholders, binding values and
//! duplicating repeating regions.
//!
//! # Core Operations
//!
//! - **Introspect**: bytes → [`TemplateDescriptor`] (placeholders + block markers)
//! - **Bind**: [`ValueBinder`] substitutes scalar values across body, headers and footers
//! - **Expand**: [`BlockExpander`] clones blocks and table rows
//! - **Serialize**: [`TemplatePackage::to_bytes`] writes the container back
//!
//! # Architecture
//!
//! ```text
//! bytes → TemplatePackage (repaired markup) → TemplateIntrospector → TemplateDescriptor
//!                 ↑                                                        │
//!                 └──── BlockExpander / ValueBinder (mutate) ◄─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dossier_template::{LogicalField, TemplateIntrospector, ValueBinder};
//!
//! let descriptor = TemplateIntrospector::new().introspect(&bytes)?;
//! let mut package = descriptor.into_package();
//! ValueBinder::new(&mut package).bind(LogicalField::ReportTitle, Some("Q3 External"));
//! let out = package.to_bytes()?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod binder;
mod error;
mod expander;
mod fields;
mod introspect;
mod markup;
mod normalize;
mod package;

pub use binder::{resolve_text, ValueBinder};
pub use error::{ExpandError, TemplateError};
pub use expander::{BindingMap, BlockExpander};
pub use fields::{ContentFamily, LogicalField};
pub use introspect::{
    split_suffix, BlockMarker, BlockMarkerSet, PlaceholderSet, SuffixSeparator,
    TemplateDescriptor, TemplateIntrospector,
};
pub use markup::{escape_text, paragraph_texts, text_fragment, token, W_NS};
pub use normalize::repair_placeholders;
pub use package::{write_archive, TemplatePackage, CONTENT_TYPES_PART, MAIN_PART};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
