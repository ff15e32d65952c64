//! Dossier Strategy Selection
//!
//! Decides, per content family, how records are written into a template.
//!
//! # Core Concepts
//!
//! - [`BindingStrategy`]: block clone, indexed placeholders, row clone,
//!   aggregate text, or nothing
//! - [`IndexConvention`]: which numbering scheme indexed placeholders use
//! - [`StrategySelector`]: the decision table, a pure function of the
//!   template descriptor
//! - [`FamilyPlan`]: the chosen strategies for methodologies and findings
//!
//! # Example
//!
//! ```rust,ignore
//! use dossier_strategy::StrategySelector;
//! use dossier_template::TemplateIntrospector;
//!
//! let descriptor = TemplateIntrospector::new().introspect(&bytes)?;
//! let plan = StrategySelector::new().select_all(&descriptor);
//! println!("findings via {}", plan.findings);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod selector;
mod strategy;

pub use dossier_template::ContentFamily;
pub use selector::StrategySelector;
pub use strategy::{BindingStrategy, CloneMode, FamilyPlan, FieldMap, IndexConvention};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
