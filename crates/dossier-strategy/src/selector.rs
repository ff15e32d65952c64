//! Strategy selection
//!
//! Pure decision table evaluated per content family, first match wins:
//!
//! 1. block marker for the family present → `BlockClone`
//! 2. base placeholder in two or more suffixed forms → `IndexedPlaceholder`
//! 3. base placeholder inside a table row → `RowClone`
//! 4. un-suffixed base placeholder → `AggregateText`
//! 5. otherwise → `None`
//!
//! Presence of template structure is inspected up front; nothing here
//! touches the document.

use crate::strategy::{BindingStrategy, CloneMode, FamilyPlan, FieldMap, IndexConvention};
use dossier_template::{
    BlockMarkerSet, ContentFamily, LogicalField, PlaceholderSet, TemplateDescriptor,
};

/// Chooses a [`BindingStrategy`] per content family
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategySelector;

impl StrategySelector {
    /// Create new selector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Strategies for both families
    #[must_use]
    pub fn select_all(&self, descriptor: &TemplateDescriptor) -> FamilyPlan {
        FamilyPlan {
            methodologies: self.select(descriptor, ContentFamily::Methodologies),
            findings: self.select(descriptor, ContentFamily::Findings),
        }
    }

    /// Strategy for one family
    #[must_use]
    pub fn select(&self, descriptor: &TemplateDescriptor, family: ContentFamily) -> BindingStrategy {
        let strategy = self.select_from(&descriptor.placeholders, &descriptor.blocks, family);
        tracing::debug!(family = %family, strategy = %strategy, "selected binding strategy");
        strategy
    }

    /// Decision table over bare placeholder and block sets
    #[must_use]
    pub fn select_from(
        &self,
        placeholders: &PlaceholderSet,
        blocks: &BlockMarkerSet,
        family: ContentFamily,
    ) -> BindingStrategy {
        if let Some(strategy) = block_clone(blocks, family) {
            return strategy;
        }
        if let Some(strategy) = indexed(placeholders, family) {
            return strategy;
        }
        if let Some(strategy) = row_clone(placeholders, family) {
            return strategy;
        }
        if let Some(placeholder) = family
            .base_candidates()
            .iter()
            .find(|name| placeholders.contains(name))
        {
            return BindingStrategy::AggregateText {
                placeholder: (*placeholder).to_string(),
            };
        }
        BindingStrategy::None
    }
}

fn block_clone(blocks: &BlockMarkerSet, family: ContentFamily) -> Option<BindingStrategy> {
    let block = family
        .block_markers()
        .iter()
        .find_map(|marker| blocks.get(marker))?;
    let fields = FieldMap::resolve(family.fields(), |name| block.inner.contains(name));

    let row_anchor = match family {
        ContentFamily::Findings => LogicalField::EvidenceName
            .candidates()
            .iter()
            .find(|name| block.row_anchors.contains(**name)),
        ContentFamily::Methodologies => None,
    };
    let mode = match row_anchor {
        Some(anchor) => CloneMode::IndexedWithRows {
            row_anchor: (*anchor).to_string(),
        },
        None => CloneMode::Immediate,
    };

    Some(BindingStrategy::BlockClone {
        marker: block.name.clone(),
        fields,
        mode,
    })
}

fn indexed(placeholders: &PlaceholderSet, family: ContentFamily) -> Option<BindingStrategy> {
    family.base_candidates().iter().find_map(|base| {
        let forms = placeholders.suffixed_forms(base);
        let (convention, slots) = IndexConvention::detect(&forms)?;
        Some(BindingStrategy::IndexedPlaceholder {
            base: (*base).to_string(),
            convention,
            slots,
        })
    })
}

fn row_clone(placeholders: &PlaceholderSet, family: ContentFamily) -> Option<BindingStrategy> {
    let anchor = family
        .base_candidates()
        .iter()
        .find(|name| placeholders.contains(name) && placeholders.in_table_row(name))?;
    let fields = FieldMap::resolve(family.fields(), |name| placeholders.in_table_row(name));
    Some(BindingStrategy::RowClone {
        anchor: (*anchor).to_string(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_template::TemplateIntrospector;
    use dossier_test_utils::TemplateBuilder;
    use pretty_assertions::assert_eq;

    fn describe(builder: TemplateBuilder) -> TemplateDescriptor {
        TemplateIntrospector::new().introspect(&builder.build()).unwrap()
    }

    #[test]
    fn blank_template_selects_none_for_both() {
        let plan = StrategySelector::new().select_all(&describe(
            TemplateBuilder::new().paragraph("${report_title}"),
        ));
        assert!(plan.methodologies.is_none());
        assert!(plan.findings.is_none());
    }

    #[test]
    fn block_beats_everything_else() {
        let descriptor = describe(
            TemplateBuilder::new()
                .paragraph("${finding_name_0}")
                .paragraph("${finding_name_1}")
                .block("block_findings", &["${finding_name}", "${finding_severity}"]),
        );
        match StrategySelector::new().select(&descriptor, ContentFamily::Findings) {
            BindingStrategy::BlockClone { marker, fields, mode } => {
                assert_eq!(marker, "block_findings");
                assert_eq!(fields.get(LogicalField::FindingSeverity), Some("finding_severity"));
                assert_eq!(mode, CloneMode::Immediate);
            }
            other => panic!("unexpected strategy {other}"),
        }
    }

    #[test]
    fn evidence_row_inside_block_selects_indexed_mode() {
        let descriptor = describe(
            TemplateBuilder::new()
                .paragraph("${block_findings}")
                .paragraph("${finding_name}")
                .table(&[&["${evidence_file}", "${evidence_description}"]])
                .paragraph("${/block_findings}"),
        );
        let strategy = StrategySelector::new().select(&descriptor, ContentFamily::Findings);
        let BindingStrategy::BlockClone { mode, .. } = strategy else {
            panic!("expected block clone");
        };
        assert_eq!(
            mode,
            CloneMode::IndexedWithRows {
                row_anchor: "evidence_file".into()
            }
        );
    }

    #[test]
    fn suffixed_forms_select_indexed() {
        let descriptor = describe(
            TemplateBuilder::new()
                .paragraph("${methodology_title#1}")
                .paragraph("${methodology_title#2}")
                .paragraph("${methodology_title#3}"),
        );
        assert_eq!(
            StrategySelector::new().select(&descriptor, ContentFamily::Methodologies),
            BindingStrategy::IndexedPlaceholder {
                base: "methodology_title".into(),
                convention: IndexConvention::HashOne,
                slots: vec![1, 2, 3],
            }
        );
    }

    #[test]
    fn table_row_selects_row_clone() {
        let descriptor = describe(
            TemplateBuilder::new().table(&[&["Name", "Severity"], &["${finding_name}", "${finding_severity}"]]),
        );
        let strategy = StrategySelector::new().select(&descriptor, ContentFamily::Findings);
        let BindingStrategy::RowClone { anchor, fields } = strategy else {
            panic!("expected row clone");
        };
        assert_eq!(anchor, "finding_name");
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn lone_placeholder_selects_aggregate() {
        let descriptor = describe(
            TemplateBuilder::new()
                .block("block_methodologies", &["${methodology_title}"])
                .paragraph("${finding_name}")
                .paragraph("${finding_severity}")
                .paragraph("${finding_description}"),
        );
        let plan = StrategySelector::new().select_all(&descriptor);
        assert_eq!(plan.methodologies.label(), "block-clone");
        assert_eq!(
            plan.findings,
            BindingStrategy::AggregateText {
                placeholder: "finding_name".into()
            }
        );
    }

    #[test]
    fn dedicated_list_placeholder_is_preferred() {
        let descriptor = describe(
            TemplateBuilder::new()
                .paragraph("${finding_name}")
                .paragraph("${findings}"),
        );
        assert_eq!(
            StrategySelector::new().select(&descriptor, ContentFamily::Findings),
            BindingStrategy::AggregateText {
                placeholder: "findings".into()
            }
        );
    }
}
