//! Pre-flight schema comparison.
//!
//! Every patient column is checked against its donor column before the first
//! row is read. Problems are collected for the whole table, so a single run
//! reports all of them; the transfer only starts when the list is empty.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::cast::{CastPolicy, ValueCaster};
use crate::core::{ColumnDescriptor, ColumnRelationMap, TableSchema};
use crate::error::{DonorError, Result, SchemaIssue};
use crate::typemap::{is_datetime_pair, CompatibilityChecker};

/// A patient column together with the donor column that feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelation {
    pub target: ColumnDescriptor,
    pub source: ColumnDescriptor,
}

/// Outcome of a successful pre-flight pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastPlan {
    /// Patient columns whose donor type differs and whose values must be cast.
    pub needs_cast: BTreeSet<String>,

    /// Related columns, in patient column order.
    pub relations: Vec<ResolvedRelation>,
}

impl CastPlan {
    pub fn needs_cast(&self, target_column: &str) -> bool {
        self.needs_cast.contains(target_column)
    }

    /// Donor column feeding `target_column`, if any.
    pub fn source_for(&self, target_column: &str) -> Option<&ColumnDescriptor> {
        self.relations
            .iter()
            .find(|r| r.target.name == target_column)
            .map(|r| &r.source)
    }
}

/// Compares the patient schema with the donor schema under a relation map.
pub struct SchemaComparator<'a> {
    checker: CompatibilityChecker,
    policy: &'a CastPolicy,
}

impl<'a> SchemaComparator<'a> {
    pub fn new(checker: CompatibilityChecker, policy: &'a CastPolicy) -> Self {
        Self { checker, policy }
    }

    /// Check every patient column and build the cast plan.
    ///
    /// Returns [`DonorError::SchemaIncompatible`] with every issue found when
    /// at least one column cannot be filled.
    pub fn compare(
        &self,
        target: &TableSchema,
        source: &TableSchema,
        relations: &ColumnRelationMap,
    ) -> Result<CastPlan> {
        let mut issues = Vec::new();
        let mut plan = CastPlan::default();
        let caster = ValueCaster::new(self.checker.catalog(), self.policy);

        for (target_column, _) in relations.iter() {
            if !target.has_column(target_column) {
                warn!(
                    "Relation key {} is not a column of {}",
                    target_column, target.name
                );
                issues.push(SchemaIssue::UnknownTargetColumn {
                    column: target_column.to_string(),
                });
            }
        }

        for column in &target.columns {
            let Some(source_name) = relations.source_for(&column.name) else {
                if column.can_be_omitted() {
                    debug!("Column {} has no donor column and will be left out", column.name);
                } else if let Ok(literal) = caster.undefined_column_value(column) {
                    debug!("Column {} has no donor column, filled with {}", column.name, literal);
                } else {
                    warn!("Target column {} has no relation and can't be NULL", column.name);
                    issues.push(SchemaIssue::NoRelationForRequiredColumn {
                        column: column.name.clone(),
                    });
                }
                continue;
            };

            let Some(source_column) = source.column(source_name) else {
                warn!(
                    "Target column {} is related to {} which {} does not have",
                    column.name, source_name, source.name
                );
                issues.push(SchemaIssue::MissingSourceColumn {
                    target_column: column.name.clone(),
                    source_column: source_name.to_string(),
                });
                continue;
            };

            plan.relations.push(ResolvedRelation {
                target: column.clone(),
                source: source_column.clone(),
            });

            if let Some(issue) = self.compare_types(column, source_column, &mut plan.needs_cast) {
                issues.push(issue);
            }
        }

        if !issues.is_empty() {
            return Err(DonorError::SchemaIncompatible { issues });
        }

        info!(
            "Schema check passed: {} related columns, {} need casting",
            plan.relations.len(),
            plan.needs_cast.len()
        );
        Ok(plan)
    }

    fn compare_types(
        &self,
        target: &ColumnDescriptor,
        source: &ColumnDescriptor,
        needs_cast: &mut BTreeSet<String>,
    ) -> Option<SchemaIssue> {
        if target.raw_type.eq_ignore_ascii_case(&source.raw_type)
            || is_datetime_pair(&target.raw_type, &source.raw_type)
        {
            return None;
        }

        warn!(
            "Column types differ: {} ({}) <- {} ({})",
            target.name, target.raw_type, source.name, source.raw_type
        );
        needs_cast.insert(target.name.clone());

        if !self.policy.allow_type_transform {
            return Some(SchemaIssue::TransformDisabled {
                target_column: target.name.clone(),
                source_column: source.name.clone(),
                target_type: target.raw_type.clone(),
                source_type: source.raw_type.clone(),
            });
        }

        if !self.checker.check(
            &target.raw_type,
            &source.raw_type,
            self.policy.allow_lossy_transform,
        ) {
            warn!(
                "Can't transform {} ({}) into {} ({})",
                source.name, source.raw_type, target.name, target.raw_type
            );
            return Some(SchemaIssue::IncompatibleTypes {
                target_column: target.name.clone(),
                source_column: source.name.clone(),
                target_type: target.raw_type.clone(),
                source_type: source.raw_type.clone(),
            });
        }

        None
    }
}
