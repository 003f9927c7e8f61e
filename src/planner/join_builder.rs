//! Relation join resolution using the schema metadata registry.
//!
//! Each included relation becomes one `LEFT JOIN`, aliased
//! `<base alias>_<relation>`, so a parent row survives even when nothing
//! matches. Nested inclusions recurse with the related model as the new base.

use super::{ConditionCompiler, Names};
use crate::compile::{CompileError, CompileResult, RelationPolicy, DEFAULT_MAX_RELATION_DEPTH};
use crate::metadata::{MetadataRegistry, RelationMetadata, RelationType};
use crate::model::{RelationInclusion, Selection};
use crate::sql::dialect::SqlDialect;
use crate::sql::expr::{and_all, table_col, table_star, Expr, ExprExt};
use crate::sql::query::{Join, SelectExpr, TableRef};

/// Joins and extra SELECT items produced for a set of inclusions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinPlan {
    pub joins: Vec<Join>,
    pub columns: Vec<SelectExpr>,
}

impl JoinPlan {
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }
}

pub struct JoinBuilder<'a> {
    registry: Option<&'a dyn MetadataRegistry>,
    dialect: &'a dyn SqlDialect,
    policy: RelationPolicy,
    max_depth: usize,
}

impl<'a> JoinBuilder<'a> {
    pub fn new(registry: Option<&'a dyn MetadataRegistry>, dialect: &'a dyn SqlDialect) -> Self {
        Self {
            registry,
            dialect,
            policy: RelationPolicy::default(),
            max_depth: DEFAULT_MAX_RELATION_DEPTH,
        }
    }

    pub fn policy(mut self, policy: RelationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Build joins for `relations` hanging off `base_model`, whose table is
    /// in scope as `base_alias`.
    pub fn build(
        &self,
        base_model: &str,
        base_alias: &str,
        relations: &[RelationInclusion],
    ) -> CompileResult<JoinPlan> {
        let registry = self.registry.ok_or(CompileError::MissingRegistry)?;
        let mut plan = JoinPlan::default();
        self.build_level(registry, base_model, base_alias, relations, 1, &mut plan)?;
        Ok(plan)
    }

    fn build_level(
        &self,
        registry: &'a dyn MetadataRegistry,
        base_model: &str,
        base_alias: &str,
        relations: &[RelationInclusion],
        depth: usize,
        plan: &mut JoinPlan,
    ) -> CompileResult<()> {
        if depth > self.max_depth {
            return Err(CompileError::RelationDepthExceeded {
                max: self.max_depth,
            });
        }

        let names = Names::new(Some(registry));

        for inclusion in relations {
            let meta = match registry.get_relation(base_model, &inclusion.relation) {
                Ok(meta) => meta,
                Err(source) => match self.policy {
                    RelationPolicy::Error => {
                        return Err(CompileError::UnknownRelation {
                            model: base_model.to_string(),
                            relation: inclusion.relation.clone(),
                            source,
                        })
                    }
                    RelationPolicy::Skip => {
                        tracing::debug!(
                            model = base_model,
                            relation = %inclusion.relation,
                            "skipping unresolved relation"
                        );
                        continue;
                    }
                },
            };

            if meta.relation_type == RelationType::ManyToMany {
                return Err(CompileError::ManyToManyRelation {
                    model: base_model.to_string(),
                    relation: inclusion.relation.clone(),
                });
            }

            let table = names.table(&meta.to_model)?;
            let alias = format!("{}_{}", base_alias, inclusion.relation);
            super::checked_ident(&alias)?;

            let mut on = join_predicate(&meta, &alias, base_alias);

            let nested = inclusion.query.as_deref();
            let conditions = ConditionCompiler::new(self.dialect, names, &meta.to_model)
                .qualified(Some(&alias));

            // Nested filters narrow the joined rows, never the parent rows
            if let Some(nested) = nested {
                let filters = conditions.compile_all(&nested.filter)?;
                if let Some(filter) = and_all(filters) {
                    on = on.and(filter);
                }
            }

            plan.joins
                .push(Join::left(TableRef::new(&table).with_alias(&alias), on));

            match nested.map(|q| &q.selection) {
                Some(Selection::Fields(fields)) if !fields.is_empty() => {
                    for field in fields {
                        let column = conditions.column(field)?;
                        let label = format!("{}_{}", inclusion.relation, field);
                        super::checked_ident(&label)?;
                        plan.columns.push(column.alias(&label));
                    }
                }
                _ => plan.columns.push(SelectExpr::new(table_star(&alias))),
            }

            if let Some(nested) = nested {
                if !nested.relations.is_empty() {
                    self.build_level(
                        registry,
                        &meta.to_model,
                        &alias,
                        &nested.relations,
                        depth + 1,
                        plan,
                    )?;
                }
            }
        }

        Ok(())
    }
}

/// ON predicate for one relation, ANDed across composite keys.
fn join_predicate(meta: &RelationMetadata, alias: &str, base_alias: &str) -> Expr {
    let pairs: Vec<Expr> = if meta.has_complete_fields() {
        meta.from_fields
            .iter()
            .zip(&meta.to_fields)
            .map(|(from, to)| match meta.relation_type {
                RelationType::OneToMany => table_col(alias, from).eq(table_col(base_alias, to)),
                _ => table_col(alias, to).eq(table_col(base_alias, from)),
            })
            .collect()
    } else {
        // Naming convention: the child holds `<parent>_id`
        let convention = match meta.relation_type {
            RelationType::OneToMany => table_col(alias, &foreign_key(&meta.from_model))
                .eq(table_col(base_alias, "id")),
            _ => table_col(alias, "id").eq(table_col(base_alias, &foreign_key(&meta.to_model))),
        };
        vec![convention]
    };

    // `pairs` is never empty: either zipped complete fields or the convention
    and_all(pairs).unwrap_or_else(|| table_col(alias, "id").eq(table_col(base_alias, "id")))
}

fn foreign_key(model: &str) -> String {
    format!("{}_id", model.to_lowercase())
}
