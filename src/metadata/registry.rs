//! In-memory, immutable registry implementation.

use std::collections::HashMap;

use super::provider::{MetadataError, MetadataRegistry, MetadataResult, RelationMetadata};

/// Registry populated once through [`StaticRegistryBuilder`] and frozen.
///
/// Holds no interior mutability, so shared references can be handed to any
/// number of concurrent compilations.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    tables: HashMap<String, String>,
    columns: HashMap<(String, String), String>,
    relations: HashMap<(String, String), RelationMetadata>,
}

impl StaticRegistry {
    pub fn builder() -> StaticRegistryBuilder {
        StaticRegistryBuilder::default()
    }

    /// Number of registered relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}

impl MetadataRegistry for StaticRegistry {
    fn get_relation(&self, from_table: &str, relation_name: &str) -> MetadataResult<RelationMetadata> {
        self.relations
            .get(&(from_table.to_string(), relation_name.to_string()))
            .cloned()
            .ok_or_else(|| MetadataError::RelationNotFound {
                model: from_table.to_string(),
                relation: relation_name.to_string(),
            })
    }

    fn get_table_name(&self, model: &str) -> MetadataResult<String> {
        self.tables
            .get(model)
            .cloned()
            .ok_or_else(|| MetadataError::ModelNotFound(model.to_string()))
    }

    fn get_column_name(&self, model: &str, field: &str) -> MetadataResult<String> {
        self.columns
            .get(&(model.to_string(), field.to_string()))
            .cloned()
            .ok_or_else(|| MetadataError::FieldNotFound {
                model: model.to_string(),
                field: field.to_string(),
            })
    }
}

/// Builder for [`StaticRegistry`].
#[derive(Debug, Default)]
#[must_use = "builders have no effect until build() is called"]
pub struct StaticRegistryBuilder {
    inner: StaticRegistry,
}

impl StaticRegistryBuilder {
    /// Map a model to its physical table.
    pub fn table(mut self, model: impl Into<String>, table: impl Into<String>) -> Self {
        self.inner.tables.insert(model.into(), table.into());
        self
    }

    /// Map a model field to its physical column.
    pub fn column(
        mut self,
        model: impl Into<String>,
        field: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.inner
            .columns
            .insert((model.into(), field.into()), column.into());
        self
    }

    /// Register a relation under `name` on its `from_model`.
    pub fn relation(mut self, name: impl Into<String>, relation: RelationMetadata) -> Self {
        let key = (relation.from_model.clone(), name.into());
        self.inner.relations.insert(key, relation);
        self
    }

    pub fn build(self) -> StaticRegistry {
        self.inner
    }
}
