//! MetadataRegistry trait definition.
//!
//! The registry is produced once by the external schema-analysis step and is
//! read-only afterwards. The compiler borrows it for the duration of one
//! compilation; implementations must tolerate concurrent readers.

use serde::{Deserialize, Serialize};

/// Result type for metadata lookups.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors returned by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("unknown relation {relation} on model {model}")]
    RelationNotFound { model: String, relation: String },

    #[error("unknown model: {0}")]
    ModelNotFound(String),

    #[error("unknown field {field} on model {model}")]
    FieldNotFound { model: String, field: String },
}

impl MetadataError {
    /// Whether the error means "no such entry" rather than a broken registry.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RelationNotFound { .. } | Self::ModelNotFound(_) | Self::FieldNotFound { .. }
        )
    }
}

/// Cardinality of a relation, seen from `from_model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// How two models are linked.
///
/// `from_fields` and `to_fields` are parallel lists of equal length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMetadata {
    pub from_model: String,
    pub to_model: String,
    #[serde(default)]
    pub from_fields: Vec<String>,
    #[serde(default)]
    pub to_fields: Vec<String>,
    pub relation_type: RelationType,
}

impl RelationMetadata {
    pub fn new(
        from_model: impl Into<String>,
        to_model: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            from_model: from_model.into(),
            to_model: to_model.into(),
            from_fields: Vec::new(),
            to_fields: Vec::new(),
            relation_type,
        }
    }

    pub fn fields(
        mut self,
        from_fields: impl IntoIterator<Item = impl Into<String>>,
        to_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.from_fields = from_fields.into_iter().map(Into::into).collect();
        self.to_fields = to_fields.into_iter().map(Into::into).collect();
        self
    }

    /// Whether both key lists are present and paired.
    pub fn has_complete_fields(&self) -> bool {
        !self.from_fields.is_empty() && self.from_fields.len() == self.to_fields.len()
    }
}

/// Read-only access to schema metadata.
///
/// # Example
///
/// ```ignore
/// use prismo::metadata::MetadataRegistry;
///
/// fn posts_table(registry: &dyn MetadataRegistry) -> String {
///     registry.get_table_name("Post").unwrap_or_else(|_| "Post".into())
/// }
/// ```
pub trait MetadataRegistry: Send + Sync {
    /// Look up the relation named `relation_name` declared on `from_table`.
    fn get_relation(&self, from_table: &str, relation_name: &str)
        -> MetadataResult<RelationMetadata>;

    /// Physical table name of a model.
    fn get_table_name(&self, model: &str) -> MetadataResult<String>;

    /// Physical column name of a model field.
    fn get_column_name(&self, model: &str, field: &str) -> MetadataResult<String>;
}
