//! Schema metadata boundary.
//!
//! The compiler consumes relation, table and column metadata through the
//! [`MetadataRegistry`] trait. The registry is produced by an external schema
//! analysis step; [`StaticRegistry`] is the in-memory implementation used by
//! callers that already hold the analysed schema.

mod provider;
mod registry;

pub use provider::{
    MetadataError, MetadataRegistry, MetadataResult, RelationMetadata, RelationType,
};
pub use registry::{StaticRegistry, StaticRegistryBuilder};
