use async_trait::async_trait;

use crate::{OrphanTag, SchemaLayout};

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "pg")]
mod pg;

#[cfg(feature = "memory")]
pub use memory::*;

/// Declared type of a column as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    String,
    Other(String),
}

impl ColumnType {
    /// Classifies a data type name from `information_schema.columns`.
    ///
    /// Names are matched exactly, `interval` or `point` are not integers.
    pub fn from_data_type(data_type: &str) -> Self {
        let data_type = data_type.trim().to_lowercase();

        match data_type.as_str() {
            "smallint" | "integer" | "int" | "bigint" | "tinyint" | "mediumint" | "int2"
            | "int4" | "int8" => Self::Integer,
            "character varying" | "varchar" | "character" | "char" | "text" | "tinytext"
            | "mediumtext" | "longtext" => Self::String,
            _ => Self::Other(data_type),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }
}

/// Type a version column is altered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionType {
    Varchar(u32),
    Integer,
}

/// Introspection and DDL over a single live connection.
///
/// Every method maps to one statement; the caller decides the order and
/// owns the transaction, if any.
#[async_trait]
pub trait Catalog: Send {
    /// `None` when the table or the column does not exist.
    async fn column_type(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnType>, sqlx::Error>;

    async fn foreign_key_exists(&mut self, layout: &SchemaLayout) -> Result<bool, sqlx::Error>;

    async fn drop_foreign_key(&mut self, layout: &SchemaLayout) -> Result<(), sqlx::Error>;

    async fn create_foreign_key(&mut self, layout: &SchemaLayout) -> Result<(), sqlx::Error>;

    async fn alter_version_column(
        &mut self,
        table: &str,
        layout: &SchemaLayout,
        target: VersionType,
    ) -> Result<(), sqlx::Error>;

    async fn orphan_tags(
        &mut self,
        layout: &SchemaLayout,
        limit: u32,
    ) -> Result<Vec<OrphanTag>, sqlx::Error>;

    /// Whether a failed statement can be rolled back with the ones before it.
    fn transactional_ddl(&self) -> bool;
}
