//! Names and limits the reconciler works with.
//!
//! The defaults describe the model registry schema. Every name is a parameter
//! so the same convergence logic can be pointed at a prefixed or renamed copy
//! of the tables.

use serde::Deserialize;

/// Table holding one row per model version, keyed by `(name, version)`.
pub const DEFAULT_PARENT_TABLE: &str = "model_versions";

/// Table holding the tags of a model version.
pub const DEFAULT_CHILD_TABLE: &str = "model_version_tags";

pub const DEFAULT_NAME_COLUMN: &str = "name";

pub const DEFAULT_VERSION_COLUMN: &str = "version";

/// Foreign key `(child.name, child.version) -> (parent.name, parent.version)`.
pub const DEFAULT_CONSTRAINT: &str = "model_version_tags_name_version_fkey";

/// Maximum length of the string type the version columns are converted to.
pub const DEFAULT_VERSION_LEN: u32 = 256;

/// Maximum number of orphan rows reported in a schema integrity error.
pub const DEFAULT_ORPHAN_SAMPLE: u32 = 20;

/// The two tables, their key columns and the constraint linking them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchemaLayout {
    pub parent_table: String,
    pub child_table: String,
    pub name_column: String,
    pub version_column: String,
    pub constraint: String,
}

impl Default for SchemaLayout {
    fn default() -> Self {
        Self {
            parent_table: DEFAULT_PARENT_TABLE.to_owned(),
            child_table: DEFAULT_CHILD_TABLE.to_owned(),
            name_column: DEFAULT_NAME_COLUMN.to_owned(),
            version_column: DEFAULT_VERSION_COLUMN.to_owned(),
            constraint: DEFAULT_CONSTRAINT.to_owned(),
        }
    }
}

impl SchemaLayout {
    /// Parent table first, then child table.
    pub fn tables(&self) -> [&str; 2] {
        [self.parent_table.as_str(), self.child_table.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub layout: SchemaLayout,
    pub version_len: u32,
    pub orphan_sample: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            layout: SchemaLayout::default(),
            version_len: DEFAULT_VERSION_LEN,
            orphan_sample: DEFAULT_ORPHAN_SAMPLE,
        }
    }
}

/// Builder for a [`ReconcileConfig`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: ReconcileConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent_table(mut self, name: impl Into<String>) -> Self {
        self.config.layout.parent_table = name.into();
        self
    }

    pub fn child_table(mut self, name: impl Into<String>) -> Self {
        self.config.layout.child_table = name.into();
        self
    }

    pub fn name_column(mut self, name: impl Into<String>) -> Self {
        self.config.layout.name_column = name.into();
        self
    }

    pub fn version_column(mut self, name: impl Into<String>) -> Self {
        self.config.layout.version_column = name.into();
        self
    }

    pub fn constraint(mut self, name: impl Into<String>) -> Self {
        self.config.layout.constraint = name.into();
        self
    }

    pub fn version_len(mut self, len: u32) -> Self {
        self.config.version_len = len;
        self
    }

    pub fn orphan_sample(mut self, limit: u32) -> Self {
        self.config.orphan_sample = limit;
        self
    }

    pub fn build(self) -> ReconcileConfig {
        self.config
    }
}
