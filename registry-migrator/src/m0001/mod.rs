//! Version columns become strings.

mod model_version;

use sqlx_migrator::vec_box;

/// Converts `model_versions.version` and `model_version_tags.version` from
/// integer to `VARCHAR(256)`.
///
/// The foreign key `model_version_tags_name_version_fkey` is dropped while
/// the columns are altered and recreated afterwards, only when it was there
/// to begin with. Reverting turns both columns back into integers and fails
/// if a version is not numeric.
pub struct M0001;

#[cfg(feature = "mysql")]
sqlx_migrator::mysql_migration!(
    M0001,
    "model_registry",
    "m0001_version_column_varchar",
    vec_box![],
    vec_box![model_version::version_column::Operation]
);

#[cfg(feature = "postgres")]
sqlx_migrator::postgres_migration!(
    M0001,
    "model_registry",
    "m0001_version_column_varchar",
    vec_box![],
    vec_box![model_version::version_column::Operation]
);
