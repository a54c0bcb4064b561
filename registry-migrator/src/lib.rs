//! Model registry migrations.
//!
//! The model registry stores model versions in `model_versions` and their tags
//! in `model_version_tags`. Versions used to be integers, this crate ships the
//! migration turning both `version` columns into `VARCHAR(256)` so versions
//! such as `1.2.0-rc1` can be registered.
//!
//! # Features
//!
//! - **`postgres`** - Enables PostgreSQL database support
//! - **`mysql`** - Enables MySQL database support
//!
//! Both features are enabled by default.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sqlx_migrator::{Migrate, Plan};
//!
//! let mut conn = pool.acquire().await?;
//!
//! let migrator = registry_migrator::new::<sqlx::Postgres>()?;
//! migrator.run(&mut *conn, &Plan::apply_all()).await?;
//! ```
//!
//! The operation is backed by [`registry_schema::Reconciler`]: it inspects the
//! live schema and only alters what is still an integer, so the migration can
//! be applied to a database that was partially converged by hand.

use sqlx_migrator::{Info, Migrator};

mod m0001;

pub use m0001::M0001;

/// Creates a new [`Migrator`] with every model registry migration registered.
///
/// # Errors
///
/// Returns an error if migration registration fails.
pub fn new<DB: sqlx::Database>() -> Result<Migrator<DB>, sqlx_migrator::Error>
where
    M0001: sqlx_migrator::Migration<DB>,
{
    let mut migrator = Migrator::default();
    migrator.add_migration(Box::new(M0001))?;

    Ok(migrator)
}
