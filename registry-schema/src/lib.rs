//! Idempotent reconciliation of the model registry `version` columns.
//!
//! The model registry stores a model version key as `(name, version)` in two
//! tables: `model_versions` and `model_version_tags`, linked by the foreign key
//! `model_version_tags_name_version_fkey`. The application compares `version`
//! as a string, so both columns must be declared as `VARCHAR`.
//!
//! [`Reconciler::reconcile`] converges both columns to a string type from any
//! reachable prior state (both integer, already string, or a half applied run
//! that left the constraint dropped). It only touches what still differs from
//! the target and never changes whether the foreign key exists.
//!
//! # Features
//!
//! - **`memory`** - Enables [`MemoryCatalog`], an in-process schema model
//! - **`pg`** - Implements [`Catalog`] for `sqlx::PgConnection`
//! - **`mysql`** - Implements [`Catalog`] for `sqlx::MySqlConnection`
//!
//! # Usage
//!
//! ```rust,ignore
//! use registry_schema::{Outcome, Reconciler};
//!
//! let mut conn = pool.acquire().await?;
//! match Reconciler::default().reconcile(&mut *conn).await? {
//!     Outcome::NoOp => {}
//!     Outcome::Converged { altered, .. } => println!("altered {altered:?}"),
//! }
//! ```

#![forbid(unsafe_code)]

mod catalog;
mod config;
mod error;
mod reconciler;
pub mod statement;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use reconciler::*;
