use tracing::{debug, error, info, warn};

use crate::{
    error::{ReconcileError, Result, Step},
    Catalog, ColumnType, ReconcileConfig, VersionType,
};

/// What [`Reconciler::reconcile`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Neither version column was an integer, nothing was altered.
    NoOp,
    /// `altered` lists the tables whose version column was converted.
    Converged {
        altered: Vec<String>,
        constraint_restored: bool,
    },
}

/// What [`Reconciler::revert`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversion {
    pub constraint_restored: bool,
}

/// Converges both version columns to a string type.
///
/// The procedure measures the schema first and only acts on what differs
/// from the target, so it can be re-run after a partial failure:
///
/// 1. Read the declared type of both version columns.
/// 2. Stop if none of them is an integer.
/// 3. Drop the foreign key if it exists.
/// 4. Convert each integer column, leave the others untouched.
/// 5. Recreate the foreign key only if step 3 dropped it.
///
/// The presence of the foreign key is the same before and after a
/// successful call.
///
/// Tag rows without a model version are looked up whenever both columns end
/// up converted without a foreign key, so a schema that has no constraint on
/// purpose must still be free of orphan rows for `reconcile` to succeed.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub async fn reconcile<C: Catalog + ?Sized>(&self, catalog: &mut C) -> Result<Outcome> {
        let layout = &self.config.layout;

        debug!(
            transactional_ddl = catalog.transactional_ddl(),
            parent_table = %layout.parent_table,
            child_table = %layout.child_table,
            "reconciling version columns"
        );

        let parent = self.inspect(catalog, &layout.parent_table).await?;
        let child = self.inspect(catalog, &layout.child_table).await?;
        let columns = [(&layout.parent_table, &parent), (&layout.child_table, &child)];

        for (table, column_type) in columns {
            if let ColumnType::Other(data_type) = column_type {
                warn!(
                    table = %table,
                    column = %layout.version_column,
                    data_type = %data_type,
                    "version column is neither an integer nor a string, leaving it as is"
                );
            }
        }

        let known_types = columns
            .iter()
            .all(|(_, t)| t.is_integer() || t.is_string());

        if !parent.is_integer() && !child.is_integer() {
            // A previous run may have stopped between the conversion and the
            // foreign key, keep reporting it until the data is fixed.
            if known_types && !self.constraint_exists(catalog).await? {
                self.audit(catalog).await?;
            }

            info!(
                parent_table = %layout.parent_table,
                child_table = %layout.child_table,
                "version columns already converged"
            );

            return Ok(Outcome::NoOp);
        }

        let constraint_existed = self.constraint_exists(catalog).await?;

        if constraint_existed {
            self.drop_constraint(catalog).await?;
        }

        let target = VersionType::Varchar(self.config.version_len);
        let mut altered = Vec::new();

        for (table, column_type) in columns {
            if !column_type.is_integer() {
                continue;
            }

            self.alter(catalog, table, target).await?;
            altered.push(table.to_owned());
        }

        if constraint_existed {
            self.restore_constraint(catalog, known_types).await?;
        } else if known_types {
            self.audit(catalog).await?;
        }

        Ok(Outcome::Converged {
            altered,
            constraint_restored: constraint_existed,
        })
    }

    /// Turns both version columns back into integers.
    ///
    /// Both columns are altered whatever their current type. This fails, or
    /// truncates on lenient engines, as soon as a version is not numeric.
    pub async fn revert<C: Catalog + ?Sized>(&self, catalog: &mut C) -> Result<Reversion> {
        let layout = &self.config.layout;

        for table in layout.tables() {
            self.inspect(catalog, table).await?;
        }

        warn!(
            parent_table = %layout.parent_table,
            child_table = %layout.child_table,
            "reverting version columns to integer, non numeric versions will make it fail"
        );

        let constraint_existed = self.constraint_exists(catalog).await?;

        if constraint_existed {
            self.drop_constraint(catalog).await?;
        }

        for table in layout.tables() {
            self.alter(catalog, table, VersionType::Integer).await?;
        }

        if constraint_existed {
            self.restore_constraint(catalog, true).await?;
        }

        Ok(Reversion {
            constraint_restored: constraint_existed,
        })
    }

    async fn inspect<C: Catalog + ?Sized>(&self, catalog: &mut C, table: &str) -> Result<ColumnType> {
        let column = &self.config.layout.version_column;

        catalog
            .column_type(table, column)
            .await
            .map_err(|e| ReconcileError::connectivity(Step::InspectColumn, e))?
            .ok_or_else(|| ReconcileError::MissingColumn {
                table: table.to_owned(),
                column: column.to_owned(),
            })
    }

    async fn constraint_exists<C: Catalog + ?Sized>(&self, catalog: &mut C) -> Result<bool> {
        catalog
            .foreign_key_exists(&self.config.layout)
            .await
            .map_err(|e| ReconcileError::connectivity(Step::InspectConstraint, e))
    }

    async fn drop_constraint<C: Catalog + ?Sized>(&self, catalog: &mut C) -> Result<()> {
        let layout = &self.config.layout;

        catalog
            .drop_foreign_key(layout)
            .await
            .map_err(|e| ReconcileError::from_sqlx(Step::DropConstraint, &layout.child_table, e))?;

        info!(constraint = %layout.constraint, table = %layout.child_table, "foreign key dropped");

        Ok(())
    }

    async fn alter<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        table: &str,
        target: VersionType,
    ) -> Result<()> {
        let layout = &self.config.layout;

        catalog
            .alter_version_column(table, layout, target)
            .await
            .map_err(|e| ReconcileError::from_sqlx(Step::AlterColumn, table, e))?;

        info!(
            table = %table,
            column = %layout.version_column,
            target = ?target,
            "version column altered"
        );

        Ok(())
    }

    async fn restore_constraint<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        audit: bool,
    ) -> Result<()> {
        let layout = &self.config.layout;

        if audit {
            self.audit(catalog).await?;
        }

        if let Err(err) = catalog.create_foreign_key(layout).await {
            if crate::error::is_connectivity(&err) {
                return Err(ReconcileError::connectivity(Step::CreateConstraint, err));
            }

            error!(
                constraint = %layout.constraint,
                error = %err,
                "foreign key could not be recreated, it stays dropped"
            );

            return Err(ReconcileError::SchemaIntegrity {
                constraint: layout.constraint.to_owned(),
                orphans: vec![],
                source: Some(err),
            });
        }

        info!(constraint = %layout.constraint, table = %layout.child_table, "foreign key recreated");

        Ok(())
    }

    /// Fails when any orphan tag row exists, reporting up to the configured sample.
    async fn audit<C: Catalog + ?Sized>(&self, catalog: &mut C) -> Result<()> {
        let layout = &self.config.layout;

        // Always fetch at least one row, an empty sample must not hide orphans.
        let mut orphans = catalog
            .orphan_tags(layout, self.config.orphan_sample.max(1))
            .await
            .map_err(|e| ReconcileError::from_sqlx(Step::Audit, &layout.child_table, e))?;

        if orphans.is_empty() {
            return Ok(());
        }

        orphans.truncate(self.config.orphan_sample as usize);

        error!(
            constraint = %layout.constraint,
            sample = orphans.len(),
            "tag rows reference missing model versions, foreign key stays dropped"
        );

        Err(ReconcileError::SchemaIntegrity {
            constraint: layout.constraint.to_owned(),
            orphans,
            source: None,
        })
    }
}
