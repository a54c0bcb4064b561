use async_trait::async_trait;
use sea_query::PostgresQueryBuilder;
use sqlx::{PgConnection, PgPool};

use crate::{
    error::{ReconcileError, Result, Step},
    statement, Catalog, ColumnType, OrphanTag, Outcome, Reconciler, Reversion, SchemaLayout,
    VersionType,
};

#[async_trait]
impl Catalog for PgConnection {
    async fn column_type(
        &mut self,
        table: &str,
        column: &str,
    ) -> std::result::Result<Option<ColumnType>, sqlx::Error> {
        let data_type = sqlx::query_scalar::<_, String>(
            r#"
            SELECT data_type::text FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
            "#,
        )
        .bind(table)
        .bind(column)
        .fetch_optional(&mut *self)
        .await?;

        Ok(data_type.as_deref().map(ColumnType::from_data_type))
    }

    async fn foreign_key_exists(
        &mut self,
        layout: &SchemaLayout,
    ) -> std::result::Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.table_constraints
                WHERE table_schema = current_schema()
                    AND table_name = $1
                    AND constraint_name = $2
                    AND constraint_type = 'FOREIGN KEY'
            )
            "#,
        )
        .bind(&layout.child_table)
        .bind(&layout.constraint)
        .fetch_one(&mut *self)
        .await
    }

    async fn drop_foreign_key(
        &mut self,
        layout: &SchemaLayout,
    ) -> std::result::Result<(), sqlx::Error> {
        let statment = statement::drop_foreign_key(layout).to_string(PostgresQueryBuilder);
        sqlx::query(&statment).execute(&mut *self).await?;

        Ok(())
    }

    async fn create_foreign_key(
        &mut self,
        layout: &SchemaLayout,
    ) -> std::result::Result<(), sqlx::Error> {
        let statment = statement::create_foreign_key(layout).to_string(PostgresQueryBuilder);
        sqlx::query(&statment).execute(&mut *self).await?;

        Ok(())
    }

    async fn alter_version_column(
        &mut self,
        table: &str,
        layout: &SchemaLayout,
        target: VersionType,
    ) -> std::result::Result<(), sqlx::Error> {
        let statment = match target {
            VersionType::Integer => statement::pg_integer_cast(table, layout),
            VersionType::Varchar(_) => statement::alter_version_column(table, layout, target)
                .to_string(PostgresQueryBuilder),
        };
        sqlx::query(&statment).execute(&mut *self).await?;

        Ok(())
    }

    async fn orphan_tags(
        &mut self,
        layout: &SchemaLayout,
        limit: u32,
    ) -> std::result::Result<Vec<OrphanTag>, sqlx::Error> {
        let statment = statement::orphan_tags(layout, "text", limit).to_string(PostgresQueryBuilder);
        let rows = sqlx::query_as::<_, (String, String)>(&statment)
            .fetch_all(&mut *self)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, version)| OrphanTag { name, version })
            .collect())
    }

    fn transactional_ddl(&self) -> bool {
        true
    }
}

impl Reconciler {
    /// Runs [`Reconciler::reconcile`] inside a single transaction.
    ///
    /// Postgres rolls DDL back with the transaction, so a failure at any step
    /// leaves the schema exactly as it was before the call.
    pub async fn reconcile_atomic(&self, pool: &PgPool) -> Result<Outcome> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| ReconcileError::connectivity(Step::Begin, e))?;

        let outcome = self.reconcile(&mut *tx).await?;

        tx.commit()
            .await
            .map_err(|e| ReconcileError::connectivity(Step::Commit, e))?;

        Ok(outcome)
    }

    /// Runs [`Reconciler::revert`] inside a single transaction.
    pub async fn revert_atomic(&self, pool: &PgPool) -> Result<Reversion> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| ReconcileError::connectivity(Step::Begin, e))?;

        let reversion = self.revert(&mut *tx).await?;

        tx.commit()
            .await
            .map_err(|e| ReconcileError::connectivity(Step::Commit, e))?;

        Ok(reversion)
    }
}
