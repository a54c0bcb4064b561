use async_trait::async_trait;
use sea_query::MysqlQueryBuilder;
use sqlx::MySqlConnection;

use crate::{statement, Catalog, ColumnType, OrphanTag, SchemaLayout, VersionType};

// MySQL commits every DDL statement on its own, reconciliation relies on
// being re-runnable instead of on a rollback.
#[async_trait]
impl Catalog for MySqlConnection {
    async fn column_type(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnType>, sqlx::Error> {
        let data_type = sqlx::query_scalar::<_, String>(
            r#"
            SELECT CAST(DATA_TYPE AS CHAR) FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?
            "#,
        )
        .bind(table)
        .bind(column)
        .fetch_optional(&mut *self)
        .await?;

        Ok(data_type.as_deref().map(ColumnType::from_data_type))
    }

    async fn foreign_key_exists(&mut self, layout: &SchemaLayout) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM information_schema.table_constraints
            WHERE table_schema = DATABASE()
                AND table_name = ?
                AND constraint_name = ?
                AND constraint_type = 'FOREIGN KEY'
            "#,
        )
        .bind(&layout.child_table)
        .bind(&layout.constraint)
        .fetch_one(&mut *self)
        .await?;

        Ok(count > 0)
    }

    async fn drop_foreign_key(&mut self, layout: &SchemaLayout) -> Result<(), sqlx::Error> {
        let statment = statement::drop_foreign_key(layout).to_string(MysqlQueryBuilder);
        sqlx::query(&statment).execute(&mut *self).await?;

        Ok(())
    }

    async fn create_foreign_key(&mut self, layout: &SchemaLayout) -> Result<(), sqlx::Error> {
        let statment = statement::create_foreign_key(layout).to_string(MysqlQueryBuilder);
        sqlx::query(&statment).execute(&mut *self).await?;

        Ok(())
    }

    async fn alter_version_column(
        &mut self,
        table: &str,
        layout: &SchemaLayout,
        target: VersionType,
    ) -> Result<(), sqlx::Error> {
        let statment =
            statement::alter_version_column(table, layout, target).to_string(MysqlQueryBuilder);
        sqlx::query(&statment).execute(&mut *self).await?;

        Ok(())
    }

    async fn orphan_tags(
        &mut self,
        layout: &SchemaLayout,
        limit: u32,
    ) -> Result<Vec<OrphanTag>, sqlx::Error> {
        let statment = statement::orphan_tags(layout, "char", limit).to_string(MysqlQueryBuilder);
        let rows = sqlx::query_as::<_, (String, String)>(&statment)
            .fetch_all(&mut *self)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, version)| OrphanTag { name, version })
            .collect())
    }

    fn transactional_ddl(&self) -> bool {
        false
    }
}
