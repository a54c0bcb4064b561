use registry_schema::{Outcome, Reconciler};
use tracing::info;

pub struct Operation;

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::NoOp => info!("m0001: version columns were already strings"),
        Outcome::Converged {
            altered,
            constraint_restored,
        } => info!(
            altered = ?altered,
            constraint_restored = constraint_restored,
            "m0001: version columns converted"
        ),
    }
}

#[cfg(feature = "mysql")]
#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::MySql> for Operation {
    async fn up(&self, connection: &mut sqlx::MySqlConnection) -> Result<(), sqlx_migrator::Error> {
        let outcome = Reconciler::default()
            .reconcile(connection)
            .await
            .map_err(sqlx::Error::from)?;

        log_outcome(&outcome);

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::MySqlConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        Reconciler::default()
            .revert(connection)
            .await
            .map_err(sqlx::Error::from)?;

        Ok(())
    }
}

#[cfg(feature = "postgres")]
#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Postgres> for Operation {
    async fn up(&self, connection: &mut sqlx::PgConnection) -> Result<(), sqlx_migrator::Error> {
        let outcome = Reconciler::default()
            .reconcile(connection)
            .await
            .map_err(sqlx::Error::from)?;

        log_outcome(&outcome);

        Ok(())
    }

    async fn down(&self, connection: &mut sqlx::PgConnection) -> Result<(), sqlx_migrator::Error> {
        Reconciler::default()
            .revert(connection)
            .await
            .map_err(sqlx::Error::from)?;

        Ok(())
    }
}
