use std::error::Error as StdError;

use parse_display::Display;
use sqlx::error::{DatabaseError, ErrorKind};

/// Step of the reconciliation procedure an error was raised in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(style = "snake_case")]
pub enum Step {
    Begin,
    InspectColumn,
    InspectConstraint,
    DropConstraint,
    AlterColumn,
    CreateConstraint,
    Audit,
    Commit,
}

/// A tag row whose `(name, version)` has no matching model version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanTag {
    pub name: String,
    pub version: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The database could not be reached while running `step`.
    #[error("connectivity lost during {step}: {source}")]
    Connectivity {
        step: Step,
        #[source]
        source: sqlx::Error,
    },

    #[error("column `{table}.{column}` not found")]
    MissingColumn { table: String, column: String },

    /// The foreign key could not be restored once the columns were converted.
    ///
    /// Columns stay converted and the constraint stays absent until the
    /// offending rows are fixed by hand.
    #[error("foreign key `{constraint}` cannot be restored, {} orphan tag row(s){}", .orphans.len(), format_orphans(.orphans))]
    SchemaIntegrity {
        constraint: String,
        orphans: Vec<OrphanTag>,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The database rejected a DDL statement.
    #[error("{step} on `{table}` rejected: {source}")]
    Alteration {
        step: Step,
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

impl ReconcileError {
    /// Classifies a driver error raised while running `step` against `table`.
    pub fn from_sqlx(step: Step, table: impl Into<String>, err: sqlx::Error) -> Self {
        if is_connectivity(&err) {
            return Self::Connectivity { step, source: err };
        }

        Self::Alteration {
            step,
            table: table.into(),
            source: err,
        }
    }

    pub fn connectivity(step: Step, err: sqlx::Error) -> Self {
        Self::Connectivity { step, source: err }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    pub fn is_schema_integrity(&self) -> bool {
        matches!(self, Self::SchemaIntegrity { .. })
    }
}

impl From<ReconcileError> for sqlx::Error {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Connectivity { source, .. }
            | ReconcileError::Alteration { source, .. } => source,
            ReconcileError::MissingColumn { table, column } => {
                sqlx::Error::ColumnNotFound(format!("{table}.{column}"))
            }
            ReconcileError::SchemaIntegrity {
                source: Some(source),
                ..
            } => source,
            ReconcileError::SchemaIntegrity {
                constraint,
                orphans,
                source: None,
            } => {
                let message = ReconcileError::SchemaIntegrity {
                    constraint: constraint.to_owned(),
                    orphans,
                    source: None,
                }
                .to_string();

                Rejection::foreign_key(constraint, message).into()
            }
        }
    }
}

/// A statement refused by the schema, surfaced as [`sqlx::Error::Database`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    message: String,
    constraint: Option<String>,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            constraint: None,
        }
    }

    /// Rows violate the foreign key `constraint`.
    pub fn foreign_key(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            constraint: Some(constraint.into()),
        }
    }
}

impl DatabaseError for Rejection {
    fn message(&self) -> &str {
        &self.message
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    fn kind(&self) -> ErrorKind {
        match self.constraint {
            Some(_) => ErrorKind::ForeignKeyViolation,
            None => ErrorKind::Other,
        }
    }
}

pub(crate) fn is_connectivity(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

fn format_orphans(orphans: &[OrphanTag]) -> String {
    if orphans.is_empty() {
        return String::new();
    }

    let rows = orphans
        .iter()
        .map(|o| format!("({}, {})", o.name, o.version))
        .collect::<Vec<_>>()
        .join(", ");

    format!(": {rows}")
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[test]
    fn classify_driver_errors() {
        let err = ReconcileError::from_sqlx(Step::AlterColumn, "model_versions", sqlx::Error::PoolClosed);
        assert!(err.is_connectivity());

        let err = ReconcileError::from_sqlx(
            Step::AlterColumn,
            "model_versions",
            Rejection::new("invalid input syntax for type integer").into(),
        );
        assert!(matches!(err, ReconcileError::Alteration { step: Step::AlterColumn, .. }));
    }

    #[test]
    fn integrity_message_lists_orphans() {
        let err = ReconcileError::SchemaIntegrity {
            constraint: "fk".to_owned(),
            orphans: vec![OrphanTag {
                name: "model-a".to_owned(),
                version: "7".to_owned(),
            }],
            source: None,
        };

        assert_eq!(
            err.to_string(),
            "foreign key `fk` cannot be restored, 1 orphan tag row(s): (model-a, 7)"
        );
        assert_eq!(Step::CreateConstraint.to_string(), "create_constraint");

        match sqlx::Error::from(err) {
            sqlx::Error::Database(err) => {
                assert!(matches!(err.kind(), ErrorKind::ForeignKeyViolation));
                assert_eq!(err.constraint(), Some("fk"));
                assert!(err.message().contains("(model-a, 7)"));
            }
            err => panic!("unexpected error {err}"),
        }
    }

    #[test]
    fn integrity_keeps_driver_error() {
        let err = ReconcileError::SchemaIntegrity {
            constraint: "fk".to_owned(),
            orphans: vec![],
            source: Some(Rejection::foreign_key("fk", "violates foreign key constraint").into()),
        };

        match sqlx::Error::from(err) {
            sqlx::Error::Database(err) => {
                assert_eq!(err.message(), "violates foreign key constraint");
            }
            err => panic!("unexpected error {err}"),
        }
    }
}
