#![allow(dead_code)]

use registry_schema::{
    Catalog, ColumnType, OrphanTag, Outcome, ReconcileError, Reconciler, Reversion, SchemaLayout,
    Step,
};

pub async fn column_types<C: Catalog>(catalog: &mut C) -> anyhow::Result<[ColumnType; 2]> {
    let layout = SchemaLayout::default();
    let parent = catalog
        .column_type(&layout.parent_table, &layout.version_column)
        .await?;
    let child = catalog
        .column_type(&layout.child_table, &layout.version_column)
        .await?;

    Ok([
        parent.ok_or_else(|| anyhow::anyhow!("parent version column missing"))?,
        child.ok_or_else(|| anyhow::anyhow!("child version column missing"))?,
    ])
}

pub async fn constraint_exists<C: Catalog>(catalog: &mut C) -> anyhow::Result<bool> {
    Ok(catalog.foreign_key_exists(&SchemaLayout::default()).await?)
}

/// Both integer, constraint present, one tag on `("model-a", 1)`.
pub async fn converge_from_integer<C: Catalog>(catalog: &mut C) -> anyhow::Result<()> {
    let reconciler = Reconciler::default();

    let outcome = reconciler.reconcile(catalog).await?;
    assert_eq!(
        outcome,
        Outcome::Converged {
            altered: vec!["model_versions".to_owned(), "model_version_tags".to_owned()],
            constraint_restored: true,
        }
    );

    assert_eq!(
        column_types(catalog).await?,
        [ColumnType::String, ColumnType::String]
    );
    assert!(constraint_exists(catalog).await?);
    assert!(catalog
        .orphan_tags(&SchemaLayout::default(), 10)
        .await?
        .is_empty());

    let outcome = reconciler.reconcile(catalog).await?;
    assert_eq!(outcome, Outcome::NoOp);
    assert!(constraint_exists(catalog).await?);

    Ok(())
}

/// Both string, constraint present.
pub async fn noop_when_converged<C: Catalog>(catalog: &mut C) -> anyhow::Result<()> {
    let outcome = Reconciler::default().reconcile(catalog).await?;

    assert_eq!(outcome, Outcome::NoOp);
    assert_eq!(
        column_types(catalog).await?,
        [ColumnType::String, ColumnType::String]
    );
    assert!(constraint_exists(catalog).await?);

    Ok(())
}

/// Parent string, child integer, constraint absent.
pub async fn converge_mixed_without_constraint<C: Catalog>(
    catalog: &mut C,
) -> anyhow::Result<()> {
    let outcome = Reconciler::default().reconcile(catalog).await?;

    assert_eq!(
        outcome,
        Outcome::Converged {
            altered: vec!["model_version_tags".to_owned()],
            constraint_restored: false,
        }
    );
    assert_eq!(
        column_types(catalog).await?,
        [ColumnType::String, ColumnType::String]
    );
    assert!(!constraint_exists(catalog).await?);

    Ok(())
}

/// Both integer, an unvalidated constraint, a tag on `("model-b", 9)` without
/// model version.
pub async fn integrity_failure_is_reported_on_retry<C: Catalog>(
    catalog: &mut C,
) -> anyhow::Result<()> {
    let reconciler = Reconciler::default();
    let expected = vec![OrphanTag {
        name: "model-b".to_owned(),
        version: "9".to_owned(),
    }];

    let err = reconciler.reconcile(catalog).await.unwrap_err();
    match err {
        ReconcileError::SchemaIntegrity {
            constraint,
            orphans,
            ..
        } => {
            assert_eq!(constraint, "model_version_tags_name_version_fkey");
            assert_eq!(orphans, expected);
        }
        err => panic!("unexpected error {err}"),
    }

    assert_eq!(
        column_types(catalog).await?,
        [ColumnType::String, ColumnType::String]
    );
    assert!(!constraint_exists(catalog).await?);

    let err = reconciler.reconcile(catalog).await.unwrap_err();
    assert!(err.is_schema_integrity());

    Ok(())
}

/// Both integer, constraint present.
pub async fn round_trip<C: Catalog>(catalog: &mut C) -> anyhow::Result<()> {
    let reconciler = Reconciler::default();

    reconciler.reconcile(catalog).await?;
    let reversion = reconciler.revert(catalog).await?;

    assert_eq!(
        reversion,
        Reversion {
            constraint_restored: true
        }
    );
    assert_eq!(
        column_types(catalog).await?,
        [ColumnType::Integer, ColumnType::Integer]
    );
    assert!(constraint_exists(catalog).await?);

    Ok(())
}

/// Both string, constraint absent, one tag on `("model-a", "1")`.
pub async fn revert_without_constraint<C: Catalog>(catalog: &mut C) -> anyhow::Result<()> {
    let reversion = Reconciler::default().revert(catalog).await?;

    assert_eq!(
        reversion,
        Reversion {
            constraint_restored: false
        }
    );
    assert_eq!(
        column_types(catalog).await?,
        [ColumnType::Integer, ColumnType::Integer]
    );
    assert!(!constraint_exists(catalog).await?);

    Ok(())
}

/// Both string, constraint present, a model version `("model-c", "v1")`.
pub async fn revert_rejects_non_numeric<C: Catalog>(catalog: &mut C) -> anyhow::Result<()> {
    let err = Reconciler::default().revert(catalog).await.unwrap_err();

    match err {
        ReconcileError::Alteration {
            step: Step::AlterColumn,
            table,
            source,
        } => {
            assert_eq!(table, "model_versions");
            assert!(
                matches!(source, sqlx::Error::Database(_)),
                "unexpected driver error {source}"
            );
        }
        err => panic!("unexpected error {err}"),
    }

    Ok(())
}

/// No registry tables at all.
pub async fn missing_table<C: Catalog>(catalog: &mut C) -> anyhow::Result<()> {
    let err = Reconciler::default().reconcile(catalog).await.unwrap_err();

    match err {
        ReconcileError::MissingColumn { table, column } => {
            assert_eq!(table, "model_versions");
            assert_eq!(column, "version");
        }
        err => panic!("unexpected error {err}"),
    }

    Ok(())
}
