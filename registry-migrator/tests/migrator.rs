use sqlx_migrator::Migration;

#[cfg(feature = "postgres")]
#[test]
fn migrations_register() {
    assert!(registry_migrator::new::<sqlx::Postgres>().is_ok());

    #[cfg(feature = "mysql")]
    assert!(registry_migrator::new::<sqlx::MySql>().is_ok());
}

#[cfg(feature = "postgres")]
#[test]
fn m0001_identity() {
    let migration = registry_migrator::M0001;

    assert_eq!(
        Migration::<sqlx::Postgres>::app(&migration),
        "model_registry"
    );
    assert_eq!(
        Migration::<sqlx::Postgres>::name(&migration),
        "m0001_version_column_varchar"
    );
    assert!(Migration::<sqlx::Postgres>::parents(&migration).is_empty());
}
