//! Schema statements for a [`SchemaLayout`], rendered per backend by the catalogs.

use sea_query::{
    Alias, ColumnDef, Condition, Expr, ForeignKey, ForeignKeyAction, ForeignKeyCreateStatement,
    ForeignKeyDropStatement, Query, SelectStatement, Table, TableAlterStatement,
};

use crate::{SchemaLayout, VersionType};

pub fn drop_foreign_key(layout: &SchemaLayout) -> ForeignKeyDropStatement {
    ForeignKey::drop()
        .name(&layout.constraint)
        .table(Alias::new(&layout.child_table))
        .to_owned()
}

pub fn create_foreign_key(layout: &SchemaLayout) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(&layout.constraint)
        .from(
            Alias::new(&layout.child_table),
            (
                Alias::new(&layout.name_column),
                Alias::new(&layout.version_column),
            ),
        )
        .to(
            Alias::new(&layout.parent_table),
            (
                Alias::new(&layout.name_column),
                Alias::new(&layout.version_column),
            ),
        )
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

/// Changes the declared type of `table.version`, keeping it `NOT NULL`.
///
/// Postgres can not cast a varchar to an integer implicitly, use
/// [`pg_integer_cast`] for that direction.
pub fn alter_version_column(
    table: &str,
    layout: &SchemaLayout,
    target: VersionType,
) -> TableAlterStatement {
    let mut column = ColumnDef::new(Alias::new(&layout.version_column));

    match target {
        VersionType::Varchar(len) => column.string_len(len),
        VersionType::Integer => column.integer(),
    };

    Table::alter()
        .table(Alias::new(table))
        .modify_column(column.not_null())
        .to_owned()
}

pub fn pg_integer_cast(table: &str, layout: &SchemaLayout) -> String {
    let column = pg_quote(&layout.version_column);

    format!(
        "ALTER TABLE {} ALTER COLUMN {column} TYPE integer USING {column}::integer",
        pg_quote(table)
    )
}

/// Tag rows without a matching model version, both keys cast to `text_type`.
pub fn orphan_tags(layout: &SchemaLayout, text_type: &str, limit: u32) -> SelectStatement {
    let parent = Alias::new(&layout.parent_table);
    let child = Alias::new(&layout.child_table);
    let name = Alias::new(&layout.name_column);
    let version = Alias::new(&layout.version_column);

    Query::select()
        .expr(Expr::col((child.clone(), name.clone())).cast_as(Alias::new(text_type)))
        .expr(Expr::col((child.clone(), version.clone())).cast_as(Alias::new(text_type)))
        .from(child.clone())
        .left_join(
            parent.clone(),
            Condition::all()
                .add(Expr::col((child.clone(), name.clone())).equals((parent.clone(), name.clone())))
                .add(Expr::col((child, version.clone())).equals((parent.clone(), version))),
        )
        .and_where(Expr::col((parent, name)).is_null())
        .limit(u64::from(limit))
        .to_owned()
}

fn pg_quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
