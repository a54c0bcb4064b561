use async_trait::async_trait;
use parking_lot::RwLock;
use std::{collections::HashMap, fmt, sync::Arc};

use crate::{Catalog, ColumnType, OrphanTag, Rejection, SchemaLayout, VersionType};

/// A cell of a [`MemoryCatalog`] row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

/// A structural change applied by a [`MemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    DropForeignKey(String),
    AlterColumn {
        table: String,
        column: String,
        target: VersionType,
    },
    CreateForeignKey(String),
}

pub type Row = HashMap<String, Value>;

#[derive(Debug, Default)]
struct Table {
    columns: HashMap<String, ColumnType>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone)]
struct ForeignKey {
    child_table: String,
    parent_table: String,
    columns: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    foreign_keys: HashMap<String, ForeignKey>,
    changes: Vec<SchemaChange>,
    disconnected: bool,
    budget: Option<usize>,
}

/// In-process schema model.
///
/// Enforces what a database enforces for the reconciliation statements:
/// a column used by a foreign key can not change type, a foreign key is
/// validated against existing rows when created, and a version only becomes
/// an integer if it parses as one. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog(Arc<RwLock<State>>);

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates both registry tables with the given version column types.
    pub fn with_layout(layout: &SchemaLayout, parent: ColumnType, child: ColumnType) -> Self {
        let catalog = Self::new();
        let name = layout.name_column.as_str();
        let version = layout.version_column.as_str();

        catalog.create_table(
            &layout.parent_table,
            &[(name, ColumnType::String), (version, parent)],
        );
        catalog.create_table(
            &layout.child_table,
            &[(name, ColumnType::String), (version, child)],
        );

        catalog
    }

    pub fn create_table(&self, table: &str, columns: &[(&str, ColumnType)]) {
        let columns = columns
            .iter()
            .map(|(name, column_type)| ((*name).to_owned(), column_type.clone()))
            .collect();

        self.0.write().tables.insert(
            table.to_owned(),
            Table {
                columns,
                rows: vec![],
            },
        );
    }

    /// Inserts a row, rejecting it if it breaks an existing foreign key.
    pub fn insert(&self, table: &str, row: &[(&str, Value)]) -> Result<(), sqlx::Error> {
        let mut state = self.0.write();
        let row: Row = row
            .iter()
            .map(|(column, value)| ((*column).to_owned(), value.clone()))
            .collect();

        for (name, fk) in state.foreign_keys.iter() {
            if fk.child_table == table && !has_parent(&state, fk, &row) {
                return Err(violates(
                    name,
                    format!("insert on table \"{table}\" violates foreign key constraint \"{name}\""),
                ));
            }
        }

        let Some(target) = state.tables.get_mut(table) else {
            return Err(rejected(format!("relation \"{table}\" does not exist")));
        };

        target.rows.push(row);

        Ok(())
    }

    /// Adds a foreign key without checking existing rows, like `NOT VALID`.
    pub fn add_foreign_key_unchecked(&self, layout: &SchemaLayout) {
        self.0.write().foreign_keys.insert(
            layout.constraint.to_owned(),
            ForeignKey {
                child_table: layout.child_table.to_owned(),
                parent_table: layout.parent_table.to_owned(),
                columns: vec![
                    layout.name_column.to_owned(),
                    layout.version_column.to_owned(),
                ],
            },
        );
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.0
            .read()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn changes(&self) -> Vec<SchemaChange> {
        self.0.read().changes.clone()
    }

    pub fn clear_changes(&self) {
        self.0.write().changes.clear();
    }

    /// Every following call fails as if the connection was lost.
    pub fn disconnect(&self) {
        self.0.write().disconnected = true;
    }

    pub fn reconnect(&self) {
        let mut state = self.0.write();
        state.disconnected = false;
        state.budget = None;
    }

    /// Lets `changes` more structural changes through, then loses the connection.
    pub fn disconnect_after(&self, changes: usize) {
        self.0.write().budget = Some(changes);
    }

    fn connected(&self) -> Result<(), sqlx::Error> {
        if self.0.read().disconnected {
            return Err(sqlx::Error::PoolClosed);
        }

        Ok(())
    }
}

impl State {
    fn spend(&mut self) -> Result<(), sqlx::Error> {
        match self.budget {
            Some(0) => {
                self.disconnected = true;
                Err(sqlx::Error::PoolClosed)
            }
            Some(n) => {
                self.budget = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn column_type(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnType>, sqlx::Error> {
        self.connected()?;

        Ok(self
            .0
            .read()
            .tables
            .get(table)
            .and_then(|t| t.columns.get(column).cloned()))
    }

    async fn foreign_key_exists(&mut self, layout: &SchemaLayout) -> Result<bool, sqlx::Error> {
        self.connected()?;

        Ok(self
            .0
            .read()
            .foreign_keys
            .get(&layout.constraint)
            .is_some_and(|fk| fk.child_table == layout.child_table))
    }

    async fn drop_foreign_key(&mut self, layout: &SchemaLayout) -> Result<(), sqlx::Error> {
        self.connected()?;

        let mut state = self.0.write();
        state.spend()?;

        if state.foreign_keys.remove(&layout.constraint).is_none() {
            return Err(rejected(format!(
                "constraint \"{}\" of relation \"{}\" does not exist",
                layout.constraint, layout.child_table
            )));
        }

        state
            .changes
            .push(SchemaChange::DropForeignKey(layout.constraint.to_owned()));

        Ok(())
    }

    async fn create_foreign_key(&mut self, layout: &SchemaLayout) -> Result<(), sqlx::Error> {
        self.connected()?;

        let mut state = self.0.write();
        state.spend()?;

        if state.foreign_keys.contains_key(&layout.constraint) {
            return Err(rejected(format!(
                "constraint \"{}\" already exists",
                layout.constraint
            )));
        }

        let fk = ForeignKey {
            child_table: layout.child_table.to_owned(),
            parent_table: layout.parent_table.to_owned(),
            columns: vec![
                layout.name_column.to_owned(),
                layout.version_column.to_owned(),
            ],
        };

        for column in fk.columns.iter() {
            let child = column_type(&state, &fk.child_table, column)?;
            let parent = column_type(&state, &fk.parent_table, column)?;

            if child != parent {
                return Err(rejected(format!(
                    "foreign key constraint \"{}\" cannot be implemented: key column \"{column}\" has incompatible types",
                    layout.constraint
                )));
            }
        }

        let violation = state
            .tables
            .get(&fk.child_table)
            .map(|t| t.rows.iter().any(|row| !has_parent(&state, &fk, row)))
            .unwrap_or(false);

        if violation {
            return Err(violates(
                &layout.constraint,
                format!(
                    "insert or update on table \"{}\" violates foreign key constraint \"{}\"",
                    fk.child_table, layout.constraint
                ),
            ));
        }

        state.foreign_keys.insert(layout.constraint.to_owned(), fk);
        state
            .changes
            .push(SchemaChange::CreateForeignKey(layout.constraint.to_owned()));

        Ok(())
    }

    async fn alter_version_column(
        &mut self,
        table: &str,
        layout: &SchemaLayout,
        target: VersionType,
    ) -> Result<(), sqlx::Error> {
        self.connected()?;

        let mut state = self.0.write();
        state.spend()?;

        let column = layout.version_column.as_str();
        let referenced = state.foreign_keys.iter().find(|(_, fk)| {
            (fk.child_table == table || fk.parent_table == table)
                && fk.columns.iter().any(|c| c == column)
        });

        if let Some((name, _)) = referenced {
            return Err(rejected(format!(
                "cannot alter type of column \"{column}\" used by foreign key \"{name}\""
            )));
        }

        let Some(target_table) = state.tables.get_mut(table) else {
            return Err(rejected(format!("relation \"{table}\" does not exist")));
        };

        if !target_table.columns.contains_key(column) {
            return Err(rejected(format!(
                "column \"{column}\" of relation \"{table}\" does not exist"
            )));
        }

        let mut rows = target_table.rows.clone();
        for row in rows.iter_mut() {
            let Some(value) = row.get(column) else {
                continue;
            };

            let converted = match target {
                VersionType::Varchar(len) => {
                    let value = value.to_string();
                    if value.chars().count() > len as usize {
                        return Err(rejected(format!(
                            "value too long for type character varying({len})"
                        )));
                    }

                    Value::Text(value)
                }
                VersionType::Integer => match value {
                    Value::Int(v) => Value::Int(*v),
                    Value::Text(v) => Value::Int(v.trim().parse().map_err(|_| {
                        rejected(format!("invalid input syntax for type integer: \"{v}\""))
                    })?),
                },
            };

            row.insert(column.to_owned(), converted);
        }

        target_table.rows = rows;
        target_table.columns.insert(
            column.to_owned(),
            match target {
                VersionType::Varchar(_) => ColumnType::String,
                VersionType::Integer => ColumnType::Integer,
            },
        );

        state.changes.push(SchemaChange::AlterColumn {
            table: table.to_owned(),
            column: column.to_owned(),
            target,
        });

        Ok(())
    }

    async fn orphan_tags(
        &mut self,
        layout: &SchemaLayout,
        limit: u32,
    ) -> Result<Vec<OrphanTag>, sqlx::Error> {
        self.connected()?;

        let state = self.0.read();
        let fk = ForeignKey {
            child_table: layout.child_table.to_owned(),
            parent_table: layout.parent_table.to_owned(),
            columns: vec![
                layout.name_column.to_owned(),
                layout.version_column.to_owned(),
            ],
        };

        let Some(child) = state.tables.get(&layout.child_table) else {
            return Err(rejected(format!(
                "relation \"{}\" does not exist",
                layout.child_table
            )));
        };

        Ok(child
            .rows
            .iter()
            .filter(|row| !has_parent(&state, &fk, row))
            .take(limit as usize)
            .map(|row| OrphanTag {
                name: cell(row, &layout.name_column),
                version: cell(row, &layout.version_column),
            })
            .collect())
    }

    fn transactional_ddl(&self) -> bool {
        false
    }
}

fn has_parent(state: &State, fk: &ForeignKey, row: &Row) -> bool {
    let Some(parent) = state.tables.get(&fk.parent_table) else {
        return false;
    };

    parent.rows.iter().any(|candidate| {
        fk.columns
            .iter()
            .all(|c| cell(candidate, c) == cell(row, c))
    })
}

fn column_type(state: &State, table: &str, column: &str) -> Result<ColumnType, sqlx::Error> {
    state
        .tables
        .get(table)
        .and_then(|t| t.columns.get(column).cloned())
        .ok_or_else(|| {
            rejected(format!(
                "column \"{column}\" of relation \"{table}\" does not exist"
            ))
        })
}

fn cell(row: &Row, column: &str) -> String {
    row.get(column).map(|v| v.to_string()).unwrap_or_default()
}

fn rejected(message: String) -> sqlx::Error {
    Rejection::new(message).into()
}

fn violates(constraint: &str, message: String) -> sqlx::Error {
    Rejection::foreign_key(constraint, message).into()
}
