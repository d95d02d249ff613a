use std::fmt;

use log::{debug, warn};
use shelf::database::{DatabaseColumn, DatabaseDefault, DatabaseSchema, DatabaseType};
use sqlx::{Executor, MySqlPool};

use crate::error::Error;

/// What to do with a table that already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// Create missing tables only. Existing tables are checked, never altered.
    Create,
    /// Also add and modify columns, keys and unique indexes. Columns are
    /// never dropped.
    Alter,
}

impl Default for SyncMode {
    fn default() -> Self {
        SyncMode::Create
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SyncResult {
    pub created: bool,
    pub queries_executed: usize,
    pub rows_affected: u64,
}

impl SyncResult {
    fn merge(self, other: SyncResult) -> SyncResult {
        SyncResult {
            created: self.created || other.created,
            queries_executed: self.queries_executed + other.queries_executed,
            rows_affected: self.rows_affected + other.rows_affected,
        }
    }
}

/// A single difference between a model and its live table.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    AddColumn(DatabaseColumn),
    SetPrimaryKey { columns: Vec<String>, replace: bool },
    ModifyColumn {
        column: DatabaseColumn,
        found: DatabaseColumn,
    },
    AddUnique(String),
    DropUnique { column: String, index: String },
    /// Present in the database but not in the model. Reported only.
    ExtraColumn(String),
}

impl Change {
    pub fn sql(&self, table: &str) -> Option<String> {
        let table = quote_ident(table);

        let sql = match self {
            Change::AddColumn(column) => {
                let unique = if column.unique { " UNIQUE" } else { "" };
                format!(
                    "ALTER TABLE {} ADD COLUMN {}{};",
                    table,
                    write_column_sql(column),
                    unique
                )
            }
            Change::SetPrimaryKey { columns, replace } => {
                let drop = if *replace { "DROP PRIMARY KEY, " } else { "" };
                format!(
                    "ALTER TABLE {} {}ADD PRIMARY KEY ({});",
                    table,
                    drop,
                    quote_list(columns.as_slice())
                )
            }
            Change::ModifyColumn { column, .. } => {
                format!(
                    "ALTER TABLE {} MODIFY COLUMN {};",
                    table,
                    write_column_sql(column)
                )
            }
            Change::AddUnique(column) => format!(
                "ALTER TABLE {table} ADD UNIQUE INDEX {column} ({column});",
                table = table,
                column = quote_ident(column)
            ),
            Change::DropUnique { index, .. } => format!(
                "ALTER TABLE {} DROP INDEX {};",
                table,
                quote_ident(index)
            ),
            Change::ExtraColumn(_) => return None,
        };

        Some(sql)
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, Change::ExtraColumn(_))
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::AddColumn(column) => write!(f, "column `{}` is missing", column.name),
            Change::SetPrimaryKey { columns, .. } => {
                write!(f, "primary key should be ({})", quote_list(columns.as_slice()))
            }
            Change::ModifyColumn { column, found } => write!(
                f,
                "column `{}` is {}, expected {}",
                column.name,
                describe_column(found),
                describe_column(column)
            ),
            Change::AddUnique(column) => write!(f, "column `{}` should be unique", column),
            Change::DropUnique { column, .. } => {
                write!(f, "column `{}` should not be unique", column)
            }
            Change::ExtraColumn(column) => {
                write!(f, "column `{}` is not declared by the model", column)
            }
        }
    }
}

/// A single-column unique index other than the primary key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueIndex {
    pub name: String,
    pub column: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TablePlan {
    Create(String),
    InSync,
    Drift(Vec<Change>),
}

pub struct DatabaseCompiler<'pool> {
    pool: &'pool MySqlPool,
    tables: Vec<DatabaseSchema>,
}

impl<'pool> DatabaseCompiler<'pool> {
    pub fn from_pool(pool: &'pool MySqlPool, tables: Vec<DatabaseSchema>) -> DatabaseCompiler<'pool> {
        DatabaseCompiler { pool, tables }
    }

    pub fn tables(&self) -> &[DatabaseSchema] {
        &self.tables
    }

    pub async fn plan(&self) -> Result<Vec<TablePlan>, Error> {
        let mut plans = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            plans.push(self.plan_table(table).await?);
        }
        Ok(plans)
    }

    pub async fn plan_table(&self, table: &DatabaseSchema) -> Result<TablePlan, Error> {
        let plan = match self.fetch_table(table).await? {
            Some(db_columns) => {
                let unique_indexes = self.fetch_unique_indexes(table).await?;
                let changes = diff_table(table, &db_columns, &unique_indexes);
                if changes.is_empty() {
                    TablePlan::InSync
                } else {
                    TablePlan::Drift(changes)
                }
            }
            None => TablePlan::Create(write_table_create_sql(table)),
        };

        Ok(plan)
    }

    /// The SQL [`SyncMode::Alter`] would execute, one statement per line.
    pub async fn compile(&self) -> Result<String, Error> {
        let mut sql = String::new();

        for (table, plan) in self.tables.iter().zip(self.plan().await?) {
            match plan {
                TablePlan::Create(create) => {
                    sql.push_str(&create);
                    sql.push('\n');
                }
                TablePlan::InSync => {}
                TablePlan::Drift(changes) => {
                    for statement in changes
                        .iter()
                        .filter_map(|change| change.sql(&table.table_name))
                    {
                        sql.push_str(&statement);
                        sql.push('\n');
                    }
                }
            }
        }

        Ok(sql.trim().to_string())
    }

    pub async fn sync(&self, mode: SyncMode) -> Result<SyncResult, Error> {
        let mut result = SyncResult::default();
        for table in &self.tables {
            result = result.merge(self.sync_table(table, mode).await?);
        }
        Ok(result)
    }

    pub async fn sync_table(
        &self,
        table: &DatabaseSchema,
        mode: SyncMode,
    ) -> Result<SyncResult, Error> {
        let changes = match self.plan_table(table).await? {
            TablePlan::Create(create) => {
                let result = self.execute(&[create]).await?;
                return Ok(SyncResult {
                    created: true,
                    ..result
                });
            }
            TablePlan::InSync => return Ok(SyncResult::default()),
            TablePlan::Drift(changes) => changes,
        };

        let (applicable, extra): (Vec<_>, Vec<_>) =
            changes.into_iter().partition(Change::is_applicable);
        for change in &extra {
            warn!("table `{}`: {}", table.table_name, change);
        }

        if applicable.is_empty() {
            return Ok(SyncResult::default());
        }

        match mode {
            SyncMode::Create => Err(Error::Drift {
                table: table.table_name.clone(),
                changes: applicable.iter().map(Change::to_string).collect(),
            }),
            SyncMode::Alter => {
                let statements: Vec<_> = applicable
                    .iter()
                    .filter_map(|change| change.sql(&table.table_name))
                    .collect();
                self.execute(&statements).await
            }
        }
    }

    async fn execute(&self, statements: &[String]) -> Result<SyncResult, Error> {
        let mut result = SyncResult::default();

        for statement in statements {
            debug!("executing: {}", statement);
            let done = self.pool.execute(statement.as_str()).await?;
            result.queries_executed += 1;
            result.rows_affected += done.rows_affected();
        }

        Ok(result)
    }

    /// Reads the live columns of `table`, or `None` if it does not exist.
    pub async fn fetch_table(
        &self,
        table: &DatabaseSchema,
    ) -> Result<Option<Vec<DatabaseColumn>>, Error> {
        #[derive(Debug, sqlx::FromRow)]
        struct ColumnsQuery {
            column_name: String,
            column_default: Option<String>,
            is_nullable: String,
            data_type: String,
            column_type: String,
            character_maximum_length: Option<i64>,
            column_key: String,
            extra: String,
        }

        let raw_columns: Vec<ColumnsQuery> = sqlx::query_as(FETCH_TABLE_QUERY)
            .bind(&table.table_name)
            .fetch_all(self.pool)
            .await?;

        if raw_columns.is_empty() {
            return Ok(None);
        }

        let columns = raw_columns
            .into_iter()
            .map(|col| {
                let ty = DatabaseType::from_information_schema(
                    &col.data_type,
                    &col.column_type,
                    col.character_maximum_length,
                )
                .map_err(|_| {
                    Error::UnsupportedType(table.table_name.clone(), col.column_name.clone())
                })?;

                Ok(DatabaseColumn {
                    name: col.column_name,
                    ty,
                    nullable: col.is_nullable == "YES",
                    default: col
                        .column_default
                        .as_deref()
                        .and_then(DatabaseDefault::from_information_schema),
                    unique: col.column_key == "UNI",
                    primary_key: col.column_key == "PRI",
                    auto_increment: col.extra.to_ascii_lowercase().contains("auto_increment"),
                })
            })
            .collect::<Result<_, Error>>()?;

        Ok(Some(columns))
    }

    pub async fn fetch_unique_indexes(
        &self,
        table: &DatabaseSchema,
    ) -> Result<Vec<UniqueIndex>, Error> {
        #[derive(Debug, sqlx::FromRow)]
        struct IndexesQuery {
            index_name: String,
            column_name: String,
        }

        let indexes: Vec<IndexesQuery> = sqlx::query_as(FETCH_UNIQUE_INDEXES_QUERY)
            .bind(&table.table_name)
            .fetch_all(self.pool)
            .await?;

        Ok(indexes
            .into_iter()
            .map(|index| UniqueIndex {
                name: index.index_name,
                column: index.column_name,
            })
            .collect())
    }
}

/// Compares a model with the columns read from the database, assuming unique
/// indexes are named after their column as shelf creates them.
pub fn diff_columns(table: &DatabaseSchema, db_columns: &[DatabaseColumn]) -> Vec<Change> {
    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut unique = Vec::new();
    // MySQL only accepts AUTO_INCREMENT on a keyed column, so it is set once
    // the key exists.
    let mut auto_increment = Vec::new();

    let schema_pk = table.primary_key_columns();
    let db_pk: Vec<&str> = db_columns
        .iter()
        .filter(|column| column.primary_key)
        .map(|column| column.name.as_str())
        .collect();

    for schema_col in &table.columns {
        let unkeyed = DatabaseColumn {
            auto_increment: false,
            ..schema_col.clone()
        };

        let db_col = match db_columns
            .iter()
            .find(|db_col| db_col.name == schema_col.name)
        {
            Some(db_col) => db_col,
            None => {
                // `ADD COLUMN .. UNIQUE` keys the column in the same statement.
                if schema_col.auto_increment && schema_col.primary_key {
                    added.push(Change::AddColumn(unkeyed.clone()));
                    auto_increment.push(Change::ModifyColumn {
                        column: schema_col.clone(),
                        found: unkeyed,
                    });
                } else {
                    added.push(Change::AddColumn(schema_col.clone()));
                }
                continue;
            }
        };

        let key_pending = if schema_col.primary_key {
            schema_pk != db_pk
        } else {
            schema_col.unique && !db_col.unique
        };
        let defer_auto_increment =
            schema_col.auto_increment && !db_col.auto_increment && key_pending;

        let target = if defer_auto_increment {
            &unkeyed
        } else {
            schema_col
        };
        if column_differs(target, db_col) {
            modified.push(Change::ModifyColumn {
                column: target.clone(),
                found: db_col.clone(),
            });
        }
        if defer_auto_increment {
            auto_increment.push(Change::ModifyColumn {
                column: schema_col.clone(),
                found: unkeyed.clone(),
            });
        }

        if !schema_col.primary_key && schema_col.unique != db_col.unique {
            if schema_col.unique {
                unique.push(Change::AddUnique(schema_col.name.clone()));
            } else {
                unique.push(Change::DropUnique {
                    column: schema_col.name.clone(),
                    index: schema_col.name.clone(),
                });
            }
        }
    }

    let mut changes = added;
    changes.extend(modified);
    if schema_pk != db_pk {
        changes.push(Change::SetPrimaryKey {
            columns: schema_pk.iter().map(|name| name.to_string()).collect(),
            replace: !db_pk.is_empty(),
        });
    }
    changes.extend(unique);
    changes.extend(auto_increment);
    changes.extend(
        db_columns
            .iter()
            .filter(|db_col| table.column(&db_col.name).is_none())
            .map(|db_col| Change::ExtraColumn(db_col.name.clone())),
    );

    changes
}

/// Like [`diff_columns`], dropping unique indexes by the names the database
/// reports for them.
pub fn diff_table(
    table: &DatabaseSchema,
    db_columns: &[DatabaseColumn],
    unique_indexes: &[UniqueIndex],
) -> Vec<Change> {
    diff_columns(table, db_columns)
        .into_iter()
        .flat_map(|change| match change {
            Change::DropUnique { column, index } => {
                let named: Vec<_> = unique_indexes
                    .iter()
                    .filter(|unique_index| unique_index.column == column)
                    .map(|unique_index| Change::DropUnique {
                        column: column.clone(),
                        index: unique_index.name.clone(),
                    })
                    .collect();
                if named.is_empty() {
                    vec![Change::DropUnique { column, index }]
                } else {
                    named
                }
            }
            other => vec![other],
        })
        .collect()
}

fn column_differs(column: &DatabaseColumn, db_col: &DatabaseColumn) -> bool {
    !column.ty.is_equivalent(&db_col.ty)
        || column.nullable != db_col.nullable
        || column.default != db_col.default
        || column.auto_increment != db_col.auto_increment
}

pub fn write_table_create_sql(table: &DatabaseSchema) -> String {
    let mut definitions: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let unique = if column.unique { " UNIQUE" } else { "" };
            format!("  {}{}", write_column_sql(column), unique)
        })
        .collect();

    let primary_key = table.primary_key_columns();
    if !primary_key.is_empty() {
        definitions.push(format!("  PRIMARY KEY ({})", quote_list(primary_key.as_slice())));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n) ENGINE=InnoDB;",
        quote_ident(&table.table_name),
        definitions.join(",\n")
    )
}

/// Column definition as used by `CREATE TABLE`, `ADD COLUMN` and `MODIFY COLUMN`.
/// Keys are declared separately.
pub fn write_column_sql(column: &DatabaseColumn) -> String {
    format!("{} {}", quote_ident(&column.name), describe_column(column))
}

fn describe_column(column: &DatabaseColumn) -> String {
    let mut sql = column.ty.to_string();

    sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });

    if let Some(default) = &column.default {
        sql.push_str(&format!(" DEFAULT {}", default));
    }

    if column.auto_increment {
        sql.push_str(" AUTO_INCREMENT");
    }

    sql
}

fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

fn quote_list<S: AsRef<str>>(idents: &[S]) -> String {
    idents
        .iter()
        .map(|ident| quote_ident(ident.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

const FETCH_TABLE_QUERY: &str = "
SELECT
    CAST(COLUMN_NAME AS CHAR) AS column_name,
    CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
    CAST(IS_NULLABLE AS CHAR) AS is_nullable,
    CAST(DATA_TYPE AS CHAR) AS data_type,
    CAST(COLUMN_TYPE AS CHAR) AS column_type,
    CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS character_maximum_length,
    CAST(COLUMN_KEY AS CHAR) AS column_key,
    CAST(EXTRA AS CHAR) AS extra
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = DATABASE()
AND TABLE_NAME = ?
ORDER BY ORDINAL_POSITION
";

const FETCH_UNIQUE_INDEXES_QUERY: &str = "
SELECT
    CAST(INDEX_NAME AS CHAR) AS index_name,
    CAST(MIN(COLUMN_NAME) AS CHAR) AS column_name
FROM information_schema.STATISTICS
WHERE TABLE_SCHEMA = DATABASE()
AND TABLE_NAME = ?
AND NON_UNIQUE = 0
AND INDEX_NAME <> 'PRIMARY'
GROUP BY INDEX_NAME
HAVING COUNT(*) = 1
ORDER BY INDEX_NAME
";
