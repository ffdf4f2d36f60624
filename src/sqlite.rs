//! Facade over a single SQLite connection: table management, row CRUD,
//! and schema introspection.
//!
//! Every operation maps one-to-one onto SQL statements executed through
//! `rusqlite`. Row values are always bound as positional parameters;
//! table names, column definitions, and condition fragments are passed
//! through verbatim as caller-trusted SQL text.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use futures::future;
use futures::lock::Mutex;
use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Conventional database file name, resolved against the working directory.
pub const DEFAULT_DB_PATH: &str = "my_database.db";

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_bytes(b),
            Value::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            // SQLite has no boolean storage class; booleans are stored as 0/1
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// An ordered mapping from column name to value.
///
/// Insertion order of columns determines the generated column list and
/// placeholder order in `INSERT` and `UPDATE` statements.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column value, keeping insertion order
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column value; an existing column keeps its position.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        if let Some(slot) = self.columns.iter_mut().find(|(name, _)| name == column) {
            slot.1 = value;
        } else {
            self.columns.push((column.to_string(), value));
        }
    }

    /// Look up a value by column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A column as reported by the engine's schema introspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: String,
}

/// A table together with its declared columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// The allowed `ALTER TABLE` operations; `as_sql` yields the literal
/// keyword inserted into the generated statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterOperation {
    Add,
    Drop,
}

impl AlterOperation {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AlterOperation::Add => "ADD",
            AlterOperation::Drop => "DROP",
        }
    }
}

impl FromStr for AlterOperation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ADD" => Ok(AlterOperation::Add),
            "DROP" => Ok(AlterOperation::Drop),
            other => Err(StoreError::InvalidAlterOperation(other.to_string())),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreConfig {
    /// Path to the SQLite database file; `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self { db_path: None }
    }

    pub fn at_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(db_path.into()),
        }
    }
}

/// Facade over one exclusively-owned SQLite connection.
///
/// The connection sits behind an async mutex that serializes statement
/// execution; multi-item operations issue their sub-statements as a
/// joined batch. The connection lives until [`SqliteStore::close`]
/// consumes the store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a file-backed or in-memory database per the config.
    ///
    /// Foreign-key enforcement is switched on right after opening. A
    /// failure to enable it is logged and ignored rather than failing
    /// construction.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let conn = match &config.db_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        if let Err(e) = conn.pragma_update(None, "foreign_keys", true) {
            tracing::warn!("Failed to enable foreign key enforcement: {}", e);
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// `CREATE TABLE IF NOT EXISTS <name> (<column defs>)`
    ///
    /// Column definitions are raw SQL fragments, constraints included.
    /// Succeeds without effect when the table already exists.
    pub async fn create_table(&self, name: &str, column_defs: &[&str]) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            name,
            column_defs.join(", ")
        );
        self.run(sql, Vec::new()).await?;
        Ok(())
    }

    /// `DROP TABLE IF EXISTS <name>`; absent tables are not an error.
    pub async fn drop_table(&self, name: &str) -> Result<()> {
        let sql = format!("DROP TABLE IF EXISTS {}", name);
        self.run(sql, Vec::new()).await?;
        Ok(())
    }

    /// Issue one `ALTER TABLE <name> <OP> COLUMN <def>` per definition.
    ///
    /// The statements are independent: they are joined as a batch with no
    /// ordering guarantee among them, and a failing statement does not
    /// roll back siblings that already ran. Zero definitions resolves
    /// without touching the database.
    pub async fn alter_table(
        &self,
        name: &str,
        operation: AlterOperation,
        column_defs: &[&str],
    ) -> Result<()> {
        if column_defs.is_empty() {
            return Ok(());
        }
        let statements = column_defs.iter().map(|def| {
            let sql = format!("ALTER TABLE {} {} COLUMN {}", name, operation.as_sql(), def);
            async move {
                self.run(sql, Vec::new()).await?;
                Ok::<_, StoreError>(())
            }
        });
        future::try_join_all(statements).await?;
        Ok(())
    }

    /// Insert each row as its own parameterized `INSERT` statement.
    ///
    /// Rows are issued as a joined batch; the first failure rejects the
    /// aggregate while sibling inserts may already have committed.
    pub async fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<()> {
        let inserts = rows.iter().map(|row| {
            let (sql, values) = insert_statement(table, row);
            async move {
                self.run(sql, values).await?;
                Ok::<_, StoreError>(())
            }
        });
        future::try_join_all(inserts).await?;
        Ok(())
    }

    /// `UPDATE <table> SET k1 = ?, ... <condition>`
    ///
    /// Values are parameter-bound; the condition is raw trusted SQL.
    /// Without a condition every row in the table is updated.
    pub async fn update_row(&self, table: &str, row: &Row, condition: Option<&str>) -> Result<()> {
        let (sql, values) = update_statement(table, row, condition);
        self.run(sql, values).await?;
        Ok(())
    }

    /// `DELETE FROM <table> <condition>`; without a condition every row
    /// in the table is deleted.
    pub async fn delete_rows(&self, table: &str, condition: Option<&str>) -> Result<()> {
        let sql = with_condition(format!("DELETE FROM {}", table), condition);
        self.run(sql, Vec::new()).await?;
        Ok(())
    }

    /// `SELECT * FROM <table> <condition>`, returning rows whose column
    /// set mirrors whatever the engine produced for this query.
    pub async fn select_rows(&self, table: &str, condition: Option<&str>) -> Result<Vec<Row>> {
        let sql = with_condition(format!("SELECT * FROM {}", table), condition);
        self.run_query(sql, Vec::new()).await
    }

    /// Declared columns of a table, in declaration order.
    ///
    /// Unknown table names yield an empty list, not an error.
    pub async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA table_info({})", table);
        tracing::debug!("Executing query: {}", sql);
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let mapped = stmt.query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get("name")?,
                column_type: row.get("type")?,
            })
        })?;
        let mut columns = Vec::new();
        for column in mapped {
            columns.push(column?);
        }
        Ok(columns)
    }

    /// Every table in the schema catalog with its columns.
    ///
    /// Enumeration follows the catalog's native order (typically creation
    /// order); the per-table column lookups are joined as a batch.
    pub async fn get_all_tables(&self) -> Result<Vec<TableInfo>> {
        let names = {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
            let mapped = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut names = Vec::new();
            for name in mapped {
                names.push(name?);
            }
            names
        };
        let lookups = names.into_iter().map(|name| async move {
            let columns = self.get_table_columns(&name).await?;
            Ok::<_, StoreError>(TableInfo { name, columns })
        });
        future::try_join_all(lookups).await
    }

    /// Every table's full contents, keyed by table name.
    ///
    /// Tables are fetched one after another rather than as a batch.
    pub async fn get_all_data(&self) -> Result<HashMap<String, Vec<Row>>> {
        let tables = self.get_all_tables().await?;
        let mut data = HashMap::with_capacity(tables.len());
        for table in tables {
            let rows = self.select_rows(&table.name, None).await?;
            data.insert(table.name, rows);
        }
        Ok(data)
    }

    /// Run one raw parameter-bound statement, returning the number of
    /// affected rows. Escape hatch for SQL the structured methods do not
    /// generate, transactions included.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        self.run(sql.to_string(), params.to_vec()).await
    }

    /// Run one raw parameter-bound query, returning its rows.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run_query(sql.to_string(), params.to_vec()).await
    }

    /// Release the connection. Consuming the store makes use-after-close
    /// unrepresentable.
    pub async fn close(self) -> Result<()> {
        let conn = self.conn.into_inner();
        conn.close().map_err(|(_, e)| StoreError::Close(e))
    }

    async fn run(&self, sql: String, values: Vec<Value>) -> Result<usize> {
        tracing::debug!("Executing statement: {}", sql);
        let conn = self.conn.lock().await;
        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(changed)
    }

    async fn run_query(&self, sql: String, values: Vec<Value>) -> Result<Vec<Row>> {
        tracing::debug!("Executing query: {}", sql);
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mapped = stmt.query_map(params_from_iter(values.iter()), |row| {
            let mut out = Row::new();
            for (idx, column) in columns.iter().enumerate() {
                out.set(column, row.get::<_, Value>(idx)?);
            }
            Ok(out)
        })?;
        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }
        Ok(rows)
    }
}

fn with_condition(mut sql: String, condition: Option<&str>) -> String {
    if let Some(condition) = condition {
        sql.push(' ');
        sql.push_str(condition);
    }
    sql
}

fn insert_statement(table: &str, row: &Row) -> (String, Vec<Value>) {
    let columns: Vec<&str> = row.column_names().collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );
    (sql, row.values().cloned().collect())
}

fn update_statement(table: &str, row: &Row, condition: Option<&str>) -> (String, Vec<Value>) {
    let assignments: Vec<String> = row
        .column_names()
        .map(|column| format!("{} = ?", column))
        .collect();
    let sql = with_condition(
        format!("UPDATE {} SET {}", table, assignments.join(", ")),
        condition,
    );
    (sql, row.values().cloned().collect())
}
