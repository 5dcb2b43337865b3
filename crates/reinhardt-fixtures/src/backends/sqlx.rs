//! Collaborators over a `sqlx` [`AnyPool`].
//!
//! [`SqlxDatabase`] is both the [`SchemaInspector`] and the [`SqlExecutor`]
//! for PostgreSQL, MySQL/MariaDB and SQLite. The dialect is derived from the
//! connection URL and drives the catalog queries, the placeholder syntax and
//! the cleaning statements.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reinhardt_fixtures::backends::SqlxDatabase;
//! use reinhardt_fixtures::schema::Cleaner;
//!
//! # async fn example() -> reinhardt_fixtures::SeedingResult<()> {
//! let db = Arc::new(SqlxDatabase::connect("sqlite://fixtures.db").await?);
//! let cleaner = Cleaner::new(db.clone(), db);
//! cleaner.truncate_all_tables().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Once};

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyPoolOptions};
use sqlx::{Any, AnyConnection, AnyPool, Row, Transaction};
use tokio::sync::Mutex;

use crate::error::{SeedingError, SeedingResult};
use crate::schema::{
	Dialect, FixtureRow, QueryValue, SchemaInspector, SqlExecutor, TransactionExecutor,
	build_insert,
};

static INSTALL_DRIVERS: Once = Once::new();

/// Registers the compiled-in drivers with `sqlx::any`, once per process.
pub fn install_drivers() {
	INSTALL_DRIVERS.call_once(|| {
		sqlx::any::install_default_drivers();
	});
}

type AnyQuery<'q> = sqlx::query::Query<'q, Any, AnyArguments<'q>>;

fn bind_value<'q>(query: AnyQuery<'q>, value: &'q QueryValue) -> AnyQuery<'q> {
	match value {
		QueryValue::Null => query.bind(None::<i64>),
		QueryValue::Bool(b) => query.bind(*b),
		QueryValue::Int(i) => query.bind(*i),
		QueryValue::Float(f) => query.bind(*f),
		QueryValue::String(s) => query.bind(s.as_str()),
	}
}

async fn execute_on<'c, E>(executor: E, statement: &str) -> SeedingResult<u64>
where
	E: sqlx::Executor<'c, Database = Any>,
{
	let result = sqlx::query(statement).execute(executor).await?;
	Ok(result.rows_affected())
}

async fn insert_on<'c, E>(
	executor: E,
	dialect: Dialect,
	table: &str,
	rows: &[FixtureRow],
) -> SeedingResult<u64>
where
	E: sqlx::Executor<'c, Database = Any>,
{
	if rows.is_empty() {
		return Ok(0);
	}

	let (statement, values) = build_insert(dialect, table, rows)?;
	let mut query = sqlx::query(&statement);
	for value in &values {
		query = bind_value(query, value);
	}

	let result = query.execute(executor).await?;
	tracing::debug!(table = %table, rows = rows.len(), "inserted fixture rows");
	Ok(result.rows_affected())
}

/// Clears `tables` one by one on a single connection.
async fn clear_on(
	conn: &mut AnyConnection,
	dialect: Dialect,
	tables: &[String],
) -> SeedingResult<()> {
	for table in tables {
		let statement = dialect.clear_table_statement(table);
		tracing::debug!(table = %table, %statement, "clearing table");
		execute_on(&mut *conn, &statement)
			.await
			.map_err(|e| SeedingError::statement(table.as_str(), e))?;
	}
	Ok(())
}

/// Clears `tables` with foreign-key enforcement suspended on `conn`.
///
/// Enforcement is restored even when a clear fails; the clear error wins.
async fn clear_unchecked(
	conn: &mut AnyConnection,
	dialect: Dialect,
	tables: &[String],
) -> SeedingResult<()> {
	let Some((suspend, restore)) = dialect.foreign_key_toggle() else {
		return clear_on(conn, dialect, tables).await;
	};

	execute_on(&mut *conn, suspend).await?;
	let cleared = clear_on(&mut *conn, dialect, tables).await;
	let restored = execute_on(&mut *conn, restore).await;
	cleared?;
	restored.map(|_| ())
}

const SQLITE_SEQUENCE_QUERY: &str =
	"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'";

fn list_tables_query(dialect: Dialect) -> SeedingResult<&'static str> {
	match dialect {
		Dialect::Postgres => Ok("SELECT table_name::text FROM information_schema.tables \
			 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
			 ORDER BY table_name"),
		Dialect::Mysql => Ok("SELECT table_name FROM information_schema.tables \
			 WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
			 ORDER BY table_name"),
		Dialect::Sqlite => Ok("SELECT name FROM sqlite_master \
			 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
			 ORDER BY name"),
		Dialect::Unknown => Err(unsupported(dialect)),
	}
}

fn references_query(dialect: Dialect) -> SeedingResult<&'static str> {
	match dialect {
		Dialect::Postgres => Ok("SELECT DISTINCT ccu.table_name::text \
			 FROM information_schema.table_constraints tc \
			 JOIN information_schema.constraint_column_usage ccu \
			   ON tc.constraint_name = ccu.constraint_name \
			  AND tc.table_schema = ccu.table_schema \
			 WHERE tc.constraint_type = 'FOREIGN KEY' \
			   AND tc.table_schema = current_schema() \
			   AND tc.table_name = $1 \
			 ORDER BY 1"),
		Dialect::Mysql => Ok("SELECT DISTINCT referenced_table_name \
			 FROM information_schema.key_column_usage \
			 WHERE table_name = ? AND table_schema = DATABASE() \
			   AND referenced_table_name IS NOT NULL \
			 ORDER BY 1"),
		Dialect::Sqlite => Ok("SELECT DISTINCT \"table\" FROM pragma_foreign_key_list(?) ORDER BY 1"),
		Dialect::Unknown => Err(unsupported(dialect)),
	}
}

fn unsupported(dialect: Dialect) -> SeedingError {
	SeedingError::DatabaseError(format!(
		"schema inspection is not supported for {} databases",
		dialect
	))
}

fn first_column(rows: Vec<sqlx::any::AnyRow>) -> SeedingResult<Vec<String>> {
	rows.iter()
		.map(|row| row.try_get::<String, _>(0).map_err(SeedingError::from))
		.collect()
}

/// Schema inspector and executor backed by a shared [`AnyPool`].
#[derive(Debug, Clone)]
pub struct SqlxDatabase {
	pool: Arc<AnyPool>,
	dialect: Dialect,
}

impl SqlxDatabase {
	/// Connects to `database_url` with default pool options.
	///
	/// # Examples
	///
	/// ```rust,no_run
	/// use reinhardt_fixtures::backends::SqlxDatabase;
	///
	/// # async fn example() -> reinhardt_fixtures::SeedingResult<()> {
	/// // - PostgreSQL: "postgres://localhost/mydb"
	/// // - MySQL: "mysql://localhost/mydb"
	/// // - SQLite (file): "sqlite://fixtures.db"
	/// let db = SqlxDatabase::connect("postgres://localhost/mydb").await?;
	/// # Ok(())
	/// # }
	/// ```
	pub async fn connect(database_url: &str) -> SeedingResult<Self> {
		Self::connect_with(AnyPoolOptions::new(), database_url).await
	}

	/// Connects to `database_url` with custom pool options.
	///
	/// In-memory SQLite databases live per connection, so they need
	/// `max_connections(1)`.
	pub async fn connect_with(options: AnyPoolOptions, database_url: &str) -> SeedingResult<Self> {
		install_drivers();
		let pool = options.connect(database_url).await?;
		let dialect = Dialect::from_url(database_url);
		tracing::debug!(%dialect, "connected fixture database");

		Ok(Self::from_pool(Arc::new(pool), dialect))
	}

	/// Wraps an existing pool.
	pub fn from_pool(pool: Arc<AnyPool>, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}

	/// The underlying pool.
	pub fn pool(&self) -> &AnyPool {
		&self.pool
	}
}

#[async_trait]
impl SchemaInspector for SqlxDatabase {
	async fn list_tables(&self) -> SeedingResult<Vec<String>> {
		let sql = list_tables_query(self.dialect)?;
		let rows = sqlx::query(sql).fetch_all(&*self.pool).await?;
		first_column(rows)
	}

	async fn references_of(&self, table: &str) -> SeedingResult<Vec<String>> {
		let sql = references_query(self.dialect)?;
		let rows = sqlx::query(sql)
			.bind(table)
			.fetch_all(&*self.pool)
			.await?;
		first_column(rows)
	}

	async fn has_counters(&self) -> SeedingResult<bool> {
		if self.dialect != Dialect::Sqlite {
			return Ok(true);
		}
		let row = sqlx::query(SQLITE_SEQUENCE_QUERY)
			.fetch_one(&*self.pool)
			.await?;
		Ok(row.try_get::<i64, _>(0)? > 0)
	}
}

#[async_trait]
impl SqlExecutor for SqlxDatabase {
	fn dialect(&self) -> Dialect {
		self.dialect
	}

	async fn execute(&self, statement: &str) -> SeedingResult<u64> {
		execute_on(&*self.pool, statement).await
	}

	async fn insert_rows(&self, table: &str, rows: &[FixtureRow]) -> SeedingResult<u64> {
		insert_on(&*self.pool, self.dialect, table, rows).await
	}

	async fn clear_tables(&self, tables: &[String]) -> SeedingResult<()> {
		// Session settings only hold for one connection
		let mut conn = self.pool.acquire().await?;
		clear_unchecked(&mut conn, self.dialect, tables).await
	}

	async fn begin(&self) -> SeedingResult<Box<dyn TransactionExecutor>> {
		let tx = self.pool.begin().await?;
		tracing::debug!(dialect = %self.dialect, "began fixture transaction");

		Ok(Box::new(SqlxTransaction {
			tx: Mutex::new(tx),
			dialect: self.dialect,
		}))
	}
}

/// Open transaction on a [`SqlxDatabase`].
///
/// Statements from concurrently loading fixtures are serialized on the
/// transaction's connection.
pub struct SqlxTransaction {
	tx: Mutex<Transaction<'static, Any>>,
	dialect: Dialect,
}

#[async_trait]
impl SqlExecutor for SqlxTransaction {
	fn dialect(&self) -> Dialect {
		self.dialect
	}

	async fn execute(&self, statement: &str) -> SeedingResult<u64> {
		let mut tx = self.tx.lock().await;
		execute_on(&mut **tx, statement).await
	}

	async fn insert_rows(&self, table: &str, rows: &[FixtureRow]) -> SeedingResult<u64> {
		let mut tx = self.tx.lock().await;
		insert_on(&mut **tx, self.dialect, table, rows).await
	}

	async fn clear_tables(&self, tables: &[String]) -> SeedingResult<()> {
		let mut tx = self.tx.lock().await;
		match self.dialect.defer_foreign_keys_statement() {
			Some(defer) => {
				execute_on(&mut **tx, defer).await?;
				clear_on(&mut **tx, self.dialect, tables).await
			}
			None => clear_unchecked(&mut **tx, self.dialect, tables).await,
		}
	}
}

#[async_trait]
impl TransactionExecutor for SqlxTransaction {
	fn as_executor(&self) -> &dyn SqlExecutor {
		self
	}

	async fn commit(self: Box<Self>) -> SeedingResult<()> {
		self.tx
			.into_inner()
			.commit()
			.await
			.map_err(|e| SeedingError::TransactionError(format!("commit failed: {}", e)))
	}

	async fn rollback(self: Box<Self>) -> SeedingResult<()> {
		self.tx
			.into_inner()
			.rollback()
			.await
			.map_err(|e| SeedingError::TransactionError(format!("rollback failed: {}", e)))
	}
}

impl std::fmt::Debug for SqlxTransaction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SqlxTransaction")
			.field("dialect", &self.dialect)
			.finish_non_exhaustive()
	}
}
