//! SQL executor contract.
//!
//! The executor runs clear and counter-reset statements for the cleaner and
//! is handed to every fixture so it can insert its data.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Dialect;
use crate::error::{SeedingError, SeedingResult};

/// Parameter value bound into fixture inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
	/// SQL `NULL`.
	Null,
	/// Boolean value.
	Bool(bool),
	/// Integer value.
	Int(i64),
	/// Floating point value.
	Float(f64),
	/// Text value.
	String(String),
}

impl From<&str> for QueryValue {
	fn from(s: &str) -> Self {
		QueryValue::String(s.to_string())
	}
}

impl From<String> for QueryValue {
	fn from(s: String) -> Self {
		QueryValue::String(s)
	}
}

impl From<i64> for QueryValue {
	fn from(i: i64) -> Self {
		QueryValue::Int(i)
	}
}

impl From<i32> for QueryValue {
	fn from(i: i32) -> Self {
		QueryValue::Int(i as i64)
	}
}

impl From<f64> for QueryValue {
	fn from(f: f64) -> Self {
		QueryValue::Float(f)
	}
}

impl From<bool> for QueryValue {
	fn from(b: bool) -> Self {
		QueryValue::Bool(b)
	}
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(QueryValue::Null)
	}
}

/// One row of fixture data, columns in insertion order.
pub type FixtureRow = IndexMap<String, QueryValue>;

/// Builds a [`FixtureRow`] from `(column, value)` pairs.
///
/// # Examples
///
/// ```
/// use reinhardt_fixtures::schema::{QueryValue, row};
///
/// let user = row([("id", QueryValue::from(1)), ("name", "alice".into())]);
/// assert_eq!(user.len(), 2);
/// ```
pub fn row<K, I>(columns: I) -> FixtureRow
where
	K: Into<String>,
	I: IntoIterator<Item = (K, QueryValue)>,
{
	columns
		.into_iter()
		.map(|(column, value)| (column.into(), value))
		.collect()
}

/// Runs statements against the target database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
	/// Dialect of the connected backend.
	fn dialect(&self) -> Dialect;

	/// Executes one statement and returns the number of affected rows.
	async fn execute(&self, statement: &str) -> SeedingResult<u64>;

	/// Inserts a set of rows sharing the same column list into `table`.
	async fn insert_rows(&self, table: &str, rows: &[FixtureRow]) -> SeedingResult<u64>;

	/// Clears `tables` in the given order, stopping at the first failure.
	///
	/// Failures are reported as [`SeedingError::StatementExecution`] naming
	/// the table. Backends that enforce foreign keys per statement override
	/// this to suspend enforcement around the whole batch.
	async fn clear_tables(&self, tables: &[String]) -> SeedingResult<()> {
		let dialect = self.dialect();
		for table in tables {
			let statement = dialect.clear_table_statement(table);
			tracing::debug!(table = %table, %statement, "clearing table");
			self.execute(&statement)
				.await
				.map_err(|e| SeedingError::statement(table.as_str(), e))?;
		}
		Ok(())
	}

	/// Opens a transaction scope on this executor.
	///
	/// Executors that cannot scope statements keep the default, which fails.
	async fn begin(&self) -> SeedingResult<Box<dyn TransactionExecutor>> {
		Err(SeedingError::TransactionError(
			"executor does not support transactions".to_string(),
		))
	}
}

/// Executor bound to an open transaction.
#[async_trait]
pub trait TransactionExecutor: SqlExecutor {
	/// Views this transaction as a plain executor.
	fn as_executor(&self) -> &dyn SqlExecutor;

	/// Commits every statement issued through this executor.
	async fn commit(self: Box<Self>) -> SeedingResult<()>;

	/// Discards every statement issued through this executor.
	async fn rollback(self: Box<Self>) -> SeedingResult<()>;
}

/// Renders a parameterized `INSERT` for `rows`.
///
/// Returns the statement and the values in binding order. Every row must
/// carry the same columns as the first one.
pub fn build_insert(
	dialect: Dialect,
	table: &str,
	rows: &[FixtureRow],
) -> SeedingResult<(String, Vec<QueryValue>)> {
	let Some(first) = rows.first() else {
		return Err(SeedingError::ValidationError {
			field: "rows".to_string(),
			message: format!("no rows to insert into {}", table),
		});
	};
	if first.is_empty() {
		return Err(SeedingError::ValidationError {
			field: "rows".to_string(),
			message: format!("rows for {} have no columns", table),
		});
	}

	let columns: Vec<&String> = first.keys().collect();
	let mut values = Vec::with_capacity(columns.len() * rows.len());
	let mut tuples = Vec::with_capacity(rows.len());

	for row in rows {
		if row.len() != columns.len() || !columns.iter().all(|c| row.contains_key(*c)) {
			return Err(SeedingError::ValidationError {
				field: "rows".to_string(),
				message: format!("rows for {} do not share the same columns", table),
			});
		}

		let placeholders: Vec<String> = columns
			.iter()
			.map(|column| {
				values.push(row[*column].clone());
				dialect.placeholder(values.len())
			})
			.collect();
		tuples.push(format!("({})", placeholders.join(", ")));
	}

	let column_list: Vec<String> = columns
		.iter()
		.map(|column| dialect.quote_identifier(column))
		.collect();
	let statement = format!(
		"INSERT INTO {} ({}) VALUES {}",
		dialect.quote_identifier(table),
		column_list.join(", "),
		tuples.join(", ")
	);

	Ok((statement, values))
}
