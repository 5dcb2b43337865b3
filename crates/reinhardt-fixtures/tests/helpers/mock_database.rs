//! In-memory recording database.
//!
//! Implements both collaborator traits. Every statement is recorded, and a
//! failure can be injected for statements containing a given fragment.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reinhardt_fixtures::schema::{
	Dialect, FixtureRow, SchemaInspector, SqlExecutor, TransactionExecutor, build_insert,
};
use reinhardt_fixtures::{SeedingError, SeedingResult};

/// Statements and transaction events shared between a database and its
/// open transactions.
#[derive(Debug, Default)]
pub struct Recording {
	statements: Mutex<Vec<String>>,
	events: Mutex<Vec<String>>,
	in_transaction: Mutex<bool>,
	inspections_in_transaction: Mutex<usize>,
}

/// Recording database with a fixed schema.
#[derive(Debug)]
pub struct MockDatabase {
	dialect: Dialect,
	tables: Vec<String>,
	references: HashMap<String, Vec<String>>,
	fail_on: Option<String>,
	transactions: bool,
	counters: bool,
	recording: Arc<Recording>,
}

impl MockDatabase {
	/// Creates a database without tables.
	pub fn new(dialect: Dialect) -> Self {
		Self {
			dialect,
			tables: Vec::new(),
			references: HashMap::new(),
			fail_on: None,
			transactions: false,
			counters: true,
			recording: Arc::new(Recording::default()),
		}
	}

	/// Adds a table referencing `references` through foreign keys.
	pub fn with_table(mut self, table: &str, references: &[&str]) -> Self {
		self.tables.push(table.to_string());
		self.references.insert(
			table.to_string(),
			references.iter().map(|r| r.to_string()).collect(),
		);
		self
	}

	/// Fails every statement containing `fragment`.
	pub fn failing_on(mut self, fragment: &str) -> Self {
		self.fail_on = Some(fragment.to_string());
		self
	}

	/// Enables [`SqlExecutor::begin`].
	pub fn with_transactions(mut self) -> Self {
		self.transactions = true;
		self
	}

	/// Reports a schema without auto-increment counters.
	pub fn without_counters(mut self) -> Self {
		self.counters = false;
		self
	}

	/// Inspector calls made while a transaction was open.
	pub fn inspections_in_transaction(&self) -> usize {
		*self.recording.inspections_in_transaction.lock()
	}

	fn record_inspection(&self) {
		if *self.recording.in_transaction.lock() {
			*self.recording.inspections_in_transaction.lock() += 1;
		}
	}

	/// Committed statements, in issue order.
	pub fn statements(&self) -> Vec<String> {
		self.recording.statements.lock().clone()
	}

	/// `BEGIN`, `COMMIT` and `ROLLBACK` events, in order.
	pub fn events(&self) -> Vec<String> {
		self.recording.events.lock().clone()
	}

	/// Tables targeted by committed inserts, in issue order.
	pub fn inserted_tables(&self) -> Vec<String> {
		self.statements()
			.iter()
			.filter_map(|s| s.strip_prefix("INSERT INTO "))
			.filter_map(|s| s.split_whitespace().next())
			.map(|table| table.trim_matches(|c| c == '"' || c == '`').to_string())
			.collect()
	}

	fn check(fail_on: &Option<String>, statement: &str) -> SeedingResult<()> {
		match fail_on {
			Some(fragment) if statement.contains(fragment.as_str()) => Err(
				SeedingError::DatabaseError(format!("injected failure: {}", statement)),
			),
			_ => Ok(()),
		}
	}
}

#[async_trait]
impl SchemaInspector for MockDatabase {
	async fn list_tables(&self) -> SeedingResult<Vec<String>> {
		self.record_inspection();
		Ok(self.tables.clone())
	}

	async fn references_of(&self, table: &str) -> SeedingResult<Vec<String>> {
		self.record_inspection();
		Ok(self.references.get(table).cloned().unwrap_or_default())
	}

	async fn has_counters(&self) -> SeedingResult<bool> {
		self.record_inspection();
		Ok(self.counters)
	}
}

#[async_trait]
impl SqlExecutor for MockDatabase {
	fn dialect(&self) -> Dialect {
		self.dialect
	}

	async fn execute(&self, statement: &str) -> SeedingResult<u64> {
		Self::check(&self.fail_on, statement)?;
		self.recording.statements.lock().push(statement.to_string());
		Ok(1)
	}

	async fn insert_rows(&self, table: &str, rows: &[FixtureRow]) -> SeedingResult<u64> {
		if rows.is_empty() {
			return Ok(0);
		}
		let (statement, _) = build_insert(self.dialect, table, rows)?;
		Self::check(&self.fail_on, &statement)?;
		self.recording.statements.lock().push(statement);
		Ok(rows.len() as u64)
	}

	async fn begin(&self) -> SeedingResult<Box<dyn TransactionExecutor>> {
		if !self.transactions {
			return Err(SeedingError::TransactionError(
				"transactions disabled".to_string(),
			));
		}
		self.recording.events.lock().push("BEGIN".to_string());
		*self.recording.in_transaction.lock() = true;

		Ok(Box::new(MockTransaction {
			dialect: self.dialect,
			fail_on: self.fail_on.clone(),
			pending: Mutex::new(Vec::new()),
			recording: Arc::clone(&self.recording),
		}))
	}
}

/// Transaction buffering statements until commit.
pub struct MockTransaction {
	dialect: Dialect,
	fail_on: Option<String>,
	pending: Mutex<Vec<String>>,
	recording: Arc<Recording>,
}

#[async_trait]
impl SqlExecutor for MockTransaction {
	fn dialect(&self) -> Dialect {
		self.dialect
	}

	async fn execute(&self, statement: &str) -> SeedingResult<u64> {
		MockDatabase::check(&self.fail_on, statement)?;
		self.pending.lock().push(statement.to_string());
		Ok(1)
	}

	async fn insert_rows(&self, table: &str, rows: &[FixtureRow]) -> SeedingResult<u64> {
		if rows.is_empty() {
			return Ok(0);
		}
		let (statement, _) = build_insert(self.dialect, table, rows)?;
		MockDatabase::check(&self.fail_on, &statement)?;
		self.pending.lock().push(statement);
		Ok(rows.len() as u64)
	}
}

#[async_trait]
impl TransactionExecutor for MockTransaction {
	fn as_executor(&self) -> &dyn SqlExecutor {
		self
	}

	async fn commit(self: Box<Self>) -> SeedingResult<()> {
		let pending = std::mem::take(&mut *self.pending.lock());
		self.recording.statements.lock().extend(pending);
		self.recording.events.lock().push("COMMIT".to_string());
		*self.recording.in_transaction.lock() = false;
		Ok(())
	}

	async fn rollback(self: Box<Self>) -> SeedingResult<()> {
		self.recording.events.lock().push("ROLLBACK".to_string());
		*self.recording.in_transaction.lock() = false;
		Ok(())
	}
}
