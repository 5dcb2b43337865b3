//! Database cleaner.
//!
//! Clears every table in foreign-key order and restarts auto-increment
//! counters. Statements commit one by one: a failure stops the run but does
//! not undo tables already cleared. Use
//! [`FixtureLoader::load_in_transaction`](crate::fixtures::FixtureLoader::load_in_transaction)
//! when the backend supports transactional DDL and atomicity matters.

use std::collections::HashMap;
use std::sync::Arc;

use super::{SchemaInspector, SqlExecutor, TableResolver};
use crate::error::{SeedingError, SeedingResult};

/// Truncates tables and resets counters through the schema collaborators.
#[derive(Clone)]
pub struct Cleaner {
	inspector: Arc<dyn SchemaInspector>,
	executor: Arc<dyn SqlExecutor>,
	resolver: TableResolver,
}

impl Cleaner {
	/// Creates a cleaner over an inspector and an executor.
	pub fn new(inspector: Arc<dyn SchemaInspector>, executor: Arc<dyn SqlExecutor>) -> Self {
		Self {
			inspector,
			executor,
			resolver: TableResolver::new(),
		}
	}

	/// Resolves the order in which tables would be cleared, without clearing.
	///
	/// # Errors
	///
	/// Returns inspector errors as-is and [`SeedingError::CyclicDependency`]
	/// when the tables reference each other in a loop.
	pub async fn truncation_order(&self) -> SeedingResult<Vec<String>> {
		let tables = self.inspector.list_tables().await?;

		let mut references = HashMap::with_capacity(tables.len());
		for table in &tables {
			let refs = self.inspector.references_of(table).await?;
			references.insert(table.clone(), refs);
		}

		self.resolver.order(&tables, |table| {
			references.remove(table).unwrap_or_default()
		})
	}

	/// Lists the tables whose counters a reset would touch.
	///
	/// Empty when the inspector reports that the schema keeps no counters.
	pub async fn counter_tables(&self) -> SeedingResult<Vec<String>> {
		if !self.inspector.has_counters().await? {
			tracing::debug!("schema keeps no auto-increment counters");
			return Ok(Vec::new());
		}
		self.inspector.list_tables().await
	}

	/// Clears every table of the schema.
	///
	/// Returns the tables in the order they were cleared.
	pub async fn truncate_all_tables(&self) -> SeedingResult<Vec<String>> {
		self.truncate_all_tables_on(self.executor.as_ref()).await
	}

	/// Clears every table, issuing the statements on `executor`.
	///
	/// The order is resolved completely before the first statement runs, so a
	/// cyclic schema leaves every table untouched.
	pub async fn truncate_all_tables_on(
		&self,
		executor: &dyn SqlExecutor,
	) -> SeedingResult<Vec<String>> {
		let order = self.truncation_order().await?;
		self.truncate_tables_on(executor, &order).await?;
		Ok(order)
	}

	/// Clears `order`, as returned by [`truncation_order`](Self::truncation_order),
	/// on `executor` without inspecting the schema again.
	pub async fn truncate_tables_on(
		&self,
		executor: &dyn SqlExecutor,
		order: &[String],
	) -> SeedingResult<()> {
		executor.clear_tables(order).await?;
		tracing::info!(tables = order.len(), dialect = %executor.dialect(), "truncated all tables");
		Ok(())
	}

	/// Restarts the auto-increment counter of every table.
	///
	/// Returns the number of reset statements issued.
	pub async fn reset_auto_increment_counters(&self) -> SeedingResult<usize> {
		self.reset_auto_increment_counters_on(self.executor.as_ref())
			.await
	}

	/// Restarts every counter, issuing the statements on `executor`.
	pub async fn reset_auto_increment_counters_on(
		&self,
		executor: &dyn SqlExecutor,
	) -> SeedingResult<usize> {
		let tables = self.counter_tables().await?;
		self.reset_counters_on(executor, &tables).await
	}

	/// Restarts the counters of `tables` on `executor`.
	///
	/// Dialects without a counter syntax are skipped with a warning.
	pub async fn reset_counters_on(
		&self,
		executor: &dyn SqlExecutor,
		tables: &[String],
	) -> SeedingResult<usize> {
		let dialect = executor.dialect();

		let mut issued = 0;
		for table in tables {
			let Some(statement) = dialect.reset_counter_statement(table) else {
				continue;
			};
			tracing::debug!(table = %table, %statement, "resetting counter");
			executor
				.execute(&statement)
				.await
				.map_err(|e| SeedingError::statement(table.as_str(), e))?;
			issued += 1;
		}

		if !dialect.is_supported() && !tables.is_empty() {
			tracing::warn!(
				tables = tables.len(),
				%dialect,
				"auto-increment reset skipped, dialect has no counter syntax"
			);
		}

		Ok(issued)
	}
}

impl std::fmt::Debug for Cleaner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Cleaner")
			.field("dialect", &self.executor.dialect())
			.finish_non_exhaustive()
	}
}
