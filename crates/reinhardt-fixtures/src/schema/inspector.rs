//! Schema inspector contract.

use async_trait::async_trait;

use crate::error::SeedingResult;

/// Reads table and foreign-key metadata from the target schema.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
	/// Lists every base table of the current schema.
	async fn list_tables(&self) -> SeedingResult<Vec<String>>;

	/// Lists the tables `table` points to through its foreign keys.
	async fn references_of(&self, table: &str) -> SeedingResult<Vec<String>>;

	/// Returns false when the schema keeps no auto-increment counters yet.
	///
	/// SQLite only creates `sqlite_sequence` once a table declares
	/// `AUTOINCREMENT`; before that there is nothing to reset.
	async fn has_counters(&self) -> SeedingResult<bool> {
		Ok(true)
	}
}
