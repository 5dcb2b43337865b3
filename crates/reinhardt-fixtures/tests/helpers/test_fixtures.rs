//! Fixtures used across integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reinhardt_fixtures::schema::{QueryValue, SqlExecutor, row};
use reinhardt_fixtures::{Fixture, LoadContext, SeedingError, SeedingResult};

/// Inserts one row into the table named like the fixture and publishes
/// `"<name>:id"`.
pub struct TableFixture {
	name: String,
	id: i64,
	requires: Option<Vec<Arc<dyn Fixture>>>,
}

impl TableFixture {
	/// Fixture without dependency information.
	pub fn leaf(name: &str, id: i64) -> Arc<Self> {
		Arc::new(Self {
			name: name.to_string(),
			id,
			requires: None,
		})
	}

	/// Fixture requiring `requires`.
	pub fn requiring(name: &str, id: i64, requires: Vec<Arc<dyn Fixture>>) -> Arc<Self> {
		Arc::new(Self {
			name: name.to_string(),
			id,
			requires: Some(requires),
		})
	}
}

#[async_trait]
impl Fixture for TableFixture {
	fn name(&self) -> &str {
		&self.name
	}

	fn required_relations(&self) -> Option<Vec<Arc<dyn Fixture>>> {
		self.requires.clone()
	}

	async fn load(&self, ctx: &LoadContext, db: &dyn SqlExecutor) -> SeedingResult<()> {
		for required in self.requires.iter().flatten() {
			// Requirements always publish before their dependents run.
			ctx.reference::<i64>(&format!("{}:id", required.name()))?;
		}

		db.insert_rows(&self.name, &[row([("id", QueryValue::from(self.id))])])
			.await?;
		ctx.set_reference(format!("{}:id", self.name), self.id);
		Ok(())
	}
}

/// Fails with a database error without writing anything.
pub struct FailingFixture {
	name: String,
}

impl FailingFixture {
	pub fn new(name: &str) -> Arc<Self> {
		Arc::new(Self {
			name: name.to_string(),
		})
	}
}

#[async_trait]
impl Fixture for FailingFixture {
	fn name(&self) -> &str {
		&self.name
	}

	async fn load(&self, _ctx: &LoadContext, _db: &dyn SqlExecutor) -> SeedingResult<()> {
		Err(SeedingError::DatabaseError("boom".to_string()))
	}
}

/// Sleeps far longer than any test runs.
pub struct StalledFixture;

#[async_trait]
impl Fixture for StalledFixture {
	fn name(&self) -> &str {
		"stalled"
	}

	async fn load(&self, _ctx: &LoadContext, _db: &dyn SqlExecutor) -> SeedingResult<()> {
		tokio::time::sleep(Duration::from_secs(3600)).await;
		Ok(())
	}
}

/// Reads an `i64` reference without declaring where it comes from.
pub struct ReferenceReader {
	key: String,
}

impl ReferenceReader {
	pub fn new(key: &str) -> Arc<Self> {
		Arc::new(Self {
			key: key.to_string(),
		})
	}
}

#[async_trait]
impl Fixture for ReferenceReader {
	fn name(&self) -> &str {
		"reader"
	}

	async fn load(&self, ctx: &LoadContext, _db: &dyn SqlExecutor) -> SeedingResult<()> {
		ctx.reference::<i64>(&self.key)?;
		Ok(())
	}
}
