//! Fixture loading orchestration.
//!
//! A load run resolves the fixture order, optionally cleans the database,
//! then runs every fixture against one fresh [`LoadContext`]. The first
//! failure aborts the run. Statements already issued stay committed unless
//! the run goes through [`FixtureLoader::load_in_transaction`].

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::progress::{LoadProgress, ProgressBarReporter};
use super::resolver::FixtureResolver;
use super::Fixture;
use crate::error::{SeedingError, SeedingResult};
use crate::references::LoadContext;
use crate::schema::{Cleaner, SchemaInspector, SqlExecutor};

/// Options recognized by [`FixtureLoader::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
	/// Report progress while fixtures load.
	pub show_progress_bar: bool,

	/// Restart auto-increment counters before loading.
	pub reset_auto_increments: bool,

	/// Clear every table before loading.
	pub truncate_all_tables: bool,
}

impl LoadConfig {
	/// Creates a config with every option off.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the progress reporting flag.
	pub fn with_progress_bar(mut self, show: bool) -> Self {
		self.show_progress_bar = show;
		self
	}

	/// Sets the counter reset flag.
	pub fn with_reset_auto_increments(mut self, reset: bool) -> Self {
		self.reset_auto_increments = reset;
		self
	}

	/// Sets the truncation flag.
	pub fn with_truncate_all_tables(mut self, truncate: bool) -> Self {
		self.truncate_all_tables = truncate;
		self
	}
}

/// Outcome of a successful load run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResult {
	/// Fixture names in the order they finished loading.
	pub fixtures_loaded: Vec<String>,

	/// Tables cleared before loading, in clearing order.
	pub tables_truncated: Vec<String>,

	/// Number of counter reset statements issued.
	pub counters_reset: usize,
}

/// Schema facts a load run cleans with, gathered before any statement runs.
#[derive(Debug, Default)]
struct CleaningPlan {
	truncate: Option<Vec<String>>,
	reset: Option<Vec<String>>,
}

/// Loads a set of fixtures in dependency order.
///
/// # Examples
///
/// ```ignore
/// let db = Arc::new(SqlxDatabase::connect("sqlite::memory:").await?);
/// let loader = FixtureLoader::new(db.clone(), db)
///     .with_fixtures(vec![Arc::new(OrderFixture), Arc::new(UserFixture)]);
///
/// let result = loader
///     .load(&LoadConfig::new().with_truncate_all_tables(true))
///     .await?;
/// assert_eq!(result.fixtures_loaded, vec!["users", "orders"]);
/// ```
pub struct FixtureLoader {
	executor: Arc<dyn SqlExecutor>,
	inspector: Arc<dyn SchemaInspector>,
	fixtures: Vec<Arc<dyn Fixture>>,
	resolver: FixtureResolver,
	progress: Option<Arc<dyn LoadProgress>>,
	cancellation: CancellationToken,
	parallel_levels: bool,
}

impl FixtureLoader {
	/// Creates a loader without fixtures.
	pub fn new(executor: Arc<dyn SqlExecutor>, inspector: Arc<dyn SchemaInspector>) -> Self {
		Self {
			executor,
			inspector,
			fixtures: Vec::new(),
			resolver: FixtureResolver::new(),
			progress: None,
			cancellation: CancellationToken::new(),
			parallel_levels: false,
		}
	}

	/// Replaces the fixture set.
	pub fn with_fixtures(mut self, fixtures: Vec<Arc<dyn Fixture>>) -> Self {
		self.fixtures = fixtures;
		self
	}

	/// Appends a fixture to the set.
	pub fn add_fixture(mut self, fixture: Arc<dyn Fixture>) -> Self {
		self.fixtures.push(fixture);
		self
	}

	/// Reports progress to `progress` instead of a terminal bar.
	pub fn with_progress(mut self, progress: Arc<dyn LoadProgress>) -> Self {
		self.progress = Some(progress);
		self
	}

	/// Aborts runs once `token` is cancelled.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = token;
		self
	}

	/// Runs fixtures of one dependency level concurrently.
	pub fn with_parallel_levels(mut self, parallel: bool) -> Self {
		self.parallel_levels = parallel;
		self
	}

	/// The configured fixtures, in the order given.
	pub fn fixtures(&self) -> &[Arc<dyn Fixture>] {
		&self.fixtures
	}

	/// Cleans the database as configured and loads every fixture.
	///
	/// The fixture order is resolved before anything is written, so a
	/// dependency cycle leaves the database untouched.
	pub async fn load(&self, config: &LoadConfig) -> SeedingResult<LoadResult> {
		let batches = self.plan(&self.fixtures)?;
		let cleaning = self.prepare_cleaning(config).await?;
		self.run(self.executor.as_ref(), config, cleaning, batches)
			.await
	}

	/// Same as [`load`](Self::load), with every statement in one transaction.
	///
	/// The transaction commits when the run succeeds and rolls back on any
	/// error, cancellation included. The schema is inspected before the
	/// transaction opens, so a single-connection pool does not wait on itself.
	pub async fn load_in_transaction(&self, config: &LoadConfig) -> SeedingResult<LoadResult> {
		let batches = self.plan(&self.fixtures)?;
		let cleaning = self.prepare_cleaning(config).await?;
		let tx = self.executor.begin().await?;

		match self.run(tx.as_executor(), config, cleaning, batches).await {
			Ok(result) => {
				tx.commit().await?;
				Ok(result)
			}
			Err(error) => {
				if let Err(rollback_error) = tx.rollback().await {
					tracing::warn!(
						error = %rollback_error,
						"rollback after failed fixture load failed"
					);
				}
				Err(error)
			}
		}
	}

	/// Loads `fixture` and its transitive requirements, nothing else.
	///
	/// Never cleans the database.
	pub async fn load_fixture(&self, fixture: Arc<dyn Fixture>) -> SeedingResult<LoadResult> {
		let ordered = self.resolver.dependencies_of(&fixture)?;
		let batches = ordered.into_iter().map(|f| vec![f]).collect();
		self.run(
			self.executor.as_ref(),
			&LoadConfig::default(),
			CleaningPlan::default(),
			batches,
		)
		.await
	}

	/// Looks up a configured fixture by exact name and loads it with
	/// [`load_fixture`](Self::load_fixture).
	///
	/// # Errors
	///
	/// Returns [`SeedingError::FixtureNotFound`] before touching the database
	/// when no configured fixture has that name.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_fixtures::prelude::*;
	///
	/// # struct Db;
	/// # #[async_trait]
	/// # impl SqlExecutor for Db {
	/// #     fn dialect(&self) -> Dialect { Dialect::Sqlite }
	/// #     async fn execute(&self, _: &str) -> SeedingResult<u64> { Ok(0) }
	/// #     async fn insert_rows(&self, _: &str, _: &[FixtureRow]) -> SeedingResult<u64> { Ok(0) }
	/// # }
	/// # #[async_trait]
	/// # impl SchemaInspector for Db {
	/// #     async fn list_tables(&self) -> SeedingResult<Vec<String>> { Ok(Vec::new()) }
	/// #     async fn references_of(&self, _: &str) -> SeedingResult<Vec<String>> { Ok(Vec::new()) }
	/// # }
	/// # tokio_test::block_on(async {
	/// let db = Arc::new(Db);
	/// let loader = FixtureLoader::new(db.clone(), db);
	///
	/// let result = loader.load_fixture_by_name("missing").await;
	/// assert!(matches!(result, Err(SeedingError::FixtureNotFound(_))));
	/// # });
	/// ```
	pub async fn load_fixture_by_name(&self, name: &str) -> SeedingResult<LoadResult> {
		let fixture = self
			.fixtures
			.iter()
			.find(|fixture| fixture.name() == name)
			.cloned()
			.ok_or_else(|| SeedingError::FixtureNotFound(name.to_string()))?;

		self.load_fixture(fixture).await
	}

	/// Splits the load order into batches that may run concurrently.
	fn plan(&self, fixtures: &[Arc<dyn Fixture>]) -> SeedingResult<Vec<Vec<Arc<dyn Fixture>>>> {
		if self.parallel_levels {
			return self.resolver.levels(fixtures);
		}

		Ok(self
			.resolver
			.order(fixtures)?
			.into_iter()
			.map(|fixture| vec![fixture])
			.collect())
	}

	/// Reads everything the configured cleaning needs from the inspector.
	async fn prepare_cleaning(&self, config: &LoadConfig) -> SeedingResult<CleaningPlan> {
		let mut plan = CleaningPlan::default();
		if !(config.truncate_all_tables || config.reset_auto_increments) {
			return Ok(plan);
		}

		self.ensure_active()?;
		let cleaner = self.cleaner();
		if config.truncate_all_tables {
			plan.truncate = Some(cleaner.truncation_order().await?);
		}
		if config.reset_auto_increments {
			plan.reset = Some(cleaner.counter_tables().await?);
		}
		Ok(plan)
	}

	fn cleaner(&self) -> Cleaner {
		Cleaner::new(Arc::clone(&self.inspector), Arc::clone(&self.executor))
	}

	async fn run(
		&self,
		db: &dyn SqlExecutor,
		config: &LoadConfig,
		cleaning: CleaningPlan,
		batches: Vec<Vec<Arc<dyn Fixture>>>,
	) -> SeedingResult<LoadResult> {
		self.ensure_active()?;

		let mut result = LoadResult::default();
		if let Some(order) = cleaning.truncate {
			self.cleaner().truncate_tables_on(db, &order).await?;
			result.tables_truncated = order;
		}
		if let Some(tables) = cleaning.reset {
			self.ensure_active()?;
			result.counters_reset = self.cleaner().reset_counters_on(db, &tables).await?;
		}

		let total: usize = batches.iter().map(Vec::len).sum();
		let progress = config.show_progress_bar.then(|| {
			self.progress
				.clone()
				.unwrap_or_else(|| Arc::new(ProgressBarReporter::new()) as Arc<dyn LoadProgress>)
		});
		let progress = progress.as_deref();

		tracing::info!(fixtures = total, "loading fixtures");
		if let Some(progress) = progress {
			progress.start(total as u64);
		}

		let ctx = LoadContext::with_cancellation(self.cancellation.clone());
		result.fixtures_loaded.reserve(total);

		for batch in batches {
			self.ensure_active()?;
			match batch.as_slice() {
				[fixture] => self.load_one(fixture, &ctx, db, progress).await?,
				_ => {
					try_join_all(
						batch
							.iter()
							.map(|fixture| self.load_one(fixture, &ctx, db, progress)),
					)
					.await?;
				}
			}
			result
				.fixtures_loaded
				.extend(batch.iter().map(|fixture| fixture.name().to_string()));
		}

		if let Some(progress) = progress {
			progress.finish();
		}
		tracing::info!(
			fixtures = result.fixtures_loaded.len(),
			references = ctx.references().len(),
			"fixtures loaded"
		);

		Ok(result)
	}

	async fn load_one(
		&self,
		fixture: &Arc<dyn Fixture>,
		ctx: &LoadContext,
		db: &dyn SqlExecutor,
		progress: Option<&dyn LoadProgress>,
	) -> SeedingResult<()> {
		let name = fixture.name();
		if let Some(progress) = progress {
			progress.describe(name);
		}
		tracing::debug!(fixture = %name, "loading fixture");

		let outcome = tokio::select! {
			biased;
			_ = self.cancellation.cancelled() => Err(SeedingError::Cancelled),
			outcome = fixture.load(ctx, db) => outcome,
		};

		match outcome {
			Ok(()) => {}
			Err(SeedingError::Cancelled) => return Err(SeedingError::Cancelled),
			Err(error) => return Err(SeedingError::fixture(name, error)),
		}

		if let Some(progress) = progress {
			progress.advance();
		}
		Ok(())
	}

	fn ensure_active(&self) -> SeedingResult<()> {
		if self.cancellation.is_cancelled() {
			tracing::debug!("fixture load cancelled");
			return Err(SeedingError::Cancelled);
		}
		Ok(())
	}
}

impl std::fmt::Debug for FixtureLoader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let fixtures: Vec<&str> = self.fixtures.iter().map(|f| f.name()).collect();
		f.debug_struct("FixtureLoader")
			.field("dialect", &self.executor.dialect())
			.field("fixtures", &fixtures)
			.field("parallel_levels", &self.parallel_levels)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{Dialect, FixtureRow};
	use async_trait::async_trait;
	use parking_lot::Mutex;
	use rstest::rstest;

	#[derive(Default)]
	struct StubDatabase {
		statements: Mutex<Vec<String>>,
	}

	#[async_trait]
	impl SqlExecutor for StubDatabase {
		fn dialect(&self) -> Dialect {
			Dialect::Sqlite
		}

		async fn execute(&self, statement: &str) -> SeedingResult<u64> {
			self.statements.lock().push(statement.to_string());
			Ok(0)
		}

		async fn insert_rows(&self, table: &str, rows: &[FixtureRow]) -> SeedingResult<u64> {
			self.statements.lock().push(format!("INSERT {}", table));
			Ok(rows.len() as u64)
		}
	}

	#[async_trait]
	impl SchemaInspector for StubDatabase {
		async fn list_tables(&self) -> SeedingResult<Vec<String>> {
			Ok(vec!["users".to_string()])
		}

		async fn references_of(&self, _table: &str) -> SeedingResult<Vec<String>> {
			Ok(Vec::new())
		}
	}

	struct NamedFixture(&'static str);

	#[async_trait]
	impl Fixture for NamedFixture {
		fn name(&self) -> &str {
			self.0
		}

		async fn load(&self, _ctx: &LoadContext, db: &dyn SqlExecutor) -> SeedingResult<()> {
			db.execute(&format!("LOAD {}", self.0)).await?;
			Ok(())
		}
	}

	fn loader(db: &Arc<StubDatabase>) -> FixtureLoader {
		FixtureLoader::new(db.clone(), db.clone())
	}

	// ========================================================================
	// LoadConfig
	// ========================================================================

	#[rstest]
	fn test_config_defaults_all_off() {
		let config = LoadConfig::new();

		assert!(!config.show_progress_bar);
		assert!(!config.reset_auto_increments);
		assert!(!config.truncate_all_tables);
	}

	#[rstest]
	fn test_config_builder_sets_flags() {
		let config = LoadConfig::new()
			.with_progress_bar(true)
			.with_reset_auto_increments(true)
			.with_truncate_all_tables(true);

		assert_eq!(
			config,
			LoadConfig {
				show_progress_bar: true,
				reset_auto_increments: true,
				truncate_all_tables: true,
			}
		);
	}

	#[rstest]
	#[case(r#"{}"#, LoadConfig::new())]
	#[case(
		r#"{"truncate_all_tables": true}"#,
		LoadConfig::new().with_truncate_all_tables(true)
	)]
	#[case(
		r#"{"show_progress_bar": true, "reset_auto_increments": true}"#,
		LoadConfig::new().with_progress_bar(true).with_reset_auto_increments(true)
	)]
	fn test_config_from_settings(#[case] json: &str, #[case] expected: LoadConfig) {
		let config: LoadConfig = serde_json::from_str(json).unwrap();

		assert_eq!(config, expected);
	}

	// ========================================================================
	// Loader
	// ========================================================================

	#[rstest]
	#[tokio::test]
	async fn test_empty_loader_loads_nothing() {
		let db = Arc::new(StubDatabase::default());

		let result = loader(&db).load(&LoadConfig::new()).await.unwrap();

		assert_eq!(result, LoadResult::default());
		assert!(db.statements.lock().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_builder_accumulates_fixtures() {
		let db = Arc::new(StubDatabase::default());

		let loader = loader(&db)
			.with_fixtures(vec![Arc::new(NamedFixture("a"))])
			.add_fixture(Arc::new(NamedFixture("b")));
		let result = loader.load(&LoadConfig::new()).await.unwrap();

		assert_eq!(loader.fixtures().len(), 2);
		assert_eq!(result.fixtures_loaded, vec!["a", "b"]);
		assert_eq!(*db.statements.lock(), vec!["LOAD a", "LOAD b"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_name_is_not_found() {
		let db = Arc::new(StubDatabase::default());
		let loader = loader(&db).with_fixtures(vec![Arc::new(NamedFixture("a"))]);

		let result = loader.load_fixture_by_name("b").await;

		assert!(matches!(result, Err(SeedingError::FixtureNotFound(ref name)) if name == "b"));
		assert!(db.statements.lock().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_cancelled_before_start_writes_nothing() {
		let db = Arc::new(StubDatabase::default());
		let token = CancellationToken::new();
		let loader = loader(&db)
			.with_fixtures(vec![Arc::new(NamedFixture("a"))])
			.with_cancellation(token.clone());
		token.cancel();

		let result = loader
			.load(&LoadConfig::new().with_truncate_all_tables(true))
			.await;

		assert!(matches!(result, Err(SeedingError::Cancelled)));
		assert!(db.statements.lock().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_transaction_unsupported_fails_before_writing() {
		let db = Arc::new(StubDatabase::default());
		let loader = loader(&db).with_fixtures(vec![Arc::new(NamedFixture("a"))]);

		let result = loader.load_in_transaction(&LoadConfig::new()).await;

		assert!(matches!(result, Err(SeedingError::TransactionError(_))));
		assert!(db.statements.lock().is_empty());
	}
}
