//! Fixtures and their loading.
//!
//! A fixture is a named unit of work that populates the database. A fixture
//! that needs rows created by other fixtures declares them through
//! [`Fixture::required_relations`]; the loader then runs every requirement
//! first, even when it was never registered on the loader itself.

pub mod loader;
pub mod progress;
pub mod resolver;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SeedingResult;
use crate::references::LoadContext;
use crate::schema::SqlExecutor;

pub use loader::{FixtureLoader, LoadConfig, LoadResult};
pub use progress::{LoadProgress, ProgressBarReporter};
pub use resolver::FixtureResolver;

/// A named unit of test data.
///
/// # Examples
///
/// ```ignore
/// struct UserFixture;
///
/// #[async_trait]
/// impl Fixture for UserFixture {
///     fn name(&self) -> &str {
///         "users"
///     }
///
///     async fn load(&self, ctx: &LoadContext, db: &dyn SqlExecutor) -> SeedingResult<()> {
///         db.insert_rows("users", &[row([("id", 1.into()), ("name", "admin".into())])])
///             .await?;
///         ctx.set_reference("user:admin", 1_i64);
///         Ok(())
///     }
/// }
///
/// struct OrderFixture;
///
/// #[async_trait]
/// impl Fixture for OrderFixture {
///     fn name(&self) -> &str {
///         "orders"
///     }
///
///     fn required_relations(&self) -> Option<Vec<Arc<dyn Fixture>>> {
///         Some(vec![Arc::new(UserFixture)])
///     }
///
///     async fn load(&self, ctx: &LoadContext, db: &dyn SqlExecutor) -> SeedingResult<()> {
///         let user_id = ctx.reference::<i64>("user:admin")?;
///         db.insert_rows("orders", &[row([("user_id", (*user_id).into())])])
///             .await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Fixture: Send + Sync {
	/// Name used for lookup and logging. Must be unique within a loader.
	fn name(&self) -> &str;

	/// Fixtures that must be loaded before this one.
	///
	/// `None` marks a fixture without dependency information. `Some` marks a
	/// dependent fixture, even when the list is empty.
	fn required_relations(&self) -> Option<Vec<Arc<dyn Fixture>>> {
		None
	}

	/// Writes the fixture's data through `db`.
	async fn load(&self, ctx: &LoadContext, db: &dyn SqlExecutor) -> SeedingResult<()>;
}
