//! Dependency-ordered fixture loading for the Reinhardt framework.
//!
//! This crate loads test data into a relational database in a deterministic
//! order and can reset the database to a clean state first:
//!
//! - **Fixture ordering**: fixtures declare the fixtures they require and are
//!   loaded after them, with cycles reported instead of recursing forever
//! - **Table cleaning**: tables are cleared in foreign-key order and their
//!   auto-increment counters restarted per dialect
//! - **References**: fixtures hand generated values to later fixtures through
//!   a per-run, thread-safe store
//!
//! # Features
//!
//! - `sqlx-backend` - [`SqlxDatabase`](backends::SqlxDatabase) over `sqlx::AnyPool`
//!   (enabled by default)
//!
//! # Quick Start
//!
//! ```ignore
//! use reinhardt_fixtures::prelude::*;
//!
//! struct UserFixture;
//!
//! #[async_trait]
//! impl Fixture for UserFixture {
//!     fn name(&self) -> &str {
//!         "users"
//!     }
//!
//!     async fn load(&self, ctx: &LoadContext, db: &dyn SqlExecutor) -> SeedingResult<()> {
//!         db.insert_rows("users", &[row([("id", 1.into()), ("name", "admin".into())])])
//!             .await?;
//!         ctx.set_reference("user:admin", 1_i64);
//!         Ok(())
//!     }
//! }
//!
//! let db = Arc::new(SqlxDatabase::connect("postgres://localhost/app_test").await?);
//! let loader = FixtureLoader::new(db.clone(), db).add_fixture(Arc::new(UserFixture));
//!
//! let config = LoadConfig::new()
//!     .with_truncate_all_tables(true)
//!     .with_reset_auto_increments(true);
//! let result = loader.load(&config).await?;
//! println!("Loaded {} fixtures", result.fixtures_loaded.len());
//! ```
//!
//! # Architecture
//!
//! - [`FixtureResolver`](fixtures::FixtureResolver) - Orders fixtures, requirements first
//! - [`TableResolver`](schema::TableResolver) - Orders tables by foreign-key reference
//! - [`Cleaner`](schema::Cleaner) - Truncates tables and resets counters
//! - [`FixtureLoader`](fixtures::FixtureLoader) - Runs cleaning and fixtures
//! - [`ReferenceStore`](references::ReferenceStore) - Shares values between fixtures
//!
//! The database is reached only through the [`SchemaInspector`](schema::SchemaInspector)
//! and [`SqlExecutor`](schema::SqlExecutor) traits.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

#[cfg(feature = "sqlx-backend")]
pub mod backends;
pub mod error;
pub mod fixtures;
pub mod prelude;
pub mod references;
pub mod schema;

// Re-export commonly used types at crate root
pub use error::{SeedingError, SeedingResult};
pub use fixtures::{Fixture, FixtureLoader, FixtureResolver, LoadConfig, LoadResult};
pub use references::{LoadContext, ReferenceStore};
pub use schema::{Cleaner, Dialect, SchemaInspector, SqlExecutor, TableResolver};
