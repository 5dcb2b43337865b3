//! Convenience re-exports for common usage.
//!
//! ```ignore
//! use reinhardt_fixtures::prelude::*;
//! ```

pub use std::sync::Arc;

pub use async_trait::async_trait;

// Error types
pub use crate::error::{SeedingError, SeedingResult};

// Fixture types
pub use crate::fixtures::{
	Fixture, FixtureLoader, FixtureResolver, LoadConfig, LoadProgress, LoadResult,
	ProgressBarReporter,
};
pub use crate::references::{LoadContext, ReferenceStore};

// Schema types
pub use crate::schema::{
	Cleaner, Dialect, FixtureRow, QueryValue, SchemaInspector, SqlExecutor, TableResolver,
	TransactionExecutor, row,
};

#[cfg(feature = "sqlx-backend")]
pub use crate::backends::SqlxDatabase;
