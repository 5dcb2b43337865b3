//! Error types for fixture loading.
//!
//! Every component returns the first error it meets and stops the remaining
//! work of that call. Nothing here retries and nothing terminates the process.

use thiserror::Error;

/// Errors that can occur while ordering, cleaning, or loading fixtures.
#[derive(Debug, Error)]
pub enum SeedingError {
	/// No fixture with the given name is configured on the loader.
	#[error("Fixture not found: {0}")]
	FixtureNotFound(String),

	/// The foreign-key graph of the tables to clear contains a cycle.
	#[error("Cyclic dependency detected between tables: {}", tables.join(", "))]
	CyclicDependency {
		/// Tables that could not be ordered.
		tables: Vec<String>,
	},

	/// Fixtures require each other in a loop.
	#[error("Cyclic fixture dependency: {}", path.join(" -> "))]
	CyclicFixtureDependency {
		/// Fixture names along the cycle, first and last entries are equal.
		path: Vec<String>,
	},

	/// A statement issued for a table failed.
	#[error("Statement failed for table {table}: {source}")]
	StatementExecution {
		/// Table the statement targeted.
		table: String,
		/// Underlying executor failure.
		#[source]
		source: Box<SeedingError>,
	},

	/// A fixture returned an error while loading.
	#[error("Loading fixture {fixture} failed: {source}")]
	FixtureFailed {
		/// Name of the failing fixture.
		fixture: String,
		/// Error returned by the fixture.
		#[source]
		source: Box<SeedingError>,
	},

	/// Reference lookup miss on the reference store.
	#[error("Reference not found: {0}")]
	ReferenceNotFound(String),

	/// A reference exists but holds a value of another type.
	#[error("Reference {id} does not hold a value of type {expected}")]
	ReferenceTypeMismatch {
		/// Reference identifier.
		id: String,
		/// Requested type name.
		expected: &'static str,
	},

	/// Database operation failed.
	#[error("Database error: {0}")]
	DatabaseError(String),

	/// Error reported by the sqlx driver.
	#[cfg(feature = "sqlx-backend")]
	#[error("SQL error: {0}")]
	Sqlx(#[from] sqlx::Error),

	/// Validation failed for a specific field.
	#[error("Validation error: {field}: {message}")]
	ValidationError {
		/// Field that failed validation.
		field: String,
		/// Validation error message.
		message: String,
	},

	/// Transaction error.
	#[error("Transaction error: {0}")]
	TransactionError(String),

	/// The run was cancelled through its cancellation token.
	#[error("Fixture loading was cancelled")]
	Cancelled,
}

impl SeedingError {
	/// Wraps an executor error with the table it was issued for.
	pub fn statement(table: impl Into<String>, source: SeedingError) -> Self {
		SeedingError::StatementExecution {
			table: table.into(),
			source: Box::new(source),
		}
	}

	/// Wraps a fixture error with the fixture name.
	pub fn fixture(fixture: impl Into<String>, source: SeedingError) -> Self {
		SeedingError::FixtureFailed {
			fixture: fixture.into(),
			source: Box::new(source),
		}
	}
}

/// Result type alias for seeding operations.
pub type SeedingResult<T> = Result<T, SeedingError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::error::Error as _;

	#[rstest]
	fn test_fixture_not_found_error() {
		let error = SeedingError::FixtureNotFound("users".to_string());
		assert_eq!(error.to_string(), "Fixture not found: users");
	}

	#[rstest]
	fn test_cyclic_dependency_lists_tables() {
		let error = SeedingError::CyclicDependency {
			tables: vec!["orders".to_string(), "payments".to_string()],
		};
		assert_eq!(
			error.to_string(),
			"Cyclic dependency detected between tables: orders, payments"
		);
	}

	#[rstest]
	fn test_cyclic_fixture_dependency_shows_path() {
		let error = SeedingError::CyclicFixtureDependency {
			path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
		};
		assert_eq!(error.to_string(), "Cyclic fixture dependency: a -> b -> a");
	}

	#[rstest]
	fn test_statement_error_keeps_source() {
		let error = SeedingError::statement(
			"orders",
			SeedingError::DatabaseError("permission denied".to_string()),
		);
		assert_eq!(
			error.to_string(),
			"Statement failed for table orders: Database error: permission denied"
		);
		let source = error.source().unwrap();
		assert_eq!(source.to_string(), "Database error: permission denied");
	}

	#[rstest]
	fn test_fixture_error_wraps_reference_miss() {
		let error = SeedingError::fixture(
			"orders",
			SeedingError::ReferenceNotFound("user:1".to_string()),
		);
		assert!(matches!(
			error,
			SeedingError::FixtureFailed { ref fixture, .. } if fixture == "orders"
		));
		assert_eq!(
			error.to_string(),
			"Loading fixture orders failed: Reference not found: user:1"
		);
	}
}
