//! SQL dialect identity and the statements that differ between backends.

use serde::{Deserialize, Serialize};

/// Relational backend a collaborator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
	/// PostgreSQL.
	Postgres,
	/// MySQL and MariaDB.
	Mysql,
	/// SQLite.
	Sqlite,
	/// A backend this crate has no specific statements for.
	Unknown,
}

impl Dialect {
	/// Detects the dialect from a connection URL scheme.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_fixtures::schema::Dialect;
	///
	/// assert_eq!(Dialect::from_url("postgres://localhost/app"), Dialect::Postgres);
	/// assert_eq!(Dialect::from_url("mariadb://localhost/app"), Dialect::Mysql);
	/// assert_eq!(Dialect::from_url("sqlite::memory:"), Dialect::Sqlite);
	/// assert_eq!(Dialect::from_url("mssql://localhost/app"), Dialect::Unknown);
	/// ```
	pub fn from_url(url: &str) -> Self {
		let scheme = url
			.split_once(':')
			.map(|(scheme, _)| scheme)
			.unwrap_or_default()
			.to_ascii_lowercase();

		match scheme.as_str() {
			"postgres" | "postgresql" => Dialect::Postgres,
			"mysql" | "mariadb" => Dialect::Mysql,
			"sqlite" => Dialect::Sqlite,
			_ => Dialect::Unknown,
		}
	}

	/// Quotes an identifier, doubling any embedded quote character.
	pub fn quote_identifier(&self, name: &str) -> String {
		match self {
			Dialect::Mysql => format!("`{}`", name.replace('`', "``")),
			Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
			Dialect::Unknown => name.to_string(),
		}
	}

	/// Positional parameter placeholder, `index` starting at 1.
	pub fn placeholder(&self, index: usize) -> String {
		match self {
			Dialect::Postgres => format!("${}", index),
			_ => "?".to_string(),
		}
	}

	/// Statement that removes every row of `table`.
	pub fn clear_table_statement(&self, table: &str) -> String {
		let quoted = self.quote_identifier(table);
		match self {
			// CASCADE keeps the statement valid while referencing tables still hold rows.
			Dialect::Postgres => format!("TRUNCATE TABLE {} CASCADE", quoted),
			Dialect::Mysql => format!("TRUNCATE TABLE {}", quoted),
			Dialect::Sqlite | Dialect::Unknown => format!("DELETE FROM {}", quoted),
		}
	}

	/// Statement that restarts the auto-increment counter of `table`.
	///
	/// Returns `None` when the dialect has no known counter syntax.
	pub fn reset_counter_statement(&self, table: &str) -> Option<String> {
		match self {
			Dialect::Postgres => Some(format!(
				"ALTER SEQUENCE {} RESTART WITH 1",
				self.quote_identifier(&format!("{}_id_seq", table))
			)),
			Dialect::Mysql => Some(format!(
				"ALTER TABLE {} AUTO_INCREMENT = 1",
				self.quote_identifier(table)
			)),
			Dialect::Sqlite => Some(format!(
				"DELETE FROM sqlite_sequence WHERE name = '{}'",
				table.replace('\'', "''")
			)),
			Dialect::Unknown => None,
		}
	}

	/// Statements that suspend and then restore foreign-key enforcement for
	/// the current session.
	///
	/// PostgreSQL clears with `CASCADE` and needs neither.
	pub fn foreign_key_toggle(&self) -> Option<(&'static str, &'static str)> {
		match self {
			Dialect::Mysql => Some(("SET FOREIGN_KEY_CHECKS = 0", "SET FOREIGN_KEY_CHECKS = 1")),
			Dialect::Sqlite => Some(("PRAGMA foreign_keys = OFF", "PRAGMA foreign_keys = ON")),
			Dialect::Postgres | Dialect::Unknown => None,
		}
	}

	/// Statement that postpones foreign-key checks until the open transaction
	/// commits.
	///
	/// SQLite ignores `PRAGMA foreign_keys` inside a transaction, so it needs
	/// this instead of [`foreign_key_toggle`](Self::foreign_key_toggle). The
	/// setting ends with the transaction.
	pub fn defer_foreign_keys_statement(&self) -> Option<&'static str> {
		match self {
			Dialect::Sqlite => Some("PRAGMA defer_foreign_keys = ON"),
			_ => None,
		}
	}

	/// Returns true if statements can be rendered for this dialect.
	pub fn is_supported(&self) -> bool {
		!matches!(self, Dialect::Unknown)
	}
}

impl std::fmt::Display for Dialect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Dialect::Postgres => "postgres",
			Dialect::Mysql => "mysql",
			Dialect::Sqlite => "sqlite",
			Dialect::Unknown => "unknown",
		};
		f.write_str(name)
	}
}
