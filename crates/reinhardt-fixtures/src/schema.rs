//! Schema-side collaborators and table maintenance.
//!
//! - [`SchemaInspector`] lists tables and their foreign-key references
//! - [`SqlExecutor`] runs statements and fixture inserts
//! - [`TableResolver`] orders tables so referenced tables come first
//! - [`Cleaner`] truncates tables and restarts auto-increment counters

pub mod cleaner;
pub mod dialect;
pub mod executor;
pub mod inspector;
pub mod resolver;

pub use cleaner::Cleaner;
pub use dialect::Dialect;
pub use executor::{FixtureRow, QueryValue, SqlExecutor, TransactionExecutor, build_insert, row};
pub use inspector::SchemaInspector;
pub use resolver::TableResolver;
