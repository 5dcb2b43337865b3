//! Table ordering for destructive clears.
//!
//! Tables are peeled in passes: every table whose remaining references are
//! all gone is emitted, then removed from the references of the tables that
//! are left. A pass that frees nothing while tables remain means the
//! reference graph has a cycle.

use indexmap::{IndexMap, IndexSet};

use crate::error::{SeedingError, SeedingResult};

/// Orders tables by foreign-key reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableResolver;

impl TableResolver {
	/// Creates a new resolver.
	pub fn new() -> Self {
		Self
	}

	/// Orders `tables` so each one appears after every table it references.
	///
	/// `references_of` is asked once per table for the tables it points to.
	/// References to tables outside `tables` are ignored, duplicate table
	/// names collapse to their first occurrence, and tables freed in the same
	/// pass keep their input order.
	///
	/// # Errors
	///
	/// Returns [`SeedingError::CyclicDependency`] listing the tables that
	/// could not be ordered, including self-referencing tables.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_fixtures::schema::TableResolver;
	///
	/// let tables = vec!["payments".to_string(), "orders".to_string(), "customers".to_string()];
	/// let order = TableResolver::new()
	///     .order(&tables, |table| match table {
	///         "payments" => vec!["orders".to_string()],
	///         "orders" => vec!["customers".to_string()],
	///         _ => vec![],
	///     })
	///     .unwrap();
	///
	/// assert_eq!(order, vec!["customers", "orders", "payments"]);
	/// ```
	pub fn order<F>(&self, tables: &[String], mut references_of: F) -> SeedingResult<Vec<String>>
	where
		F: FnMut(&str) -> Vec<String>,
	{
		let known: IndexSet<&str> = tables.iter().map(String::as_str).collect();

		let mut pending: IndexMap<&str, IndexSet<String>> = IndexMap::with_capacity(known.len());
		for &table in &known {
			let references = references_of(table)
				.into_iter()
				.filter(|reference| known.contains(reference.as_str()))
				.collect();
			pending.insert(table, references);
		}

		let mut ordered = Vec::with_capacity(pending.len());
		while !pending.is_empty() {
			let freed: Vec<&str> = pending
				.iter()
				.filter(|(_, references)| references.is_empty())
				.map(|(table, _)| *table)
				.collect();

			if freed.is_empty() {
				return Err(SeedingError::CyclicDependency {
					tables: pending.keys().map(|table| table.to_string()).collect(),
				});
			}

			for table in &freed {
				pending.shift_remove(table);
			}
			for references in pending.values_mut() {
				for table in &freed {
					references.shift_remove(*table);
				}
			}

			tracing::debug!(tables = ?freed, "resolved truncation pass");
			ordered.extend(freed.into_iter().map(str::to_string));
		}

		Ok(ordered)
	}
}
