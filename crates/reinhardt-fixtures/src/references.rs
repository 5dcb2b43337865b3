//! Cross-fixture references.
//!
//! A fixture loaded earlier can publish values (generated primary keys,
//! tokens, whole model instances) under a string identifier for fixtures
//! loaded later in the same run. Each run gets a fresh store.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{SeedingError, SeedingResult};

/// Opaque value held by a [`ReferenceStore`].
pub type ReferenceValue = Arc<dyn Any + Send + Sync>;

/// Thread-safe identifier to value map scoped to one load run.
///
/// Writers take the lock exclusively, readers share it.
///
/// # Examples
///
/// ```
/// use reinhardt_fixtures::references::ReferenceStore;
///
/// let store = ReferenceStore::new();
/// store.set("user:admin", 42_i64);
///
/// assert_eq!(*store.get::<i64>("user:admin").unwrap(), 42);
/// assert!(store.get::<i64>("user:guest").is_none());
/// ```
#[derive(Default)]
pub struct ReferenceStore {
	values: RwLock<HashMap<String, ReferenceValue>>,
}

impl ReferenceStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `value` under `id`, replacing any previous value.
	pub fn set<T>(&self, id: impl Into<String>, value: T)
	where
		T: Any + Send + Sync,
	{
		self.set_raw(id, Arc::new(value));
	}

	/// Stores an already shared value under `id`.
	pub fn set_raw(&self, id: impl Into<String>, value: ReferenceValue) {
		self.values.write().insert(id.into(), value);
	}

	/// Returns the value stored under `id`, whatever its type.
	pub fn get_raw(&self, id: &str) -> Option<ReferenceValue> {
		self.values.read().get(id).cloned()
	}

	/// Returns the value stored under `id` if it has type `T`.
	pub fn get<T>(&self, id: &str) -> Option<Arc<T>>
	where
		T: Any + Send + Sync,
	{
		self.get_raw(id)?.downcast::<T>().ok()
	}

	/// Returns the value stored under `id`, failing when it is missing or of
	/// another type.
	///
	/// # Errors
	///
	/// [`SeedingError::ReferenceNotFound`] when nothing is stored under `id`,
	/// [`SeedingError::ReferenceTypeMismatch`] when the value is not a `T`.
	pub fn try_get<T>(&self, id: &str) -> SeedingResult<Arc<T>>
	where
		T: Any + Send + Sync,
	{
		let value = self
			.get_raw(id)
			.ok_or_else(|| SeedingError::ReferenceNotFound(id.to_string()))?;

		value
			.downcast::<T>()
			.map_err(|_| SeedingError::ReferenceTypeMismatch {
				id: id.to_string(),
				expected: type_name::<T>(),
			})
	}

	/// Returns true if a value is stored under `id`.
	pub fn contains(&self, id: &str) -> bool {
		self.values.read().contains_key(id)
	}

	/// Returns every stored identifier, in no particular order.
	pub fn keys(&self) -> Vec<String> {
		self.values.read().keys().cloned().collect()
	}

	/// Returns the number of stored references.
	pub fn len(&self) -> usize {
		self.values.read().len()
	}

	/// Returns true if nothing has been stored.
	pub fn is_empty(&self) -> bool {
		self.values.read().is_empty()
	}
}

impl std::fmt::Debug for ReferenceStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut keys = self.keys();
		keys.sort();
		f.debug_struct("ReferenceStore")
			.field("keys", &keys)
			.finish()
	}
}

/// State handed to every fixture of one load run.
#[derive(Debug, Default)]
pub struct LoadContext {
	references: ReferenceStore,
	cancellation: CancellationToken,
}

impl LoadContext {
	/// Creates a context with an empty reference store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a context observing `cancellation`.
	pub fn with_cancellation(cancellation: CancellationToken) -> Self {
		Self {
			references: ReferenceStore::new(),
			cancellation,
		}
	}

	/// The run's reference store.
	pub fn references(&self) -> &ReferenceStore {
		&self.references
	}

	/// Token cancelled when the caller aborts the run.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancellation
	}

	/// Returns true once the run has been cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancellation.is_cancelled()
	}

	/// Shorthand for [`ReferenceStore::set`].
	pub fn set_reference<T>(&self, id: impl Into<String>, value: T)
	where
		T: Any + Send + Sync,
	{
		self.references.set(id, value);
	}

	/// Shorthand for [`ReferenceStore::try_get`].
	pub fn reference<T>(&self, id: &str) -> SeedingResult<Arc<T>>
	where
		T: Any + Send + Sync,
	{
		self.references.try_get(id)
	}
}
