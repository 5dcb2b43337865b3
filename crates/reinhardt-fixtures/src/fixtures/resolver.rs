//! Fixture dependency resolution.
//!
//! Fixtures are ordered by a depth-first post-order walk over their required
//! relations, starting from the caller's fixtures in the order given. A
//! fixture is emitted once, after everything it requires. Fixtures reached
//! only through `required_relations` are part of the result as well.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use super::Fixture;
use crate::error::{SeedingError, SeedingResult};

/// Orders fixtures so that requirements load before their dependents.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureResolver;

impl FixtureResolver {
	/// Creates a new resolver.
	pub fn new() -> Self {
		Self
	}

	/// Resolves the load order of `fixtures`.
	///
	/// When no fixture declares relations the input is returned unchanged.
	/// Otherwise every reachable fixture appears exactly once, after all the
	/// fixtures it requires, and independent fixtures keep the order in
	/// which they were first reached.
	///
	/// # Errors
	///
	/// Returns [`SeedingError::CyclicFixtureDependency`] when fixtures
	/// require each other in a loop.
	pub fn order(&self, fixtures: &[Arc<dyn Fixture>]) -> SeedingResult<Vec<Arc<dyn Fixture>>> {
		let graph = DependencyGraph::build(fixtures);
		if !graph.has_relations() {
			return Ok(fixtures.to_vec());
		}

		let roots: Vec<&str> = fixtures.iter().map(|f| f.name()).collect();
		graph.sort(&roots)
	}

	/// Resolves `fixture` together with its transitive requirements.
	///
	/// The returned list ends with `fixture` itself.
	pub fn dependencies_of(
		&self,
		fixture: &Arc<dyn Fixture>,
	) -> SeedingResult<Vec<Arc<dyn Fixture>>> {
		let graph = DependencyGraph::build(std::slice::from_ref(fixture));
		graph.sort(&[fixture.name()])
	}

	/// Resolves `fixtures` and groups them by dependency depth.
	///
	/// Level 0 holds fixtures without requirements, level `n` holds fixtures
	/// whose deepest requirement sits on level `n - 1`. Fixtures of one level
	/// never depend on each other.
	pub fn levels(
		&self,
		fixtures: &[Arc<dyn Fixture>],
	) -> SeedingResult<Vec<Vec<Arc<dyn Fixture>>>> {
		let graph = DependencyGraph::build(fixtures);
		if !graph.has_relations() {
			return Ok(if fixtures.is_empty() {
				Vec::new()
			} else {
				vec![fixtures.to_vec()]
			});
		}

		let roots: Vec<&str> = fixtures.iter().map(|f| f.name()).collect();
		let ordered = graph.sort(&roots)?;

		let mut depths: IndexMap<&str, usize> = IndexMap::with_capacity(ordered.len());
		let mut levels: Vec<Vec<Arc<dyn Fixture>>> = Vec::new();

		for fixture in &ordered {
			let depth = graph
				.requirements(fixture.name())
				.iter()
				.filter_map(|name| depths.get(name.as_str()))
				.map(|depth| depth + 1)
				.max()
				.unwrap_or(0);
			depths.insert(fixture.name(), depth);

			if levels.len() <= depth {
				levels.resize_with(depth + 1, Vec::new);
			}
			levels[depth].push(Arc::clone(fixture));
		}

		Ok(levels)
	}
}

struct Node {
	fixture: Arc<dyn Fixture>,
	requires: Option<Vec<String>>,
}

/// Fixtures keyed by name, each with its relations resolved once.
struct DependencyGraph {
	nodes: IndexMap<String, Node>,
}

impl DependencyGraph {
	fn build(fixtures: &[Arc<dyn Fixture>]) -> Self {
		let mut nodes: IndexMap<String, Node> = IndexMap::with_capacity(fixtures.len());
		for fixture in fixtures {
			nodes
				.entry(fixture.name().to_string())
				.or_insert_with(|| Node {
					fixture: Arc::clone(fixture),
					requires: None,
				});
		}

		// The map grows while discovered requirements are appended.
		let mut index = 0;
		while index < nodes.len() {
			let relations = nodes[index].fixture.required_relations();

			if let Some(relations) = relations {
				let mut requires = Vec::with_capacity(relations.len());
				for relation in relations {
					let name = relation.name().to_string();
					nodes.entry(name.clone()).or_insert_with(|| Node {
						fixture: relation,
						requires: None,
					});
					requires.push(name);
				}
				nodes[index].requires = Some(requires);
			}

			index += 1;
		}

		Self { nodes }
	}

	fn has_relations(&self) -> bool {
		self.nodes.values().any(|node| node.requires.is_some())
	}

	fn requirements(&self, name: &str) -> &[String] {
		self.nodes
			.get(name)
			.and_then(|node| node.requires.as_deref())
			.unwrap_or_default()
	}

	fn sort(&self, roots: &[&str]) -> SeedingResult<Vec<Arc<dyn Fixture>>> {
		let mut walk = Walk {
			graph: self,
			visiting: IndexSet::new(),
			visited: HashSet::with_capacity(self.nodes.len()),
			ordered: Vec::with_capacity(self.nodes.len()),
		};

		for root in roots {
			walk.visit(root)?;
		}

		tracing::debug!(
			order = ?walk.ordered.iter().map(|f| f.name()).collect::<Vec<_>>(),
			"resolved fixture order"
		);
		Ok(walk.ordered)
	}
}

struct Walk<'g> {
	graph: &'g DependencyGraph,
	/// Fixtures on the current path, in visiting order.
	visiting: IndexSet<&'g str>,
	visited: HashSet<&'g str>,
	ordered: Vec<Arc<dyn Fixture>>,
}

impl<'g> Walk<'g> {
	fn visit(&mut self, name: &str) -> SeedingResult<()> {
		let graph = self.graph;
		let Some((_, key, node)) = graph.nodes.get_full(name) else {
			return Ok(());
		};
		let key = key.as_str();

		if self.visited.contains(key) {
			return Ok(());
		}
		if let Some(start) = self.visiting.get_index_of(key) {
			let mut path: Vec<String> = self
				.visiting
				.iter()
				.skip(start)
				.map(|name| name.to_string())
				.collect();
			path.push(key.to_string());
			return Err(SeedingError::CyclicFixtureDependency { path });
		}

		self.visiting.insert(key);
		for requirement in node.requires.iter().flatten() {
			self.visit(requirement)?;
		}
		self.visiting.pop();

		self.visited.insert(key);
		self.ordered.push(Arc::clone(&node.fixture));
		Ok(())
	}
}
