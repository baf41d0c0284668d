//! Table dependency graph built from foreign keys.
//!
//! Each table gets a [`NodeId`]. Names live in a single insertion-ordered
//! arena, so the name→id and id→name lookups can never disagree. An edge
//! `A → B` means "A has a foreign key into B", so B must be copied first.

use std::collections::BTreeSet;

use indexmap::IndexSet;

use crate::{Error, ForeignKey};

/// Identifier of a table inside a [`TableGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Insert-only arena mapping table names to node ids and back.
#[derive(Debug, Clone, Default)]
pub struct TableArena {
    names: IndexSet<String>,
}

impl TableArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, returning its node. Registering the same name
    /// twice returns the node assigned the first time.
    pub fn insert(&mut self, name: &str) -> NodeId {
        if let Some(idx) = self.names.get_index_of(name) {
            return NodeId(idx);
        }
        let (idx, _) = self.names.insert_full(name.to_string());
        NodeId(idx)
    }

    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.names.get_index_of(name).map(NodeId)
    }

    /// Name of the table behind `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` was not handed out by this arena.
    pub fn table(&self, node: NodeId) -> &str {
        &self.names[node.0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.names.len()).map(NodeId)
    }
}

/// Immutable dependency graph over a set of tables.
#[derive(Debug, Clone)]
pub struct TableGraph {
    arena: TableArena,
    /// `dependencies[a]` holds every `b` with an edge `a → b`.
    dependencies: Vec<BTreeSet<NodeId>>,
    /// Reverse adjacency: `dependents[b]` holds every `a` with an edge `a → b`.
    dependents: Vec<BTreeSet<NodeId>>,
}

impl TableGraph {
    /// Build the graph for `tables`, adding one edge per distinct
    /// (from table, to table) pair found in `foreign_keys`.
    ///
    /// Fails if a foreign key mentions a table that is not in `tables`.
    pub fn build(tables: &[String], foreign_keys: &[ForeignKey]) -> Result<Self, Error> {
        let mut arena = TableArena::new();
        for table in tables {
            arena.insert(table);
        }

        let mut dependencies = vec![BTreeSet::new(); arena.len()];
        let mut dependents = vec![BTreeSet::new(); arena.len()];

        for fk in foreign_keys {
            let from = Self::endpoint(&arena, fk, &fk.from_table)?;
            let to = Self::endpoint(&arena, fk, &fk.to_table)?;

            // Several FK columns between the same pair collapse to one edge.
            if dependencies[from.0].insert(to) {
                dependents[to.0].insert(from);
            }
        }

        Ok(Self {
            arena,
            dependencies,
            dependents,
        })
    }

    fn endpoint(arena: &TableArena, fk: &ForeignKey, table: &str) -> Result<NodeId, Error> {
        arena.node(table).ok_or_else(|| Error::GraphConsistency {
            foreign_key: fk.clone(),
            missing_table: table.to_string(),
        })
    }

    pub fn arena(&self) -> &TableArena {
        &self.arena
    }

    pub fn table(&self, node: NodeId) -> &str {
        self.arena.table(node)
    }

    pub fn node(&self, table: &str) -> Option<NodeId> {
        self.arena.node(table)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.dependencies[from.0].contains(&to)
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(BTreeSet::len).sum()
    }

    /// Tables `node` references (must be copied before it).
    pub fn dependencies(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dependencies[node.0].iter().copied()
    }

    /// Tables referencing `node` (must be copied after it).
    pub fn dependents(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dependents[node.0].iter().copied()
    }

    /// Names of the tables `node` depends on, sorted by name.
    pub fn dependency_names(&self, node: NodeId) -> Vec<String> {
        let mut names: Vec<String> = self
            .dependencies(node)
            .map(|n| self.table(n).to_string())
            .collect();
        names.sort();
        names
    }
}
