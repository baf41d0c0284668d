//! Copy order solver.
//!
//! Orders tables so that every table comes after all the tables it
//! references. Uses Kahn's algorithm: each node tracks how many of its
//! dependencies have not been emitted yet, and the ready queue holds nodes
//! whose count reached zero. The queue is keyed by table name, which makes
//! the order among unrelated tables deterministic.
//!
//! ## Example
//!
//! ```text
//! comment -> post -> user      (FK edges, "depends on")
//! tag                          (no foreign keys)
//!
//! copy order: tag, user, post, comment
//! ```

use std::collections::BTreeSet;

use crate::graph::{NodeId, TableGraph};
use crate::Error;

/// Compute the copy order for `graph`.
///
/// For every edge `A → B` the result places `B` before `A`. Fails with
/// [`Error::Cycle`] when no such order exists; the error lists every table
/// that could not be scheduled.
pub fn order(graph: &TableGraph) -> Result<Vec<NodeId>, Error> {
    let mut remaining: Vec<usize> = graph
        .arena()
        .nodes()
        .map(|node| graph.dependencies(node).count())
        .collect();

    let mut ready: BTreeSet<(&str, NodeId)> = graph
        .arena()
        .nodes()
        .filter(|node| remaining[node.index()] == 0)
        .map(|node| (graph.table(node), node))
        .collect();

    let mut ordered = Vec::with_capacity(graph.len());

    while let Some((_, node)) = ready.pop_first() {
        ordered.push(node);

        for dependent in graph.dependents(node) {
            let count = &mut remaining[dependent.index()];
            *count -= 1;
            if *count == 0 {
                ready.insert((graph.table(dependent), dependent));
            }
        }
    }

    if ordered.len() < graph.len() {
        let mut stuck: Vec<String> = graph
            .arena()
            .nodes()
            .filter(|node| remaining[node.index()] > 0)
            .map(|node| graph.table(node).to_string())
            .collect();
        stuck.sort();
        return Err(Error::Cycle { tables: stuck });
    }

    Ok(ordered)
}

/// Like [`order`], but returns table names.
pub fn order_names(graph: &TableGraph) -> Result<Vec<String>, Error> {
    Ok(order(graph)?
        .into_iter()
        .map(|node| graph.table(node).to_string())
        .collect())
}
