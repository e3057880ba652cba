//! Upstream subgraph resolution
//!
//! For one anchor (a tagged actor) the subgraph is the set of untagged
//! actors that transitively feed it and therefore must fire before it.
//! Traversal walks incoming edges backward and stops at every tagged
//! actor: their firing is governed by their own position in the schedule.
//!
//! # Diamonds
//!
//! For `A -> B -> D`, `A -> C -> D` with only `D` tagged, `A` is reached
//! twice. It becomes a member once, but both `A -> B` and `A -> C` are
//! kept so every path to the anchor stays visible.

use std::collections::BTreeSet;

use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::ActorGraph;
use crate::types::ActorId;
use crate::validation::validate_acyclic;

/// Untagged actors that must fire before an anchor
///
/// The anchor itself is the implicit terminal and never a member, even
/// when it feeds itself. Members may be shared with other subgraphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subgraph {
    anchor: ActorId,
    members: BTreeSet<ActorId>,
    edges: BTreeSet<(ActorId, ActorId)>,
    /// Members in a topological order, filled in once validated
    order: Vec<ActorId>,
}

impl Subgraph {
    /// An empty subgraph for an anchor with no untagged producers
    pub fn empty(anchor: ActorId) -> Self {
        Self {
            anchor,
            members: BTreeSet::new(),
            edges: BTreeSet::new(),
            order: Vec::new(),
        }
    }

    pub fn anchor(&self) -> ActorId {
        self.anchor
    }

    pub fn members(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.members.iter().copied()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.members.contains(&id)
    }

    /// Edges between members, and from members into the anchor
    pub fn edges(&self) -> impl Iterator<Item = (ActorId, ActorId)> + '_ {
        self.edges.iter().copied()
    }

    pub fn contains_edge(&self, source: ActorId, target: ActorId) -> bool {
        self.edges.contains(&(source, target))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in an order where every producer precedes its consumers
    pub fn firing_order(&self) -> &[ActorId] {
        &self.order
    }

    /// Members plus the anchor as a standalone graph
    pub(crate) fn to_graph_map(&self) -> DiGraphMap<ActorId, ()> {
        let mut map = DiGraphMap::with_capacity(self.members.len() + 1, self.edges.len());
        for &member in &self.members {
            map.add_node(member);
        }
        map.add_node(self.anchor);
        for &(source, target) in &self.edges {
            map.add_edge(source, target, ());
        }
        map
    }
}

/// Collect the upstream subgraph of `anchor` without validating it
///
/// Uses an explicit worklist rather than recursion so deep producer
/// chains do not grow the call stack.
pub fn collect_upstream(graph: &ActorGraph, anchor: ActorId) -> Subgraph {
    let mut subgraph = Subgraph::empty(anchor);
    let mut stack = vec![anchor];

    while let Some(node) = stack.pop() {
        for pred in graph.predecessors(node) {
            if pred == anchor || graph.is_tagged(pred) {
                log::trace!(
                    "Stopping at tagged actor '{}' upstream of '{}'",
                    graph.actor_ref(pred),
                    graph.actor_ref(anchor)
                );
                continue;
            }
            if subgraph.edges.insert((pred, node)) {
                log::trace!(
                    "Adding edge {} -> {} to subgraph of '{}'",
                    graph.actor_ref(pred),
                    graph.actor_ref(node),
                    graph.actor_ref(anchor)
                );
            }
            if subgraph.members.insert(pred) {
                stack.push(pred);
            }
        }
    }

    subgraph
}

/// Resolve and validate the upstream subgraph of `anchor`
///
/// Fails with `CycleDetected` when the members contain a loop that does
/// not pass through a tagged actor.
pub fn resolve_subgraph(graph: &ActorGraph, anchor: ActorId) -> Result<Subgraph> {
    let mut subgraph = collect_upstream(graph, anchor);
    subgraph.order = validate_acyclic(graph, &subgraph)?;

    log::debug!(
        "Resolved subgraph of '{}': {} members, {} edges",
        graph.actor_ref(anchor),
        subgraph.members.len(),
        subgraph.edges.len()
    );
    Ok(subgraph)
}
