//! Actor dependency graph
//!
//! One node per actor at a containment level, one edge per
//! "produces input for" relationship. Control actors additionally keep
//! their single-hop branch targets per output port, since port names
//! are lost on the graph edges.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::tag::SequenceTag;
use crate::types::{ActorId, ActorKind, ActorModel, ActorRef};

/// A graph vertex wrapping one actor
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub actor: ActorRef,
    pub kind: ActorKind,
    pub tag: Option<SequenceTag>,
}

impl GraphNode {
    pub fn is_tagged(&self) -> bool {
        self.tag.is_some()
    }
}

/// Direct downstream actors of one control output port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub port: String,
    pub targets: Vec<ActorId>,
}

/// Directed graph of all actors at one containment level
#[derive(Debug, Clone, Default)]
pub struct ActorGraph {
    graph: DiGraph<GraphNode, ()>,
    index: HashMap<ActorId, NodeIndex>,
    branches: HashMap<ActorId, Vec<Branch>>,
}

impl ActorGraph {
    /// Build the graph for a model
    ///
    /// A producer only becomes a predecessor when it lives in the same
    /// container as the consumer, and a branch target only when it lives in
    /// the control actor's container. Malformed connectivity is accepted
    /// as-is.
    pub fn build(model: &ActorModel) -> Self {
        let mut built = Self::default();

        for actor in model.actors() {
            let Some(consumer) = built.ensure_node(model, actor.id) else {
                continue;
            };

            for connection in model.incoming(actor.id) {
                let Ok(producer) = model.actor(connection.source) else {
                    log::warn!(
                        "Connection into '{}' references unknown actor {}",
                        actor.name,
                        connection.source
                    );
                    continue;
                };
                if producer.container != actor.container {
                    continue;
                }
                if let Some(source) = built.ensure_node(model, producer.id) {
                    built.graph.update_edge(source, consumer, ());
                }
            }

            if actor.kind.is_control() {
                let branches = actor
                    .outputs
                    .iter()
                    .map(|port| {
                        let mut targets: Vec<ActorId> = Vec::new();
                        for c in model.outgoing_from_port(actor.id, &port.id) {
                            let same_level = model
                                .actor(c.target)
                                .is_ok_and(|target| target.container == actor.container);
                            if same_level && !targets.contains(&c.target) {
                                targets.push(c.target);
                            }
                        }
                        Branch {
                            port: port.id.clone(),
                            targets,
                        }
                    })
                    .collect();
                built.branches.insert(actor.id, branches);
            }
        }

        log::debug!(
            "Built actor graph with {} nodes and {} edges",
            built.graph.node_count(),
            built.graph.edge_count()
        );
        built
    }

    fn ensure_node(&mut self, model: &ActorModel, id: ActorId) -> Option<NodeIndex> {
        if let Some(&idx) = self.index.get(&id) {
            return Some(idx);
        }
        let actor = model.actor(id).ok()?;
        let idx = self.graph.add_node(GraphNode {
            actor: actor.actor_ref(),
            kind: actor.kind,
            tag: actor.tag.clone(),
        });
        self.index.insert(id, idx);
        Some(idx)
    }

    /// Find the node for an actor
    pub fn node(&self, id: ActorId) -> Option<&GraphNode> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    /// Diagnostic reference for an actor, falling back to its id
    pub fn actor_ref(&self, id: ActorId) -> ActorRef {
        self.node(id)
            .map(|n| n.actor.clone())
            .unwrap_or_else(|| ActorRef::new(id, id.to_string()))
    }

    pub fn tag(&self, id: ActorId) -> Option<&SequenceTag> {
        self.node(id).and_then(|n| n.tag.as_ref())
    }

    pub fn is_tagged(&self, id: ActorId) -> bool {
        self.tag(id).is_some()
    }

    pub fn kind(&self, id: ActorId) -> Option<ActorKind> {
        self.node(id).map(|n| n.kind)
    }

    fn neighbors(&self, id: ActorId, direction: Direction) -> Vec<ActorId> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<ActorId> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].actor.id)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Actors feeding this one, in id order
    pub fn predecessors(&self, id: ActorId) -> Vec<ActorId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Actors fed by this one, in id order
    pub fn successors(&self, id: ActorId) -> Vec<ActorId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Branches of a control actor in output-port order
    pub fn branches(&self, id: ActorId) -> &[Branch] {
        self.branches.get(&id).map_or(&[], |b| b.as_slice())
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.graph.node_weights()
    }

    /// Nodes that take part in unreachable-actor reporting
    pub fn reportable_nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.nodes().filter(|n| n.kind != ActorKind::ErrorSink)
    }

    /// Tagged nodes in insertion order
    pub fn tagged_nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.nodes().filter(|n| n.is_tagged())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_edge(&self, source: ActorId, target: ActorId) -> bool {
        match (self.index.get(&source), self.index.get(&target)) {
            (Some(&s), Some(&t)) => self.graph.contains_edge(s, t),
            _ => false,
        }
    }
}
