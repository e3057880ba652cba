//! Scheduling sessions
//!
//! A session carries the visited index across one or more schedule
//! builds. Every reportable actor of every graph the session has seen
//! starts out unvisited; anchors and subgraph members are marked as
//! schedules are assembled. Whatever is still unvisited afterwards is an
//! actor nothing will ever fire.

use std::collections::BTreeMap;

use crate::config::UnreachablePolicy;
use crate::error::{Result, SchedulingError};
use crate::graph::ActorGraph;
use crate::types::{ActorId, ActorRef};

/// Visited-actor bookkeeping shared by the builds of one scheduling pass
#[derive(Debug, Clone)]
pub struct SchedulingSession {
    id: String,
    visited: BTreeMap<ActorId, (ActorRef, bool)>,
}

impl SchedulingSession {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            visited: BTreeMap::new(),
        }
    }

    /// Identifier used to correlate log lines and events
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Track every reportable node of a graph, keeping existing marks
    pub fn register_graph(&mut self, graph: &ActorGraph) {
        for node in graph.reportable_nodes() {
            self.register(node.actor.clone());
        }
    }

    pub fn register(&mut self, actor: ActorRef) {
        self.visited.entry(actor.id).or_insert((actor, false));
    }

    /// Mark a tracked actor as fired by some schedule
    ///
    /// Untracked actors (error sinks) are ignored.
    pub fn mark_visited(&mut self, id: ActorId) {
        if let Some((_, visited)) = self.visited.get_mut(&id) {
            *visited = true;
        }
    }

    pub fn is_visited(&self, id: ActorId) -> bool {
        self.visited.get(&id).is_some_and(|(_, v)| *v)
    }

    /// Tracked actors that no schedule will fire, in id order
    pub fn unreachable_actors(&self) -> Vec<ActorRef> {
        self.visited
            .values()
            .filter(|(_, visited)| !visited)
            .map(|(actor, _)| actor.clone())
            .collect()
    }

    pub fn has_unreachable(&self) -> bool {
        self.visited.values().any(|(_, visited)| !visited)
    }

    /// Apply a policy to the unreachable actors found so far
    pub fn check_unreachable(&self, policy: UnreachablePolicy) -> Result<()> {
        let actors = self.unreachable_actors();
        if actors.is_empty() {
            return Ok(());
        }
        match policy {
            UnreachablePolicy::Ignore => Ok(()),
            UnreachablePolicy::Warn => {
                for actor in &actors {
                    log::warn!(
                        "[{}] Actor '{}' is upstream of nothing that will fire it",
                        self.id,
                        actor
                    );
                }
                Ok(())
            }
            UnreachablePolicy::Error => Err(SchedulingError::UnreachableActors { actors }),
        }
    }

    /// Forget every tracked actor, keeping the session id
    pub fn reset(&mut self) {
        self.visited.clear();
    }
}

impl Default for SchedulingSession {
    fn default() -> Self {
        Self::new()
    }
}
