//! Schedule assembly
//!
//! A `Schedule` bundles the top-level (independent) anchors, the control
//! table and one resolved subgraph per scheduled anchor. It is immutable
//! once assembled and is handed out behind an `Arc` so a firing driver can
//! read it while the scheduler keeps it cached.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::control::{ControlOutcome, ControlTable, ControlTableBuilder};
use crate::error::{Result, SchedulingError};
use crate::graph::ActorGraph;
use crate::session::SchedulingSession;
use crate::subgraph::{resolve_subgraph, Subgraph};
use crate::tag::SequenceTag;
use crate::types::{ActorId, ActorRef};
use crate::validation::validate_unique_sequence_numbers;

/// A tagged actor together with its tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub actor: ActorRef,
    pub tag: SequenceTag,
}

impl Anchor {
    pub fn new(actor: ActorRef, tag: SequenceTag) -> Self {
        Self { actor, tag }
    }

    pub fn id(&self) -> ActorId {
        self.actor.id
    }

    pub fn sequence_number(&self) -> u32 {
        self.tag.sequence_number
    }
}

/// An assembled, validated schedule for one set of anchors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    process: Option<String>,
    independent: Vec<Anchor>,
    control_table: ControlTable,
    subgraphs: BTreeMap<ActorId, Subgraph>,
}

impl Schedule {
    /// Process this schedule was built for, `None` in sequence mode
    pub fn process(&self) -> Option<&str> {
        self.process.as_deref()
    }

    /// Top-level anchors in ascending sequence number order
    pub fn independent(&self) -> &[Anchor] {
        &self.independent
    }

    pub fn independent_ids(&self) -> Vec<ActorId> {
        self.independent.iter().map(Anchor::id).collect()
    }

    /// Upstream subgraph of a scheduled anchor (independent or dependent)
    pub fn subgraph(&self, anchor: ActorId) -> Option<&Subgraph> {
        self.subgraphs.get(&anchor)
    }

    pub fn subgraphs(&self) -> impl Iterator<Item = &Subgraph> + '_ {
        self.subgraphs.values()
    }

    pub fn control_table(&self) -> &ControlTable {
        &self.control_table
    }

    /// Ordered actors behind one port of a control anchor
    pub fn branch(&self, control: ActorId, port: &str) -> Option<&[Anchor]> {
        self.control_table.branch(control, port)
    }

    /// Actors that only fire through a control branch
    pub fn dependents(&self) -> BTreeSet<ActorId> {
        self.control_table.dependents()
    }

    pub fn is_dependent(&self, id: ActorId) -> bool {
        self.control_table.contains_dependent(id)
    }

    /// Every anchor and subgraph member this schedule can fire
    pub fn covered_actors(&self) -> BTreeSet<ActorId> {
        self.subgraphs
            .values()
            .flat_map(|s| std::iter::once(s.anchor()).chain(s.members()))
            .collect()
    }
}

/// Assemble a schedule for one group of anchors
///
/// Every control anchor contributes a control-table entry, its branch
/// actors are removed from the top-level list, and every anchor plus every
/// branch actor gets a resolved subgraph. The session is marked only when
/// assembly succeeds; a failed build leaves no partial schedule behind.
pub fn assemble_schedule(
    graph: &ActorGraph,
    anchors: &[Anchor],
    process: Option<&str>,
    session: &mut SchedulingSession,
) -> Result<Schedule> {
    if anchors.is_empty() {
        return Err(SchedulingError::NoAnchorsFound);
    }
    session.register_graph(graph);

    let ControlOutcome { table, dependents } = ControlTableBuilder::new(graph).build(anchors)?;

    let mut subgraphs = BTreeMap::new();
    for anchor in anchors.iter().chain(dependents.iter()) {
        if subgraphs.contains_key(&anchor.id()) {
            continue;
        }
        subgraphs.insert(anchor.id(), resolve_subgraph(graph, anchor.id())?);
    }

    let dependent_ids = table.dependents();
    let mut independent: Vec<Anchor> = anchors
        .iter()
        .filter(|a| !dependent_ids.contains(&a.id()))
        .cloned()
        .collect();
    independent.sort_by_key(Anchor::sequence_number);
    validate_unique_sequence_numbers(&independent)?;

    let schedule = Schedule {
        process: process.map(str::to_string),
        independent,
        control_table: table,
        subgraphs,
    };
    for id in schedule.covered_actors() {
        session.mark_visited(id);
    }

    log::info!(
        "Assembled schedule{}: {} independent, {} dependent, {} subgraphs",
        process.map(|p| format!(" for process '{}'", p)).unwrap_or_default(),
        schedule.independent.len(),
        dependent_ids.len(),
        schedule.subgraphs.len()
    );
    Ok(schedule)
}
