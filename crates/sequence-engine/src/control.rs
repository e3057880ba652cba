//! Control table construction
//!
//! A control actor's output ports are mutually exclusive branches. The
//! actors wired directly (one hop) to a branch port fire only when the
//! control actor takes that branch, so they are pulled out of the
//! top-level list and recorded per port, ordered by sequence number.
//!
//! A branch target that is itself a control actor gets its own entry,
//! so nested branching is fully described by the table.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};
use crate::graph::{ActorGraph, Branch};
use crate::schedule::Anchor;
use crate::types::ActorId;
use crate::validation::validate_unique_sequence_numbers;

/// Ordered actors behind one output port of a control actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchList {
    pub port: String,
    pub anchors: Vec<Anchor>,
}

/// Branch lists of one control actor, in output-port order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEntry {
    pub control: Anchor,
    pub branches: Vec<BranchList>,
}

impl ControlEntry {
    /// Ordered actors of one branch
    pub fn branch(&self, port: &str) -> Option<&[Anchor]> {
        self.branches
            .iter()
            .find(|b| b.port == port)
            .map(|b| b.anchors.as_slice())
    }

    pub fn ports(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.port.as_str()).collect()
    }
}

/// Mapping from control actor to its per-port branch lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlTable {
    entries: BTreeMap<ActorId, ControlEntry>,
}

impl ControlTable {
    pub fn entry(&self, control: ActorId) -> Option<&ControlEntry> {
        self.entries.get(&control)
    }

    /// Ordered actors behind one port of a control actor
    pub fn branch(&self, control: ActorId, port: &str) -> Option<&[Anchor]> {
        self.entry(control).and_then(|e| e.branch(port))
    }

    pub fn is_control(&self, id: ActorId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Control entries in actor id order
    pub fn entries(&self) -> impl Iterator<Item = &ControlEntry> + '_ {
        self.entries.values()
    }

    /// Every actor listed in any branch
    pub fn dependents(&self) -> BTreeSet<ActorId> {
        self.entries
            .values()
            .flat_map(|e| e.branches.iter())
            .flat_map(|b| b.anchors.iter().map(Anchor::id))
            .collect()
    }

    /// Whether an actor is listed in any branch
    pub fn contains_dependent(&self, id: ActorId) -> bool {
        self.entries
            .values()
            .flat_map(|e| e.branches.iter())
            .any(|b| b.anchors.iter().any(|a| a.id() == id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tagged actors directly behind one branch port, sorted by sequence number
///
/// Every target must carry a tag. Duplicate numbers are left for the
/// caller to check.
pub fn branch_anchors(graph: &ActorGraph, control: ActorId, branch: &Branch) -> Result<Vec<Anchor>> {
    let mut anchors = branch
        .targets
        .iter()
        .map(|&target| match graph.node(target) {
            Some(node) => node
                .tag
                .clone()
                .map(|tag| Anchor::new(node.actor.clone(), tag))
                .ok_or_else(|| missing_tag(graph, control, branch)),
            None => Err(SchedulingError::UnknownActor(target)),
        })
        .collect::<Result<Vec<_>>>()?;
    anchors.sort_by_key(Anchor::sequence_number);
    Ok(anchors)
}

fn missing_tag(graph: &ActorGraph, control: ActorId, branch: &Branch) -> SchedulingError {
    SchedulingError::MissingSequenceTag {
        downstream_of: graph.actor_ref(control),
        port: branch.port.clone(),
    }
}

/// Result of a control-table pass
#[derive(Debug, Clone, Default)]
pub struct ControlOutcome {
    pub table: ControlTable,
    /// Branch-listed actors in discovery order, without repeats
    pub dependents: Vec<Anchor>,
}

/// Builds the control table for a set of anchors
pub struct ControlTableBuilder<'g> {
    graph: &'g ActorGraph,
}

impl<'g> ControlTableBuilder<'g> {
    pub fn new(graph: &'g ActorGraph) -> Self {
        Self { graph }
    }

    /// Process every control anchor, then every control actor reached
    /// through a branch
    pub fn build(&self, anchors: &[Anchor]) -> Result<ControlOutcome> {
        let mut outcome = ControlOutcome::default();
        let mut queued: BTreeSet<ActorId> = BTreeSet::new();
        let mut listed: BTreeSet<ActorId> = BTreeSet::new();
        let mut worklist: VecDeque<Anchor> = VecDeque::new();

        for anchor in anchors.iter().filter(|a| self.is_control(a.id())) {
            if queued.insert(anchor.id()) {
                worklist.push_back(anchor.clone());
            }
        }

        while let Some(control) = worklist.pop_front() {
            let mut branches = Vec::new();

            for branch in self.graph.branches(control.id()) {
                let list = branch_anchors(self.graph, control.id(), branch)?;
                validate_unique_sequence_numbers(&list)?;

                log::debug!(
                    "Control actor '{}' branch '{}': {:?}",
                    control.actor,
                    branch.port,
                    list.iter().map(|a| a.sequence_number()).collect::<Vec<_>>()
                );

                for dependent in &list {
                    if listed.insert(dependent.id()) {
                        outcome.dependents.push(dependent.clone());
                    }
                    if self.is_control(dependent.id()) && queued.insert(dependent.id()) {
                        worklist.push_back(dependent.clone());
                    }
                }

                branches.push(BranchList {
                    port: branch.port.clone(),
                    anchors: list,
                });
            }

            outcome
                .table
                .entries
                .insert(control.id(), ControlEntry { control, branches });
        }

        Ok(outcome)
    }

    fn is_control(&self, id: ActorId) -> bool {
        self.graph.kind(id).is_some_and(|k| k.is_control())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::types::ActorModel;

    fn anchors_of(graph: &ActorGraph) -> Vec<Anchor> {
        graph
            .tagged_nodes()
            .filter_map(|n| n.tag.clone().map(|t| Anchor::new(n.actor.clone(), t)))
            .collect()
    }

    fn id(model: &ActorModel, name: &str) -> ActorId {
        model.find_by_name(name).unwrap().id
    }

    #[test]
    fn test_branches_sorted_by_sequence_number() {
        let model = ModelBuilder::new()
            .add_control("if", &["then", "else"])
            .with_tag(5)
            .add_actor("late")
            .with_tag(20)
            .add_actor("early")
            .with_tag(10)
            .add_actor("other")
            .with_tag(11)
            .connect("if", "then", "late", "input")
            .connect("if", "then", "early", "input")
            .connect("if", "else", "other", "input")
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);

        let outcome = ControlTableBuilder::new(&graph).build(&anchors_of(&graph)).unwrap();
        let then: Vec<&str> = outcome
            .table
            .branch(id(&model, "if"), "then")
            .unwrap()
            .iter()
            .map(|a| a.actor.name.as_str())
            .collect();
        assert_eq!(then, vec!["early", "late"]);
        assert_eq!(outcome.dependents.len(), 3);
        assert!(outcome.table.branch(id(&model, "if"), "missing").is_none());
    }

    #[test]
    fn test_untagged_branch_target_is_rejected() {
        let model = ModelBuilder::new()
            .add_control("if", &["then"])
            .with_tag(1)
            .add_actor("plain")
            .connect("if", "then", "plain", "input")
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);

        let err = ControlTableBuilder::new(&graph).build(&anchors_of(&graph)).unwrap_err();
        assert_eq!(
            err,
            SchedulingError::MissingSequenceTag {
                downstream_of: graph.actor_ref(id(&model, "if")),
                port: "then".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_within_branch_is_rejected() {
        let model = ModelBuilder::new()
            .add_control("if", &["then"])
            .with_tag(1)
            .add_actor("a")
            .with_tag(2)
            .add_actor("b")
            .with_tag(2)
            .connect("if", "then", "a", "input")
            .connect("if", "then", "b", "input")
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);

        let err = ControlTableBuilder::new(&graph).build(&anchors_of(&graph)).unwrap_err();
        assert!(matches!(err, SchedulingError::DuplicateSequenceNumber { number: 2, .. }));
    }

    #[test]
    fn test_same_number_in_different_branches_is_allowed() {
        let model = ModelBuilder::new()
            .add_control("if", &["then", "else"])
            .with_tag(1)
            .add_actor("a")
            .with_tag(2)
            .add_actor("b")
            .with_tag(2)
            .connect("if", "then", "a", "input")
            .connect("if", "else", "b", "input")
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);

        assert!(ControlTableBuilder::new(&graph).build(&anchors_of(&graph)).is_ok());
    }

    #[test]
    fn test_nested_control_gets_an_entry() {
        let model = ModelBuilder::new()
            .add_control("outer", &["then"])
            .with_tag(1)
            .add_control("inner", &["yes", "no"])
            .with_tag(2)
            .add_actor("leaf")
            .with_tag(3)
            .connect("outer", "then", "inner", "input")
            .connect("inner", "yes", "leaf", "input")
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);

        let outer_only: Vec<Anchor> = anchors_of(&graph)
            .into_iter()
            .filter(|a| a.actor.name == "outer")
            .collect();
        let outcome = ControlTableBuilder::new(&graph).build(&outer_only).unwrap();

        assert_eq!(outcome.table.len(), 2);
        assert_eq!(outcome.table.branch(id(&model, "inner"), "yes").unwrap().len(), 1);
        assert_eq!(outcome.table.branch(id(&model, "inner"), "no"), Some(&[][..]));
        let dependents = outcome.table.dependents();
        assert!(dependents.contains(&id(&model, "inner")));
        assert!(dependents.contains(&id(&model, "leaf")));
        for actor in ["outer", "inner", "leaf"] {
            assert_eq!(
                outcome.table.contains_dependent(id(&model, actor)),
                dependents.contains(&id(&model, actor))
            );
        }
    }
}
