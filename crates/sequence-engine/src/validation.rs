//! Schedule validation
//!
//! Cycle detection for resolved subgraphs, duplicate sequence number
//! detection for ordered lists, and a whole-model check that reports
//! every problem at once instead of stopping at the first.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::{kosaraju_scc, toposort};

use crate::control::branch_anchors;
use crate::error::{Result, SchedulingError};
use crate::graph::ActorGraph;
use crate::schedule::Anchor;
use crate::subgraph::{collect_upstream, Subgraph};
use crate::types::{ActorId, ActorModel};

/// Check that a subgraph is acyclic and return its members in topological order
///
/// On failure every member that lies on a cycle is named, in id order.
pub fn validate_acyclic(graph: &ActorGraph, subgraph: &Subgraph) -> Result<Vec<ActorId>> {
    let map = subgraph.to_graph_map();

    let cyclic: BTreeSet<ActorId> = kosaraju_scc(&map)
        .into_iter()
        .filter(|scc| match scc.as_slice() {
            [single] => map.contains_edge(*single, *single),
            _ => true,
        })
        .flatten()
        .collect();

    if !cyclic.is_empty() {
        return Err(cycle_error(graph, subgraph.anchor(), cyclic));
    }

    let order = toposort(&map, None).map_err(|cycle| {
        cycle_error(graph, subgraph.anchor(), BTreeSet::from([cycle.node_id()]))
    })?;

    Ok(order
        .into_iter()
        .filter(|&id| id != subgraph.anchor())
        .collect())
}

fn cycle_error(graph: &ActorGraph, anchor: ActorId, members: BTreeSet<ActorId>) -> SchedulingError {
    SchedulingError::CycleDetected {
        anchor: graph.actor_ref(anchor),
        members: members.into_iter().map(|id| graph.actor_ref(id)).collect(),
    }
}

/// Check that no two anchors in one list share a sequence number
pub fn validate_unique_sequence_numbers(anchors: &[Anchor]) -> Result<()> {
    let mut seen: HashMap<u32, &Anchor> = HashMap::new();
    for anchor in anchors {
        let number = anchor.sequence_number();
        if let Some(first) = seen.get(&number) {
            return Err(SchedulingError::DuplicateSequenceNumber {
                number,
                first: first.actor.clone(),
                second: anchor.actor.clone(),
            });
        }
        seen.insert(number, anchor);
    }
    Ok(())
}

/// Validate a model in sequence mode
///
/// Returns all validation errors found (not just the first): every cyclic
/// subgraph, every untagged branch target, and every duplicate sequence
/// number in the top-level list or in any branch.
pub fn validate_model(model: &ActorModel) -> Vec<SchedulingError> {
    let graph = ActorGraph::build(model);
    let mut errors = Vec::new();

    let anchors: Vec<Anchor> = graph
        .tagged_nodes()
        .filter_map(|n| n.tag.clone().map(|tag| Anchor::new(n.actor.clone(), tag)))
        .collect();
    if anchors.is_empty() {
        errors.push(SchedulingError::NoAnchorsFound);
        return errors;
    }

    for anchor in &anchors {
        let subgraph = collect_upstream(&graph, anchor.id());
        if let Err(e) = validate_acyclic(&graph, &subgraph) {
            errors.push(e);
        }
    }

    let mut dependents: BTreeSet<ActorId> = BTreeSet::new();
    for anchor in anchors.iter().filter(|a| graph.kind(a.id()).is_some_and(|k| k.is_control())) {
        for branch in graph.branches(anchor.id()) {
            match branch_anchors(&graph, anchor.id(), branch) {
                Ok(list) => {
                    if let Err(e) = validate_unique_sequence_numbers(&list) {
                        errors.push(e);
                    }
                    dependents.extend(list.iter().map(Anchor::id));
                }
                Err(e) => errors.push(e),
            }
        }
    }

    let mut independent: Vec<Anchor> = anchors
        .into_iter()
        .filter(|a| !dependents.contains(&a.id()))
        .collect();
    independent.sort_by_key(Anchor::sequence_number);
    if let Err(e) = validate_unique_sequence_numbers(&independent) {
        errors.push(e);
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::tag::SequenceTag;
    use crate::types::ActorRef;

    #[test]
    fn test_duplicate_sequence_numbers() {
        let model = ModelBuilder::new()
            .add_actor("a")
            .with_tag(1)
            .add_actor("b")
            .with_tag(1)
            .build()
            .unwrap();
        let anchors: Vec<Anchor> = model
            .tagged_actors()
            .map(|(a, t)| Anchor::new(a.actor_ref(), t.clone()))
            .collect();

        let err = validate_unique_sequence_numbers(&anchors).unwrap_err();
        match err {
            SchedulingError::DuplicateSequenceNumber { number, first, second } => {
                assert_eq!(number, 1);
                assert_eq!(first.name, "a");
                assert_eq!(second.name, "b");
            }
            other => panic!("Expected DuplicateSequenceNumber, got {:?}", other),
        }
    }

    #[test]
    fn test_unique_numbers_pass() {
        let anchors = vec![
            Anchor::new(ActorRef::new(ActorId(0), "a"), SequenceTag::new(1)),
            Anchor::new(ActorRef::new(ActorId(1), "b"), SequenceTag::new(2)),
        ];
        assert!(validate_unique_sequence_numbers(&anchors).is_ok());
    }

    #[test]
    fn test_self_loop_member_is_a_cycle() {
        let model = ModelBuilder::new()
            .add_actor("spin")
            .add_actor("anchor")
            .with_tag(1)
            .connect("spin", "output", "spin", "input")
            .connect("spin", "output", "anchor", "input")
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);
        let anchor = model.find_by_name("anchor").unwrap().id;

        let subgraph = collect_upstream(&graph, anchor);
        let err = validate_acyclic(&graph, &subgraph).unwrap_err();
        assert!(matches!(err, SchedulingError::CycleDetected { ref members, .. } if members.len() == 1));
    }

    #[test]
    fn test_validate_model_collects_multiple_errors() {
        let model = ModelBuilder::new()
            .add_actor("x")
            .add_actor("y")
            .add_actor("first")
            .with_tag(1)
            .add_actor("second")
            .with_tag(1)
            .add_control("if", &["then"])
            .with_tag(2)
            .add_actor("untagged")
            .connect("x", "output", "y", "input")
            .connect("y", "output", "x", "input")
            .connect("y", "output", "first", "input")
            .connect("if", "then", "untagged", "input")
            .build()
            .unwrap();

        let errors = validate_model(&model);
        assert!(errors.iter().any(|e| matches!(e, SchedulingError::CycleDetected { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SchedulingError::DuplicateSequenceNumber { number: 1, .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SchedulingError::MissingSequenceTag { .. })));
    }

    #[test]
    fn test_validate_model_without_anchors() {
        let model = ModelBuilder::new().add_actor("lonely").build().unwrap();
        assert_eq!(validate_model(&model), vec![SchedulingError::NoAnchorsFound]);
    }
}
