//! Process partitioning
//!
//! In process mode anchors are grouped by the process label of their tag
//! and each group is scheduled on its own. Tags without a process (or
//! labelled with the "none" sentinel) never start a group; such actors
//! are only scheduled when a control branch in some group reaches them.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, SchedulingError};
use crate::graph::ActorGraph;
use crate::schedule::{assemble_schedule, Anchor, Schedule};
use crate::session::SchedulingSession;

/// Group the tagged actors of a graph by process name
pub fn partition_anchors(graph: &ActorGraph, none_label: &str) -> BTreeMap<String, Vec<Anchor>> {
    let mut groups: BTreeMap<String, Vec<Anchor>> = BTreeMap::new();
    for node in graph.tagged_nodes() {
        let Some(tag) = &node.tag else {
            continue;
        };
        match tag.process_name(none_label) {
            Some(process) => groups
                .entry(process.to_string())
                .or_default()
                .push(Anchor::new(node.actor.clone(), tag.clone())),
            None => log::trace!(
                "Actor '{}' has no process and is only scheduled through a control branch",
                node.actor
            ),
        }
    }
    groups
}

/// One schedule per named process
#[derive(Debug, Clone, Default)]
pub struct ProcessSchedules {
    schedules: BTreeMap<String, Arc<Schedule>>,
}

impl ProcessSchedules {
    /// Process names in lexicographic order
    pub fn process_names(&self) -> Vec<&str> {
        self.schedules.keys().map(String::as_str).collect()
    }

    pub fn get(&self, process: &str) -> Option<&Arc<Schedule>> {
        self.schedules.get(process)
    }

    /// Like `get`, but a missing process is an error
    pub fn schedule(&self, process: &str) -> Result<Arc<Schedule>> {
        self.get(process)
            .cloned()
            .ok_or_else(|| SchedulingError::MissingSchedule(process.to_string()))
    }

    /// Schedules in process-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Schedule>)> + '_ {
        self.schedules.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

/// Build one schedule per process group
///
/// Groups are built in name order and share the session, so the
/// unreachable-actor report afterwards covers every process. The first
/// failing group aborts the whole build.
pub fn build_process_schedules(
    graph: &ActorGraph,
    none_label: &str,
    session: &mut SchedulingSession,
) -> Result<ProcessSchedules> {
    build_process_schedules_observed(graph, none_label, session, |_, _| {})
}

/// Like `build_process_schedules`, reporting each group's outcome
///
/// `observe` is called with the process name once per attempted group,
/// including the group that fails.
pub fn build_process_schedules_observed<F>(
    graph: &ActorGraph,
    none_label: &str,
    session: &mut SchedulingSession,
    mut observe: F,
) -> Result<ProcessSchedules>
where
    F: FnMut(&str, std::result::Result<&Schedule, &SchedulingError>),
{
    let groups = partition_anchors(graph, none_label);
    if groups.is_empty() {
        return Err(SchedulingError::NoAnchorsFound);
    }

    let mut schedules = BTreeMap::new();
    for (process, anchors) in groups {
        log::debug!(
            "[{}] Scheduling process '{}' with {} anchors",
            session.id(),
            process,
            anchors.len()
        );
        match assemble_schedule(graph, &anchors, Some(&process), session) {
            Ok(schedule) => {
                observe(&process, Ok(&schedule));
                schedules.insert(process, Arc::new(schedule));
            }
            Err(e) => {
                observe(&process, Err(&e));
                return Err(e);
            }
        }
    }

    Ok(ProcessSchedules { schedules })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;

    #[test]
    fn test_partition_skips_none_sentinel() {
        let model = ModelBuilder::new()
            .add_actor("a")
            .with_process_tag("main", 1)
            .add_actor("b")
            .with_process_tag("None", 2)
            .add_actor("c")
            .with_tag(3)
            .add_actor("d")
            .with_process_tag("aux", 1)
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);

        let groups = partition_anchors(&graph, "none");
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["aux", "main"]);
        assert_eq!(groups["main"].len(), 1);
    }

    #[test]
    fn test_process_names_are_lexicographic() {
        let model = ModelBuilder::new()
            .add_actor("z")
            .with_process_tag("zeta", 1)
            .add_actor("a")
            .with_process_tag("alpha", 1)
            .add_actor("m")
            .with_process_tag("mu", 1)
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);
        let mut session = SchedulingSession::new();

        let schedules = build_process_schedules(&graph, "none", &mut session).unwrap();
        assert_eq!(schedules.process_names(), vec!["alpha", "mu", "zeta"]);
        assert_eq!(schedules.get("mu").unwrap().process(), Some("mu"));
        assert_eq!(
            schedules.schedule("omega").unwrap_err(),
            SchedulingError::MissingSchedule("omega".to_string())
        );
    }

    #[test]
    fn test_only_unlabelled_tags_means_no_anchors() {
        let model = ModelBuilder::new()
            .add_actor("a")
            .with_tag(1)
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);
        let mut session = SchedulingSession::new();

        assert_eq!(
            build_process_schedules(&graph, "none", &mut session).unwrap_err(),
            SchedulingError::NoAnchorsFound
        );
    }

    #[test]
    fn test_unlabelled_branch_target_is_scheduled() {
        let model = ModelBuilder::new()
            .add_control("check", &["ok"])
            .with_process_tag("main", 1)
            .add_actor("handler")
            .with_tag(2)
            .connect("check", "ok", "handler", "input")
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);
        let mut session = SchedulingSession::new();

        let schedules = build_process_schedules(&graph, "none", &mut session).unwrap();
        let main = schedules.schedule("main").unwrap();
        let handler = model.find_by_name("handler").unwrap().id;
        assert!(main.is_dependent(handler));
        assert!(main.subgraph(handler).is_some());
        assert!(!session.has_unreachable());
    }

    #[test]
    fn test_observer_names_the_failing_group() {
        let model = ModelBuilder::new()
            .add_actor("a1")
            .with_process_tag("alpha", 1)
            .add_actor("x")
            .add_actor("y")
            .add_actor("b1")
            .with_process_tag("beta", 1)
            .add_actor("c1")
            .with_process_tag("gamma", 1)
            .connect("x", "output", "y", "input")
            .connect("y", "output", "x", "input")
            .connect("y", "output", "b1", "input")
            .build()
            .unwrap();
        let graph = ActorGraph::build(&model);
        let mut session = SchedulingSession::new();

        let mut seen: Vec<(String, bool)> = Vec::new();
        let err = build_process_schedules_observed(&graph, "none", &mut session, |process, outcome| {
            seen.push((process.to_string(), outcome.is_ok()))
        })
        .unwrap_err();

        assert!(matches!(err, SchedulingError::CycleDetected { .. }));
        assert_eq!(
            seen,
            vec![("alpha".to_string(), true), ("beta".to_string(), false)]
        );
    }
}
