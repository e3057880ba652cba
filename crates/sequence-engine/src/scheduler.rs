//! Scheduler front-end
//!
//! `SequenceScheduler` is what a director holds on to. It builds the actor
//! graph for a model, assembles schedules in sequence mode or process mode,
//! caches the sequence-mode schedule until the model changes, and reports
//! what happened to an attached event sink.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::{SchedulerConfig, UnreachablePolicy};
use crate::error::{Result, SchedulingError};
use crate::events::{EventSink, NullEventSink, ScheduleEvent};
use crate::graph::ActorGraph;
use crate::process::{build_process_schedules_observed, ProcessSchedules};
use crate::schedule::{assemble_schedule, Anchor, Schedule};
use crate::session::SchedulingSession;
use crate::types::{ActorId, ActorModel, ActorRef};
use crate::validation::validate_model;

/// A schedule kept for reuse while the model is unchanged
#[derive(Debug, Clone)]
struct CachedSchedule {
    schedule: Arc<Schedule>,
    /// Model revision the schedule was built from
    revision: u64,
    /// Actors a session must track when the schedule is reused
    reportable: Vec<ActorRef>,
    covered: BTreeSet<ActorId>,
}

/// Builds and caches schedules for an actor model
pub struct SequenceScheduler {
    config: SchedulerConfig,
    event_sink: Arc<dyn EventSink>,
    cached: Option<CachedSchedule>,
    valid: bool,
}

impl SequenceScheduler {
    /// Create a scheduler with the default configuration
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            event_sink: Arc::new(NullEventSink),
            cached: None,
            valid: false,
        }
    }

    /// Attach a sink for schedule events
    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Whether a cached schedule is available for reuse
    pub fn is_valid(&self) -> bool {
        self.valid && self.cached.is_some()
    }

    /// Discard the cached schedule so the next build starts from scratch
    pub fn invalidate(&mut self, reason: &str) {
        log::debug!("Invalidating cached schedule: {}", reason);
        self.cached = None;
        self.valid = false;
        self.emit(ScheduleEvent::ScheduleInvalidated {
            reason: reason.to_string(),
        });
    }

    /// Build the sequence-mode schedule: every tagged actor is an anchor
    ///
    /// While the cached schedule is valid and the model revision matches,
    /// the cached schedule is returned and the session is marked exactly as
    /// a fresh build would mark it. A failed build clears the cache.
    pub fn build_schedule(
        &mut self,
        model: &ActorModel,
        session: &mut SchedulingSession,
    ) -> Result<Arc<Schedule>> {
        if let Some(schedule) = self.reuse_cached(model, session) {
            return Ok(schedule);
        }

        let graph = ActorGraph::build(model);
        let anchors: Vec<Anchor> = graph
            .tagged_nodes()
            .filter_map(|n| n.tag.clone().map(|tag| Anchor::new(n.actor.clone(), tag)))
            .collect();

        match assemble_schedule(&graph, &anchors, None, session) {
            Ok(schedule) => {
                let schedule = Arc::new(schedule);
                self.emit_built(session, &schedule);
                self.cached = Some(CachedSchedule {
                    covered: schedule.covered_actors(),
                    schedule: Arc::clone(&schedule),
                    revision: model.revision(),
                    reportable: graph.reportable_nodes().map(|n| n.actor.clone()).collect(),
                });
                self.valid = true;
                Ok(schedule)
            }
            Err(e) => {
                self.cached = None;
                self.valid = false;
                self.emit_failed(session, &e);
                Err(e)
            }
        }
    }

    /// Build one schedule per process label
    ///
    /// Process schedules are never cached.
    pub fn build_process_schedules(
        &mut self,
        model: &ActorModel,
        session: &mut SchedulingSession,
    ) -> Result<ProcessSchedules> {
        let graph = ActorGraph::build(model);
        let session_id = session.id().to_string();
        let result = build_process_schedules_observed(
            &graph,
            &self.config.none_process_label,
            session,
            |process, outcome| match outcome {
                Ok(schedule) => self.emit(built_event(&session_id, schedule)),
                Err(e) => self.emit(failed_event(&session_id, Some(process.to_string()), e)),
            },
        );

        if let Err(e) = &result {
            log::warn!("[{}] Process schedule construction failed: {}", session_id, e);
            if matches!(e, SchedulingError::NoAnchorsFound) {
                self.emit(failed_event(&session_id, None, e));
            }
        }
        result
    }

    /// Check every problem in a model without building a schedule
    pub fn validate(&self, model: &ActorModel) -> Vec<SchedulingError> {
        validate_model(model)
    }

    /// Apply the configured unreachable-actor policy to a session
    pub fn check_unreachable(&self, session: &SchedulingSession) -> Result<()> {
        let actors = session.unreachable_actors();
        if !actors.is_empty() && self.config.unreachable_policy != UnreachablePolicy::Ignore {
            self.emit(ScheduleEvent::UnreachableActors {
                session_id: session.id().to_string(),
                actors: actors.iter().map(|a| a.name.clone()).collect(),
            });
        }
        session.check_unreachable(self.config.unreachable_policy)
    }

    fn reuse_cached(
        &mut self,
        model: &ActorModel,
        session: &mut SchedulingSession,
    ) -> Option<Arc<Schedule>> {
        if !self.config.reuse_cached_schedule || !self.valid {
            return None;
        }
        let cached = self.cached.as_ref()?;
        if cached.revision != model.revision() {
            log::debug!(
                "Model revision changed from {} to {}, rebuilding schedule",
                cached.revision,
                model.revision()
            );
            self.valid = false;
            return None;
        }

        log::debug!("[{}] Reusing cached schedule", session.id());
        for actor in &cached.reportable {
            session.register(actor.clone());
        }
        for &id in &cached.covered {
            session.mark_visited(id);
        }
        Some(Arc::clone(&cached.schedule))
    }

    fn emit_built(&self, session: &SchedulingSession, schedule: &Schedule) {
        self.emit(built_event(session.id(), schedule));
    }

    fn emit_failed(&self, session: &SchedulingSession, error: &SchedulingError) {
        log::warn!("[{}] Schedule construction failed: {}", session.id(), error);
        self.emit(failed_event(session.id(), None, error));
    }

    fn emit(&self, event: ScheduleEvent) {
        if let Err(e) = self.event_sink.send(event) {
            log::warn!("Failed to send schedule event: {}", e);
        }
    }
}

fn built_event(session_id: &str, schedule: &Schedule) -> ScheduleEvent {
    ScheduleEvent::ScheduleBuilt {
        session_id: session_id.to_string(),
        process: schedule.process().map(str::to_string),
        independent: schedule.independent().len(),
        dependents: schedule.dependents().len(),
        subgraphs: schedule.subgraphs().count(),
    }
}

fn failed_event(session_id: &str, process: Option<String>, error: &SchedulingError) -> ScheduleEvent {
    ScheduleEvent::ScheduleFailed {
        session_id: session_id.to_string(),
        process,
        error: error.to_string(),
    }
}

impl Default for SequenceScheduler {
    fn default() -> Self {
        Self::new()
    }
}
