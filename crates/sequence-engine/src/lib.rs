//! Sequence Engine - Sequence-dependency scheduling for actor models
//!
//! This crate computes a deterministic firing order for a graph of actors
//! where only a sparse subset carries explicit sequence numbers. It
//! supports:
//!
//! - Upstream subgraph resolution per tagged actor, bounded by other tagged actors
//! - Cycle detection over every resolved subgraph
//! - Control actors whose output ports are mutually exclusive branches
//! - Process mode, with one schedule per named process
//! - Unreachable-actor diagnostics shared across builds
//!
//! # Architecture
//!
//! - `ActorGraph`: the dependency graph for one containment level
//! - `Subgraph`: untagged actors that must fire before one anchor
//! - `ControlTable`: per-port ordered branch lists of control actors
//! - `Schedule`: the immutable result handed to a director
//! - `SequenceScheduler`: caching front-end with an `EventSink`
//!
//! # Example
//!
//! ```
//! use sequence_engine::{ModelBuilder, SchedulingSession, SequenceScheduler};
//!
//! let model = ModelBuilder::new()
//!     .add_actor("source")
//!     .add_actor("sink")
//!     .with_tag(1)
//!     .connect("source", "output", "sink", "input")
//!     .build()
//!     .unwrap();
//!
//! let mut scheduler = SequenceScheduler::new();
//! let mut session = SchedulingSession::new();
//! let schedule = scheduler.build_schedule(&model, &mut session).unwrap();
//! assert_eq!(schedule.independent().len(), 1);
//! assert!(session.unreachable_actors().is_empty());
//! ```

pub mod builder;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod firing;
pub mod graph;
pub mod process;
pub mod schedule;
pub mod scheduler;
pub mod session;
pub mod subgraph;
pub mod tag;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::ModelBuilder;
pub use config::{SchedulerConfig, UnreachablePolicy};
pub use control::{BranchList, ControlEntry, ControlTable};
pub use error::{Result, SchedulingError};
pub use events::{EventSink, NullEventSink, ScheduleEvent, VecEventSink};
pub use firing::BranchSelector;
pub use graph::ActorGraph;
pub use process::ProcessSchedules;
pub use schedule::{Anchor, Schedule};
pub use scheduler::SequenceScheduler;
pub use session::SchedulingSession;
pub use subgraph::Subgraph;
pub use tag::SequenceTag;
pub use types::{Actor, ActorId, ActorKind, ActorModel, ActorRef, Connection, PortDefinition};
pub use validation::validate_model;
