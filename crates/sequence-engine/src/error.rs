//! Error types for the sequence engine

use thiserror::Error;

use crate::types::{ActorId, ActorRef};

/// Result type alias using SchedulingError
pub type Result<T> = std::result::Result<T, SchedulingError>;

/// Errors that can occur while building or walking a schedule
///
/// Every variant except `UnreachableActors` aborts schedule construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    /// The upstream subgraph of an anchor contains a cycle
    #[error("Cycle detected upstream of '{anchor}': {}", join_refs(.members))]
    CycleDetected {
        anchor: ActorRef,
        members: Vec<ActorRef>,
    },

    /// Two actors in one ordered list share a sequence number
    #[error("Duplicate sequence number {number} on '{first}' and '{second}'")]
    DuplicateSequenceNumber {
        number: u32,
        first: ActorRef,
        second: ActorRef,
    },

    /// A control branch feeds an actor that carries no sequence tag
    #[error("Actor downstream of control actor '{downstream_of}' on port '{port}' has no sequence tag")]
    MissingSequenceTag { downstream_of: ActorRef, port: String },

    /// A schedule was requested but no tagged actors exist
    #[error("No actors with a sequence tag were found")]
    NoAnchorsFound,

    /// Upstream actors that nothing will ever fire
    #[error("Unreachable upstream actors: {}", join_refs(.actors))]
    UnreachableActors { actors: Vec<ActorRef> },

    /// An actor id that the model never allocated
    #[error("Unknown actor: {0}")]
    UnknownActor(ActorId),

    /// The model has no actor ids left to allocate
    #[error("A model cannot hold more than {limit} actors")]
    ActorLimitExceeded { limit: u32 },

    /// A model builder referenced an actor name it never added
    #[error("Unknown actor name: {0}")]
    UnknownActorName(String),

    /// A sequence tag expression could not be parsed
    #[error("Invalid sequence tag '{expression}': {reason}")]
    InvalidSequenceTag { expression: String, reason: String },

    /// A branch selector named a port the control actor does not have
    #[error("Control actor '{control}' has no branch '{port}'")]
    UnknownBranch { control: ActorRef, port: String },

    /// A process name has no schedule
    #[error("No schedule was generated for process '{0}'")]
    MissingSchedule(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SchedulingError {
    /// Create an invalid tag error with a message
    pub fn invalid_tag(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSequenceTag {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error must abort schedule construction
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnreachableActors { .. })
    }
}

fn join_refs(refs: &[ActorRef]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
