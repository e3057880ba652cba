//! Core types for actor models
//!
//! These types describe the topology the scheduler consumes: actors with
//! named ports, their optional sequence tags, and the port connections
//! between them. Persistence of models is left to whoever owns them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};
use crate::tag::SequenceTag;

/// Unique identifier for an actor
///
/// Identity is the id alone. Two actors may share a name (for example
/// when they live in different containers) and still be distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier for a port on an actor
pub type PortId = String;

/// An actor id paired with its display name, used in diagnostics
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: ActorId,
    pub name: String,
}

impl ActorRef {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Structural kind of an actor, resolved once when the graph is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Plain computation unit
    #[default]
    Ordinary,
    /// Each output port is a mutually exclusive branch
    Control,
    /// No-op or error-handling sink, never reported as unreachable
    ErrorSink,
}

impl ActorKind {
    pub fn is_control(&self) -> bool {
        matches!(self, ActorKind::Control)
    }
}

/// Definition of a port (input or output)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDefinition {
    /// Port name, unique per direction on one actor
    pub id: PortId,
    /// Whether this port accepts multiple connections
    #[serde(default)]
    pub multiple: bool,
}

impl PortDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            multiple: false,
        }
    }

    /// Set this port to accept multiple connections
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }
}

/// An actor instance in a model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub kind: ActorKind,
    /// Path of the containing composite; actors only depend on
    /// producers at the same level
    #[serde(default)]
    pub container: String,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
    /// At most one sequence tag per actor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<SequenceTag>,
}

impl Actor {
    pub fn actor_ref(&self) -> ActorRef {
        ActorRef::new(self.id, self.name.clone())
    }

    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.iter().any(|p| p.id == port)
    }

    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.iter().any(|p| p.id == port)
    }
}

/// A connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: ActorId,
    pub source_port: PortId,
    pub target: ActorId,
    pub target_port: PortId,
}

/// A complete actor model
///
/// Every mutation bumps `revision`, which schedulers use to notice that
/// a cached schedule no longer matches the topology.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorModel {
    actors: Vec<Actor>,
    connections: Vec<Connection>,
    #[serde(default)]
    revision: u64,
}

impl ActorModel {
    /// Create a new empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an actor and return its freshly allocated id
    ///
    /// Fails once every `u32` id has been handed out.
    pub fn add_actor(
        &mut self,
        name: impl Into<String>,
        kind: ActorKind,
        inputs: Vec<PortDefinition>,
        outputs: Vec<PortDefinition>,
    ) -> Result<ActorId> {
        let id = next_actor_id(self.actors.len())?;
        self.actors.push(Actor {
            id,
            name: name.into(),
            kind,
            container: String::new(),
            inputs,
            outputs,
            tag: None,
        });
        self.revision += 1;
        Ok(id)
    }

    /// Connect an output port to an input port
    pub fn connect(
        &mut self,
        source: ActorId,
        source_port: impl Into<String>,
        target: ActorId,
        target_port: impl Into<String>,
    ) -> Result<()> {
        self.actor(source)?;
        self.actor(target)?;
        self.connections.push(Connection {
            source,
            source_port: source_port.into(),
            target,
            target_port: target_port.into(),
        });
        self.revision += 1;
        Ok(())
    }

    /// Remove every connection between two actors
    pub fn disconnect(&mut self, source: ActorId, target: ActorId) -> usize {
        let before = self.connections.len();
        self.connections
            .retain(|c| !(c.source == source && c.target == target));
        let removed = before - self.connections.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// Attach, replace, or clear the sequence tag of an actor
    pub fn set_tag(&mut self, id: ActorId, tag: Option<SequenceTag>) -> Result<()> {
        self.actor_mut(id)?.tag = tag;
        self.revision += 1;
        Ok(())
    }

    /// Move an actor into a container
    pub fn set_container(&mut self, id: ActorId, container: impl Into<String>) -> Result<()> {
        self.actor_mut(id)?.container = container.into();
        self.revision += 1;
        Ok(())
    }

    /// Declare an input port on an actor if it does not exist yet
    pub fn declare_input(&mut self, id: ActorId, port: &str) -> Result<()> {
        let actor = self.actor_mut(id)?;
        if !actor.has_input(port) {
            actor.inputs.push(PortDefinition::new(port));
            self.revision += 1;
        }
        Ok(())
    }

    /// Declare an output port on an actor if it does not exist yet
    pub fn declare_output(&mut self, id: ActorId, port: &str) -> Result<()> {
        let actor = self.actor_mut(id)?;
        if !actor.has_output(port) {
            actor.outputs.push(PortDefinition::new(port));
            self.revision += 1;
        }
        Ok(())
    }

    /// Find an actor by id
    pub fn actor(&self, id: ActorId) -> Result<&Actor> {
        self.actors
            .get(id.0 as usize)
            .ok_or(SchedulingError::UnknownActor(id))
    }

    fn actor_mut(&mut self, id: ActorId) -> Result<&mut Actor> {
        self.actors
            .get_mut(id.0 as usize)
            .ok_or(SchedulingError::UnknownActor(id))
    }

    /// Find the first actor with a given name
    pub fn find_by_name(&self, name: &str) -> Option<&Actor> {
        self.actors.iter().find(|a| a.name == name)
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Get connections coming into an actor
    pub fn incoming(&self, id: ActorId) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.iter().filter(move |c| c.target == id)
    }

    /// Get connections leaving one output port of an actor
    pub fn outgoing_from_port<'a>(
        &'a self,
        id: ActorId,
        port: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.source == id && c.source_port == port)
    }

    /// Actors carrying a sequence tag, in id order
    pub fn tagged_actors(&self) -> impl Iterator<Item = (&Actor, &SequenceTag)> + '_ {
        self.actors
            .iter()
            .filter_map(|a| a.tag.as_ref().map(|t| (a, t)))
    }
}

/// Id for the actor stored at position `index`
fn next_actor_id(index: usize) -> Result<ActorId> {
    u32::try_from(index)
        .map(ActorId)
        .map_err(|_| SchedulingError::ActorLimitExceeded { limit: u32::MAX })
}
