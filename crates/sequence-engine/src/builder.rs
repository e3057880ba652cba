//! Fluent builder for actor models
//!
//! Provides a compact API for constructing models programmatically,
//! mostly for tests and embedders that assemble models in code.

use std::collections::HashMap;

use crate::error::{Result, SchedulingError};
use crate::tag::SequenceTag;
use crate::types::{ActorId, ActorKind, ActorModel, PortDefinition};

/// Fluent builder for constructing actor models
///
/// Actors are referenced by name while building. When two actors share a
/// name, later references resolve to the most recently added one; use
/// [`ModelBuilder::last_id`] to keep hold of earlier ids.
///
/// Ports are declared implicitly the first time a connection uses them.
/// Errors (unknown names, malformed tag expressions) are deferred until
/// [`ModelBuilder::build`].
///
/// # Example
///
/// ```ignore
/// let model = ModelBuilder::new()
///     .add_actor("ramp").with_tag(1)
///     .add_actor("scale")
///     .add_actor("display").with_tag(2)
///     .connect("ramp", "output", "display", "input")
///     .connect("scale", "output", "display", "input")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: ActorModel,
    names: HashMap<String, ActorId>,
    last: Option<ActorId>,
    error: Option<SchedulingError>,
}

impl ModelBuilder {
    /// Create a new model builder
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, kind: ActorKind, outputs: Vec<PortDefinition>) -> Self {
        match self.model.add_actor(name, kind, Vec::new(), outputs) {
            Ok(id) => {
                self.names.insert(name.to_string(), id);
                self.last = Some(id);
            }
            Err(e) => {
                self.last = None;
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Add an ordinary actor
    pub fn add_actor(self, name: &str) -> Self {
        self.push(name, ActorKind::Ordinary, Vec::new())
    }

    /// Add a control actor whose output ports are its branches
    pub fn add_control(self, name: &str, branches: &[&str]) -> Self {
        let outputs = branches.iter().map(|b| PortDefinition::new(*b)).collect();
        self.push(name, ActorKind::Control, outputs)
    }

    /// Add an error-handling sink actor
    pub fn add_error_sink(self, name: &str) -> Self {
        self.push(name, ActorKind::ErrorSink, Vec::new())
    }

    /// Id of the most recently added actor
    pub fn last_id(&self) -> Option<ActorId> {
        self.last
    }

    fn update_last(
        mut self,
        apply: impl FnOnce(&mut ActorModel, ActorId) -> Result<()>,
    ) -> Self {
        if let Some(id) = self.last {
            if let Err(e) = apply(&mut self.model, id) {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Place the most recently added actor in a container
    pub fn in_container(self, container: &str) -> Self {
        self.update_last(|model, id| model.set_container(id, container))
    }

    /// Tag the most recently added actor with a sequence number
    pub fn with_tag(self, sequence_number: u32) -> Self {
        self.update_last(|model, id| model.set_tag(id, Some(SequenceTag::new(sequence_number))))
    }

    /// Tag the most recently added actor with a process and sequence number
    pub fn with_process_tag(self, process: &str, sequence_number: u32) -> Self {
        self.update_last(|model, id| {
            model.set_tag(id, Some(SequenceTag::with_process(process, sequence_number)))
        })
    }

    /// Tag the most recently added actor from a tag expression
    pub fn with_tag_expression(self, expression: &str) -> Self {
        self.update_last(|model, id| {
            let tag = expression.parse::<SequenceTag>()?;
            model.set_tag(id, Some(tag))
        })
    }

    fn resolve(&self, name: &str) -> Result<ActorId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SchedulingError::UnknownActorName(name.to_string()))
    }

    /// Connect an output port of one actor to an input port of another
    pub fn connect(
        mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Self {
        let endpoints = self
            .resolve(source)
            .and_then(|s| Ok((s, self.resolve(target)?)));
        let result = endpoints.and_then(|(s, t)| {
            self.model.declare_output(s, source_port)?;
            self.model.declare_input(t, target_port)?;
            self.model.connect(s, source_port, t, target_port)
        });
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Connect actors in a line through their `output`/`input` ports
    pub fn chain(self, names: &[&str]) -> Self {
        names.windows(2).fold(self, |builder, pair| {
            builder.connect(pair[0], "output", pair[1], "input")
        })
    }

    /// Build the model, reporting the first deferred error
    pub fn build(self) -> Result<ActorModel> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let model = ModelBuilder::new()
            .add_actor("a")
            .with_tag(1)
            .add_actor("b")
            .connect("a", "output", "b", "input")
            .build()
            .unwrap();

        assert_eq!(model.actors().len(), 2);
        assert_eq!(model.connections().len(), 1);
        let a = model.find_by_name("a").unwrap();
        assert_eq!(a.tag, Some(SequenceTag::new(1)));
        assert!(a.has_output("output"));
        assert!(model.find_by_name("b").unwrap().has_input("input"));
    }

    #[test]
    fn test_builder_chain() {
        let model = ModelBuilder::new()
            .add_actor("a")
            .add_actor("b")
            .add_actor("c")
            .chain(&["a", "b", "c"])
            .build()
            .unwrap();
        assert_eq!(model.connections().len(), 2);
    }

    #[test]
    fn test_builder_unknown_name() {
        let err = ModelBuilder::new()
            .add_actor("a")
            .connect("a", "output", "ghost", "input")
            .build()
            .unwrap_err();
        assert_eq!(err, SchedulingError::UnknownActorName("ghost".to_string()));
    }

    #[test]
    fn test_builder_tag_expression() {
        let model = ModelBuilder::new()
            .add_actor("a")
            .with_tag_expression("{'main', 4}")
            .build()
            .unwrap();
        assert_eq!(
            model.find_by_name("a").unwrap().tag,
            Some(SequenceTag::with_process("main", 4))
        );

        let err = ModelBuilder::new()
            .add_actor("a")
            .with_tag_expression("{'main'}")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidSequenceTag { .. }));
    }

    #[test]
    fn test_builder_control_ports() {
        let model = ModelBuilder::new()
            .add_control("if", &["then", "else"])
            .build()
            .unwrap();
        let control = model.find_by_name("if").unwrap();
        assert_eq!(control.kind, ActorKind::Control);
        assert_eq!(control.outputs.len(), 2);
    }
}
