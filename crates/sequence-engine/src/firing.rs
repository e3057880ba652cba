//! Firing plans
//!
//! A director fires a schedule one iteration at a time. Which branch a
//! control actor takes is only known once it has fired, so the director
//! supplies a `BranchSelector` that reads that runtime signal; the plan
//! itself never picks a branch.

use crate::error::{Result, SchedulingError};
use crate::schedule::{Anchor, Schedule};
use crate::types::{ActorId, ActorRef};

/// Chooses the branch a control actor took
pub trait BranchSelector {
    /// Return the taken output port, or `None` to fire no branch
    fn select(&mut self, control: ActorId, ports: &[&str]) -> Option<String>;
}

impl<F> BranchSelector for F
where
    F: FnMut(ActorId, &[&str]) -> Option<String>,
{
    fn select(&mut self, control: ActorId, ports: &[&str]) -> Option<String> {
        self(control, ports)
    }
}

impl Schedule {
    /// Linearise one iteration of this schedule
    ///
    /// Each independent anchor is preceded by its subgraph in topological
    /// order. After a control anchor the selected branch follows, each of
    /// its actors again preceded by its own subgraph. Subgraph members
    /// shared by several anchors fire once per anchor.
    pub fn firing_plan(&self, selector: &mut dyn BranchSelector) -> Result<Vec<ActorId>> {
        let mut plan = Vec::new();
        let mut active: Vec<ActorRef> = Vec::new();
        for anchor in self.independent() {
            self.fire_anchor(anchor, selector, &mut plan, &mut active)?;
        }
        Ok(plan)
    }

    fn fire_anchor(
        &self,
        anchor: &Anchor,
        selector: &mut dyn BranchSelector,
        plan: &mut Vec<ActorId>,
        active: &mut Vec<ActorRef>,
    ) -> Result<()> {
        // A control actor that re-enters itself through its branches
        // would never finish the iteration.
        if active.iter().any(|a| a.id == anchor.id()) {
            return Err(SchedulingError::CycleDetected {
                anchor: anchor.actor.clone(),
                members: active.clone(),
            });
        }

        if let Some(subgraph) = self.subgraph(anchor.id()) {
            plan.extend_from_slice(subgraph.firing_order());
        }
        plan.push(anchor.id());

        let Some(entry) = self.control_table().entry(anchor.id()) else {
            return Ok(());
        };
        let Some(port) = selector.select(anchor.id(), &entry.ports()) else {
            log::trace!("Control actor '{}' took no branch", anchor.actor);
            return Ok(());
        };
        let branch = entry.branch(&port).ok_or_else(|| SchedulingError::UnknownBranch {
            control: anchor.actor.clone(),
            port: port.clone(),
        })?;

        active.push(anchor.actor.clone());
        for dependent in branch {
            self.fire_anchor(dependent, selector, plan, active)?;
        }
        active.pop();
        Ok(())
    }
}
