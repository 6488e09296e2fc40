/// Symbolic input events and the commands they map to
use std::collections::{BTreeSet, HashMap};

use nalgebra::Vector3;

use crate::joint::JointId;

/// What an input event does to the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// While held, move a joint at `rate` units per second.
    Jog { joint: JointId, rate: f32 },
    /// On press, move a joint by a fixed step.
    Nudge { joint: JointId, delta: f32 },
    /// On press, start a transition to a named pose.
    Transform { pose: String },
    /// While held, move the free body along `direction` at the body speed.
    MoveBody { direction: Vector3<f32> },
}

impl Command {
    /// Held commands act every tick; the rest act once per press.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Command::Jog { .. } | Command::MoveBody { .. })
    }
}

/// Table from event ids (e.g. `rotate-head-cw`) to commands.
#[derive(Debug, Clone, Default)]
pub struct InputMap {
    bindings: HashMap<String, Command>,
}

impl InputMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, event: impl Into<String>, command: Command) -> &mut Self {
        self.bindings.insert(event.into(), command);
        self
    }

    pub fn command(&self, event: &str) -> Option<&Command> {
        self.bindings.get(event)
    }

    /// Bound event ids, sorted.
    pub fn events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        events.sort_unstable();
        events
    }
}

/// Set of event ids currently held down.
#[derive(Debug, Clone, Default)]
pub struct HeldInputs {
    held: BTreeSet<String>,
}

impl HeldInputs {
    /// Returns `true` if the event was not already held.
    pub fn press(&mut self, event: &str) -> bool {
        self.held.insert(event.to_string())
    }

    pub fn release(&mut self, event: &str) -> bool {
        self.held.remove(event)
    }

    pub fn is_held(&self, event: &str) -> bool {
        self.held.contains(event)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.held.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}
