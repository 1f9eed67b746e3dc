//! Script-driven behavior.
//!
//! The core does not interpret scripts. An embedder installs a [`ScriptHost`]
//! that runs a player's script against a snapshot of that player and the
//! world, and returns at most one [`Action`].

use crate::entity::{Entity, ScriptBinding};
use crate::snapshot::EntitySnapshot;
use crate::systems::EventContext;
use crate::world_view::WorldView;

use super::{Action, Controller};

/// Runs player scripts.
pub trait ScriptHost: Send {
    /// Run `script` for `me`. `None` hands the player back to the default
    /// behavior for this tick.
    fn run(
        &mut self,
        script: &ScriptBinding,
        me: &EntitySnapshot,
        view: &WorldView<'_>,
        event: &EventContext,
    ) -> Option<Action>;
}

/// Controller for players with an enabled script.
pub struct ScriptController {
    host: Box<dyn ScriptHost>,
}

impl std::fmt::Debug for ScriptController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptController").finish_non_exhaustive()
    }
}

impl ScriptController {
    /// Wraps a script host.
    #[must_use]
    pub fn new(host: Box<dyn ScriptHost>) -> Self {
        Self { host }
    }
}

impl Controller for ScriptController {
    fn decide(&mut self, me: &Entity, view: &WorldView<'_>, event: &EventContext) -> Option<Action> {
        let script = me.script.as_ref().filter(|s| s.enabled)?;
        let snapshot = EntitySnapshot::from(me);
        self.host.run(script, &snapshot, view, event)
    }
}
