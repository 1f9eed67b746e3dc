//! Append-only record of combat outcomes.
//!
//! The combat system appends an entry for every attack, kill, death and
//! respawn. Readers poll with [`CombatLog::since`] and never consume entries;
//! the scheduler drops old entries periodically with [`CombatLog::prune`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatEventKind {
    /// A regular hit.
    Damage,
    /// A critical hit.
    Critical,
    /// The target evaded.
    Miss,
    /// The attacker finished the target.
    Kill,
    /// The target died.
    Death,
    /// A dead entity came back.
    Respawn,
}

/// One combat log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Tick on which it happened.
    pub tick: u64,
    /// Kind of entry.
    pub kind: CombatEventKind,
    /// Acting entity, if any.
    pub attacker: Option<EntityId>,
    /// Name of the acting entity.
    pub attacker_name: Option<String>,
    /// Entity the entry is about.
    pub target: EntityId,
    /// Name of that entity.
    pub target_name: String,
    /// Damage dealt, for hits.
    pub damage: Option<u32>,
    /// Whether the hit was critical. Set exactly for [`CombatEventKind::Critical`].
    #[serde(default)]
    pub critical: bool,
}

impl CombatEvent {
    /// An entry about `target` with no attacker.
    #[must_use]
    pub fn about(tick: u64, kind: CombatEventKind, target: EntityId, target_name: &str) -> Self {
        Self {
            tick,
            kind,
            attacker: None,
            attacker_name: None,
            target,
            target_name: target_name.to_string(),
            damage: None,
            critical: kind == CombatEventKind::Critical,
        }
    }

    /// Attribute the entry to an attacker.
    #[must_use]
    pub fn by(mut self, attacker: EntityId, attacker_name: &str) -> Self {
        self.attacker = Some(attacker);
        self.attacker_name = Some(attacker_name.to_string());
        self
    }

    /// Attach a damage amount.
    #[must_use]
    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = Some(damage);
        self
    }
}

/// Chronological combat log.
#[derive(Debug, Clone, Default)]
pub struct CombatLog {
    events: VecDeque<CombatEvent>,
}

impl CombatLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Entries arrive in tick order.
    pub fn push(&mut self, event: CombatEvent) {
        self.events.push_back(event);
    }

    /// Entries from `tick` onwards, oldest first. Does not consume them.
    #[must_use]
    pub fn since(&self, tick: u64) -> Vec<CombatEvent> {
        let start = self.events.partition_point(|e| e.tick < tick);
        self.events.range(start..).cloned().collect()
    }

    /// Drop entries more than `max_age` ticks older than `now`. Returns the
    /// number removed.
    pub fn prune(&mut self, now: u64, max_age: u64) -> usize {
        let cutoff = now.saturating_sub(max_age);
        let stale = self.events.partition_point(|e| e.tick < cutoff);
        self.events.drain(..stale);
        stale
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over all entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CombatEvent> + '_ {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with_ticks(ticks: &[u64]) -> CombatLog {
        let mut log = CombatLog::new();
        for (i, t) in ticks.iter().enumerate() {
            log.push(CombatEvent::about(
                *t,
                CombatEventKind::Damage,
                EntityId::new(i as u64),
                "dummy",
            ));
        }
        log
    }

    #[test]
    fn since_is_inclusive_and_non_destructive() {
        let log = log_with_ticks(&[1, 2, 2, 5]);
        assert_eq!(log.since(2).len(), 3);
        assert_eq!(log.since(2).len(), 3);
        assert_eq!(log.since(6).len(), 0);
        assert_eq!(log.since(0).len(), 4);
    }

    #[test]
    fn prune_drops_only_old_entries() {
        let mut log = log_with_ticks(&[10, 400, 700, 900]);
        let removed = log.prune(1_000, 600);
        assert_eq!(removed, 1);
        assert_eq!(log.iter().next().map(|e| e.tick), Some(400));
    }

    #[test]
    fn prune_early_in_the_run_keeps_everything() {
        let mut log = log_with_ticks(&[0, 1, 2]);
        assert_eq!(log.prune(100, 600), 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn builder_attaches_attacker_and_damage() {
        let e = CombatEvent::about(3, CombatEventKind::Critical, EntityId::new(2), "bug")
            .by(EntityId::new(1), "octocat")
            .with_damage(15);
        assert_eq!(e.attacker, Some(EntityId::new(1)));
        assert_eq!(e.attacker_name.as_deref(), Some("octocat"));
        assert_eq!(e.damage, Some(15));
        assert!(e.critical);
    }

    #[test]
    fn only_critical_hits_carry_the_flag() {
        for kind in [
            CombatEventKind::Damage,
            CombatEventKind::Miss,
            CombatEventKind::Kill,
            CombatEventKind::Death,
            CombatEventKind::Respawn,
        ] {
            assert!(!CombatEvent::about(1, kind, EntityId::new(2), "bug").critical, "{kind:?}");
        }
    }
}
