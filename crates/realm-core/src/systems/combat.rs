//! Combat system: engagement, attack resolution, kills and PvP rating.
//!
//! # Attack resolution
//!
//! An attacking entity whose target is alive and within range swings once its
//! cooldown (`max(min_cooldown, base_cooldown - attack_speed)` ticks) has
//! elapsed:
//!
//! 1. The target evades with probability `evasion`%; the swing misses.
//! 2. Otherwise it crits with probability `crit_chance`%, multiplying damage
//!    (floored).
//! 3. Armor is subtracted, with a floor of `min_damage`.
//!
//! Damage to non-players is tallied per attacker for reward splitting. A kill
//! schedules the victim's respawn, logs `Kill` and `Death`, drops the
//! attacker out of combat and raises a [`Notice`].
//!
//! # Engagement rule
//!
//! [`CombatSystem::may_engage`] is the single predicate deciding whether one
//! entity may keep or start a fight with another. Only player-versus-player
//! fights are restricted: a player may not pick on someone rated more than
//! `rating_protection_gap` below them, unless that player is already
//! attacking them.

use rand::Rng;

use crate::combat_log::{CombatEvent, CombatEventKind, CombatLog};
use crate::config::CombatConfig;
use crate::entity::{Entity, EntityId, LifeState, Stats};
use crate::systems::{Notice, Outbox};
use crate::world::World;

/// Result of one swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    /// The target evaded.
    pub evaded: bool,
    /// The swing was a critical hit.
    pub critical: bool,
    /// Damage dealt after armor; zero on a miss.
    pub damage: u32,
}

impl AttackRoll {
    /// Roll a swing of `attacker` against `target`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn roll<R: Rng + ?Sized>(
        attacker: &Stats,
        target: &Stats,
        config: &CombatConfig,
        rng: &mut R,
    ) -> Self {
        if rng.gen_range(0..100) < target.evasion {
            return Self {
                evaded: true,
                critical: false,
                damage: 0,
            };
        }
        let critical = rng.gen_range(0..100) < attacker.crit_chance;
        let raw = if critical {
            (attacker.damage as f32 * config.crit_multiplier).floor() as u32
        } else {
            attacker.damage
        };
        Self {
            evaded: false,
            critical,
            damage: raw.saturating_sub(target.armor).max(config.min_damage),
        }
    }
}

/// Rating gained by `winner_rating` for killing `victim_rating`.
///
/// Upsets pay a bonus of one point per `divisor` rating difference, capped.
#[must_use]
pub fn rating_gain(winner_rating: i32, victim_rating: i32, config: &CombatConfig) -> i32 {
    let divisor = config.pvp_rating_divisor.max(1);
    let bonus = ((victim_rating - winner_rating) / divisor).clamp(0, config.pvp_max_bonus);
    config.pvp_base_gain + bonus
}

/// Resolves attacks between entities.
#[derive(Debug, Clone)]
pub struct CombatSystem {
    config: CombatConfig,
    respawn_delay: u64,
}

impl CombatSystem {
    /// Creates the system.
    #[must_use]
    pub fn new(config: CombatConfig, respawn_delay: u64) -> Self {
        Self {
            config,
            respawn_delay,
        }
    }

    /// Combat configuration.
    #[must_use]
    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Ticks between swings for a given attack speed.
    #[must_use]
    pub fn cooldown_ticks(&self, attack_speed: u32) -> u64 {
        self.config
            .base_cooldown
            .saturating_sub(u64::from(attack_speed))
            .max(self.config.min_cooldown)
    }

    /// Returns true if `a` can hit `b` from where it stands.
    #[must_use]
    pub fn in_range(&self, a: &Entity, b: &Entity) -> bool {
        a.distance_to(b) <= self.config.attack_range
    }

    /// Whether `attacker` may fight `target`.
    #[must_use]
    pub fn may_engage(&self, attacker: &Entity, target: &Entity) -> bool {
        if attacker.id() == target.id() {
            return false;
        }
        if !(attacker.is_player() && target.is_player()) {
            return true;
        }
        if target.combat.is_attacking(attacker.id()) {
            return true;
        }
        target.ranking.rating >= attacker.ranking.rating - self.config.rating_protection_gap
    }

    /// Put `attacker` into combat with `target`, walking towards it if out
    /// of range. Fails (returning false) if either is missing or dead, or if
    /// they are the same entity.
    pub fn try_start_combat(&self, world: &mut World, attacker: EntityId, target: EntityId) -> bool {
        if attacker == target {
            return false;
        }
        let (Some(a), Some(t)) = (world.get(attacker), world.get(target)) else {
            return false;
        };
        if !a.is_alive() || !t.is_alive() {
            return false;
        }
        let in_range = self.in_range(a, t);
        let goal = t.position();
        let Some(a) = world.get_mut(attacker) else {
            return false;
        };
        a.combat.engage(target);
        if in_range {
            a.transform.stop();
        } else {
            a.transform.move_to(goal);
        }
        tracing::trace!(%attacker, %target, in_range, "combat started");
        true
    }

    /// Take `id` out of combat.
    pub fn clear_combat(world: &mut World, id: EntityId) {
        if let Some(entity) = world.get_mut(id) {
            entity.clear_combat();
        }
    }

    /// Re-check a player's current fight: drop it if the target vanished,
    /// died, or may no longer be engaged.
    pub fn process_player_auto_combat(&self, world: &mut World, id: EntityId) {
        let Some(me) = world.get(id) else { return };
        if !me.is_player() || me.combat.state() != LifeState::Attacking {
            return;
        }
        let keep = me
            .combat
            .target()
            .and_then(|t| world.get(t))
            .is_some_and(|t| t.is_alive() && self.may_engage(me, t));
        if !keep {
            Self::clear_combat(world, id);
        }
    }

    /// Run one combat step for entity `id`.
    pub fn update<R: Rng + ?Sized>(
        &self,
        world: &mut World,
        id: EntityId,
        tick: u64,
        rng: &mut R,
        log: &mut CombatLog,
        outbox: &mut Outbox,
    ) {
        let Some(attacker) = world.get(id) else { return };
        if attacker.combat.state() != LifeState::Attacking {
            return;
        }
        let Some(target_id) = attacker.combat.target() else {
            Self::clear_combat(world, id);
            return;
        };
        let Some(target) = world.get(target_id).filter(|t| t.is_alive()) else {
            Self::clear_combat(world, id);
            return;
        };

        if !self.in_range(attacker, target) {
            let goal = target.position();
            if let Some(a) = world.get_mut(id) {
                a.transform.move_to(goal);
            }
            return;
        }

        let cooldown = self.cooldown_ticks(attacker.stats.attack_speed);
        if attacker
            .combat
            .last_attack_tick()
            .is_some_and(|last| tick.saturating_sub(last) < cooldown)
        {
            return;
        }

        let roll = AttackRoll::roll(&attacker.stats, &target.stats, &self.config, rng);
        let attacker_name = attacker.name().to_string();
        let attacker_is_player = attacker.is_player();
        let target_name = target.name().to_string();
        let target_is_player = target.is_player();
        let target_is_monster = target.is_monster();

        if let Some(a) = world.get_mut(id) {
            a.combat.record_attack(tick);
            a.transform.stop();
        }

        if roll.damage == 0 {
            log.push(
                CombatEvent::about(tick, CombatEventKind::Miss, target_id, &target_name)
                    .by(id, &attacker_name),
            );
            return;
        }

        let killed = match world.get_mut(target_id) {
            Some(t) => {
                if !target_is_player {
                    t.contributions.record(id, roll.damage);
                }
                let killed = t.combat.apply_damage(roll.damage);
                if killed {
                    t.combat.schedule_respawn(tick + self.respawn_delay);
                    t.transform.stop();
                }
                killed
            }
            None => return,
        };

        let kind = if roll.critical {
            CombatEventKind::Critical
        } else {
            CombatEventKind::Damage
        };
        log.push(
            CombatEvent::about(tick, kind, target_id, &target_name)
                .by(id, &attacker_name)
                .with_damage(roll.damage),
        );
        outbox.push(Notice::Damaged {
            attacker: id,
            target: target_id,
            amount: roll.damage,
        });

        if !killed {
            return;
        }

        log.push(CombatEvent::about(tick, CombatEventKind::Kill, target_id, &target_name).by(id, &attacker_name));
        log.push(CombatEvent::about(tick, CombatEventKind::Death, target_id, &target_name));
        Self::clear_combat(world, id);
        tracing::debug!(killer = %attacker_name, victim = %target_name, tick, "entity killed");

        if attacker_is_player && target_is_player {
            self.settle_pvp(world, id, target_id);
            outbox.push(Notice::PlayerKilled {
                killer: id,
                victim: target_id,
            });
        } else if target_is_monster {
            outbox.push(Notice::MonsterKilled {
                monster: target_id,
                last_hitter: id,
            });
        }
    }

    /// Apply the rating exchange of a PvP kill. The loser's rating is left
    /// untouched.
    fn settle_pvp(&self, world: &mut World, winner: EntityId, loser: EntityId) {
        let (Some(w), Some(l)) = (world.get(winner), world.get(loser)) else {
            return;
        };
        let gain = rating_gain(w.ranking.rating, l.ranking.rating, &self.config);
        if let Some(w) = world.get_mut(winner) {
            w.ranking.rating += gain;
            w.ranking.wins += 1;
        }
        if let Some(l) = world.get_mut(loser) {
            l.ranking.losses += 1;
        }
    }
}
