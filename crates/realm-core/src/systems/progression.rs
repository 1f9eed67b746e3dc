//! Experience, gold and levels.
//!
//! Experience is stored as a running total. Reaching level `L` requires
//! [`ProgressionSystem::exp_for_level`]`(L)`, the sum of the per-level
//! requirements `base_exp * scaling^(l-1)` for `l` in `1..L`.
//!
//! Monster kills split the tier's reward pool among the players who damaged
//! the monster, in proportion to the damage they dealt; every contributor
//! gets at least one unit. PvP kills pay the killer a flat pool scaled by the
//! victim's level.
//!
//! Rewards and level-ups queue up until drained, once per tick, by whoever
//! publishes them.

use serde::{Deserialize, Serialize};

use crate::config::{MonsterConfig, ProgressionConfig, RewardPool};
use crate::entity::{EntityId, MonsterKind};
use crate::world::World;

/// Why a reward was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RewardReason {
    /// Share of a monster kill.
    MonsterKill {
        /// The monster killed.
        kind: MonsterKind,
    },
    /// Killing another player.
    PlayerKill {
        /// The player killed.
        victim: EntityId,
    },
}

/// Experience and gold paid to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Recipient.
    pub entity: EntityId,
    /// Recipient's name.
    pub name: String,
    /// Experience paid.
    pub exp: u64,
    /// Gold paid.
    pub gold: u64,
    /// What it was for.
    pub reason: RewardReason,
}

/// One level gained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    /// Who levelled.
    pub entity: EntityId,
    /// Their name.
    pub name: String,
    /// New level.
    pub level: u32,
    /// Max HP after the level-up.
    pub max_hp: u32,
    /// Damage after the level-up.
    pub damage: u32,
    /// Armor after the level-up.
    pub armor: u32,
}

/// Pays rewards and applies level-ups.
#[derive(Debug, Clone)]
pub struct ProgressionSystem {
    config: ProgressionConfig,
    monsters: MonsterConfig,
    rewards: Vec<Reward>,
    level_ups: Vec<LevelUp>,
}

impl ProgressionSystem {
    /// Creates the system with empty queues.
    #[must_use]
    pub fn new(config: ProgressionConfig, monsters: MonsterConfig) -> Self {
        Self {
            config,
            monsters,
            rewards: Vec::new(),
            level_ups: Vec::new(),
        }
    }

    /// Experience needed to go from `level` to `level + 1`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn exp_to_next(&self, level: u32) -> u64 {
        let exponent = level.saturating_sub(1) as i32;
        (self.config.base_exp as f64 * self.config.scaling.powi(exponent)).round() as u64
    }

    /// Total experience at which `level` is reached. Level 1 needs none.
    #[must_use]
    pub fn exp_for_level(&self, level: u32) -> u64 {
        (1..level).map(|l| self.exp_to_next(l)).sum()
    }

    /// Pay `exp` and `gold` to `id` and apply any level-ups it earns.
    /// Missing entities are ignored.
    pub fn award(&mut self, world: &mut World, id: EntityId, exp: u64, gold: u64, reason: RewardReason) {
        let Some(e) = world.get_mut(id) else { return };
        e.progress.exp += exp;
        e.progress.gold += gold;
        self.rewards.push(Reward {
            entity: id,
            name: e.name().to_string(),
            exp,
            gold,
            reason,
        });
        self.apply_level_ups(world, id);
    }

    fn apply_level_ups(&mut self, world: &mut World, id: EntityId) {
        let Some(e) = world.get(id) else { return };
        let mut level = e.progress.level;
        let exp = e.progress.exp;
        let mut gained = Vec::new();
        while level < self.config.max_level && exp >= self.exp_for_level(level + 1) {
            level += 1;
            gained.push(level);
        }
        let Some(e) = world.get_mut(id) else { return };
        for level in gained {
            e.progress.level = level;
            e.stats.max_hp += self.config.hp_per_level;
            e.stats.damage += self.config.damage_per_level;
            if level % 2 == 0 {
                e.stats.armor += self.config.armor_per_two_levels;
            }
            e.combat.raise_max_hp(e.stats.max_hp);
            tracing::info!(%id, name = e.name(), level, "level up");
            self.level_ups.push(LevelUp {
                entity: id,
                name: e.name().to_string(),
                level,
                max_hp: e.stats.max_hp,
                damage: e.stats.damage,
                armor: e.stats.armor,
            });
        }
    }

    /// Split the reward for a dead monster among the players who hurt it.
    pub fn distribute_monster_kill(&mut self, world: &mut World, monster: EntityId) {
        let Some(m) = world.get(monster) else { return };
        let Some(kind) = m.kind().monster() else { return };
        let pool = self.monsters.profile(kind.tier()).pool;
        let total = m.contributions.total();
        if total == 0 {
            return;
        }
        let shares: Vec<(EntityId, RewardPool)> = m
            .contributions
            .sorted()
            .into_iter()
            .filter(|(id, dmg)| *dmg > 0 && world.get(*id).is_some_and(|e| e.is_player()))
            .map(|(id, dmg)| (id, split(pool, dmg, total)))
            .collect();
        for (id, share) in shares {
            self.award(world, id, share.exp, share.gold, RewardReason::MonsterKill { kind });
        }
    }

    /// Pay the killer of a player. The pool grows with the victim's level.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn award_player_kill(&mut self, world: &mut World, killer: EntityId, victim: EntityId) {
        let Some(v) = world.get(victim) else { return };
        let scale = 1.0 + self.config.pvp_level_bonus * f64::from(v.progress.level.saturating_sub(1));
        let pool = self.config.pvp_pool;
        let exp = (pool.exp as f64 * scale).floor() as u64;
        let gold = (pool.gold as f64 * scale).floor() as u64;
        self.award(world, killer, exp, gold, RewardReason::PlayerKill { victim });
    }

    /// Take every pending reward.
    pub fn drain_rewards(&mut self) -> Vec<Reward> {
        std::mem::take(&mut self.rewards)
    }

    /// Take every pending level-up.
    pub fn drain_level_ups(&mut self) -> Vec<LevelUp> {
        std::mem::take(&mut self.level_ups)
    }
}

/// A contributor's share of `pool`, at least one unit of each.
fn split(pool: RewardPool, damage: u64, total: u64) -> RewardPool {
    let share = |amount: u64| {
        let part = u128::from(amount) * u128::from(damage) / u128::from(total);
        u64::try_from(part).unwrap_or(u64::MAX).max(1)
    };
    RewardPool::new(share(pool.exp), share(pool.gold))
}
