//! Entity classification: players, NPCs and the monster roster.
//!
//! Every monster kind maps to a [`Tier`] (which selects its stat profile,
//! reward pool and rating bounty) and a set of [`KindTraits`] describing how
//! the AI drives it and whether world events own it.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Behavioral traits of an entity kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KindTraits: u8 {
        /// Driven by the AI system at all.
        const AI_DRIVEN = 0b0000_0001;
        /// Hunts the nearest player without provocation.
        const AGGRESSIVE = 0b0000_0010;
        /// Spawned and owned by world events; never respawns.
        const EVENT = 0b0000_0100;
        /// Comes back after death.
        const RESPAWNS = 0b0000_1000;
        /// Member of the error family used for bug-swarm waves.
        const ERROR_FAMILY = 0b0001_0000;
    }
}

/// Strength class of a monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Ambient bugs and swarm fodder.
    Swarm,
    /// Intermediate event monsters.
    Elite,
    /// The rare unexplained-bug event.
    Special,
    /// Daily boss.
    Boss,
}

/// Every monster in the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonsterKind {
    /// Ambient, passive wildlife.
    Bug,
    /// Dereferences nothing, hits hard.
    NullPointer,
    /// Recursion gone wrong.
    StackOverflow,
    /// Slowly grows.
    MemoryLeak,
    /// Fast and erratic.
    RaceCondition,
    /// Slow and sturdy.
    Deadlock,
    /// Glass cannon.
    SegFault,
    /// Always one step away.
    OffByOne,
    /// Never stops chasing.
    InfiniteLoop,
    /// Comes in pairs.
    MergeConflict,
    /// Weak but common.
    SyntaxError,
    /// Tangled and tough.
    DependencyHell,
    /// Intermediate wave monster.
    Regression,
    /// Hourly special.
    Heisenbug,
    /// Daily boss.
    TechDebt,
}

impl MonsterKind {
    /// Monsters drawn for bug-swarm waves.
    pub const ERROR_FAMILY: [MonsterKind; 11] = [
        MonsterKind::NullPointer,
        MonsterKind::StackOverflow,
        MonsterKind::MemoryLeak,
        MonsterKind::RaceCondition,
        MonsterKind::Deadlock,
        MonsterKind::SegFault,
        MonsterKind::OffByOne,
        MonsterKind::InfiniteLoop,
        MonsterKind::MergeConflict,
        MonsterKind::SyntaxError,
        MonsterKind::DependencyHell,
    ];

    /// Strength class.
    #[must_use]
    pub const fn tier(self) -> Tier {
        match self {
            Self::Regression => Tier::Elite,
            Self::Heisenbug => Tier::Special,
            Self::TechDebt => Tier::Boss,
            _ => Tier::Swarm,
        }
    }

    /// Behavioral traits.
    #[must_use]
    pub const fn traits(self) -> KindTraits {
        match self {
            Self::Bug => KindTraits::AI_DRIVEN.union(KindTraits::RESPAWNS),
            Self::Regression | Self::Heisenbug | Self::TechDebt => KindTraits::AI_DRIVEN
                .union(KindTraits::AGGRESSIVE)
                .union(KindTraits::EVENT),
            _ => KindTraits::AI_DRIVEN
                .union(KindTraits::AGGRESSIVE)
                .union(KindTraits::EVENT)
                .union(KindTraits::ERROR_FAMILY),
        }
    }

    /// Display name used for spawned monsters.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bug => "Bug",
            Self::NullPointer => "NullPointer",
            Self::StackOverflow => "StackOverflow",
            Self::MemoryLeak => "MemoryLeak",
            Self::RaceCondition => "RaceCondition",
            Self::Deadlock => "Deadlock",
            Self::SegFault => "SegFault",
            Self::OffByOne => "OffByOne",
            Self::InfiniteLoop => "InfiniteLoop",
            Self::MergeConflict => "MergeConflict",
            Self::SyntaxError => "SyntaxError",
            Self::DependencyHell => "DependencyHell",
            Self::Regression => "Regression",
            Self::Heisenbug => "Heisenbug",
            Self::TechDebt => "TechDebt",
        }
    }
}

impl fmt::Display for MonsterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "monster", rename_all = "snake_case")]
pub enum EntityKind {
    /// A connected user.
    Player,
    /// Passive townsfolk; fights back when hit.
    Npc,
    /// A monster of the given kind.
    Monster(MonsterKind),
}

impl EntityKind {
    /// Behavioral traits. Players carry none.
    #[must_use]
    pub const fn traits(self) -> KindTraits {
        match self {
            Self::Player => KindTraits::empty(),
            Self::Npc => KindTraits::AI_DRIVEN.union(KindTraits::RESPAWNS),
            Self::Monster(kind) => kind.traits(),
        }
    }

    /// The monster kind, if this is a monster.
    #[must_use]
    pub const fn monster(self) -> Option<MonsterKind> {
        match self {
            Self::Monster(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Npc => f.write_str("npc"),
            Self::Monster(kind) => write!(f, "monster:{kind}"),
        }
    }
}
