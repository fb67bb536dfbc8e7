//! Upgrade registry
//!
//! Levels are the only mutable state. Every derived tunable is recomputed
//! from the base values captured at session start, so recalculation can
//! run any number of times without drift.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};

use crate::config::{BURST_INTERVAL_FLOOR_MS, DASH_COOLDOWN_FLOOR_MS, GameConfig, PULSE_INTERVAL_FLOOR_MS};

/// Upgrade identifiers, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeId {
    BulletCount,
    FireRate,
    PlayerSpeed,
    BulletSize,
    DirectionalPulse,
    Piercing,
    XpPickupRadius,
    ExplosiveBullets,
    DashDuration,
    DashCooldown,
    DashSpeed,
    HomingBurst,
}

/// How an upgrade level changes its stat
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// `base * (1 + rate)^level`
    Grow(f64),
    /// `base * (1 - rate)^level`
    Shrink(f64),
    /// Unlocks or deepens a capability, no compounding stat
    Unlock,
}

impl Effect {
    /// Compound factor after `level` levels
    pub fn factor(self, level: u32) -> f64 {
        match self {
            Effect::Grow(rate) => (1.0 + rate).powi(level as i32),
            Effect::Shrink(rate) => (1.0 - rate).powi(level as i32),
            Effect::Unlock => 1.0,
        }
    }
}

/// One row of the registry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeOption {
    pub id: UpgradeId,
    pub name: &'static str,
    pub rare: bool,
    pub effect: Effect,
    /// Highest level this option can reach; `None` is unbounded
    pub max_level: Option<u32>,
}

/// Highest piercing level
pub const MAX_PIERCING_LEVEL: u32 = 5;

pub const OPTIONS: [UpgradeOption; 12] = [
    UpgradeOption {
        id: UpgradeId::BulletCount,
        name: "More Bullets",
        rare: false,
        effect: Effect::Grow(0.12),
        max_level: None,
    },
    UpgradeOption {
        id: UpgradeId::FireRate,
        name: "Rapid Fire",
        rare: false,
        effect: Effect::Shrink(0.06),
        max_level: None,
    },
    UpgradeOption {
        id: UpgradeId::PlayerSpeed,
        name: "Move Faster",
        rare: false,
        effect: Effect::Grow(0.025),
        max_level: None,
    },
    UpgradeOption {
        id: UpgradeId::BulletSize,
        name: "Bigger Bullets",
        rare: false,
        effect: Effect::Grow(0.15),
        max_level: None,
    },
    UpgradeOption {
        id: UpgradeId::DirectionalPulse,
        name: "Directional Pulse",
        rare: false,
        effect: Effect::Unlock,
        max_level: None,
    },
    UpgradeOption {
        id: UpgradeId::Piercing,
        name: "Piercing Bullets",
        rare: true,
        effect: Effect::Unlock,
        max_level: Some(MAX_PIERCING_LEVEL),
    },
    UpgradeOption {
        id: UpgradeId::XpPickupRadius,
        name: "XP Magnet",
        rare: false,
        effect: Effect::Grow(0.20),
        max_level: None,
    },
    UpgradeOption {
        id: UpgradeId::ExplosiveBullets,
        name: "Explosive Bullets",
        rare: true,
        effect: Effect::Unlock,
        max_level: Some(1),
    },
    UpgradeOption {
        id: UpgradeId::DashDuration,
        name: "Dash Duration",
        rare: true,
        effect: Effect::Grow(0.15),
        max_level: Some(1),
    },
    UpgradeOption {
        id: UpgradeId::DashCooldown,
        name: "Dash Cooldown",
        rare: false,
        effect: Effect::Shrink(0.10),
        max_level: None,
    },
    UpgradeOption {
        id: UpgradeId::DashSpeed,
        name: "Dash Speed",
        rare: true,
        effect: Effect::Grow(0.10),
        max_level: Some(1),
    },
    UpgradeOption {
        id: UpgradeId::HomingBurst,
        name: "Homing Burst",
        rare: true,
        effect: Effect::Unlock,
        max_level: Some(1),
    },
];

impl UpgradeId {
    pub fn option(self) -> &'static UpgradeOption {
        // OPTIONS is declared in enum order
        &OPTIONS[self as usize]
    }
}

impl UpgradeOption {
    /// Text for taking the next level, given the current one
    pub fn describe(&self, level: u32) -> String {
        let next = level + 1;
        let percent = |digits: usize| {
            let change = (self.effect.factor(next) - 1.0).abs() * 100.0;
            format!("{change:.digits$}")
        };
        match self.id {
            UpgradeId::BulletCount => format!("+{}% bullets (x{next})", percent(1)),
            UpgradeId::FireRate => format!("+{}% fire rate (x{next})", percent(1)),
            UpgradeId::PlayerSpeed => format!("+{}% movement speed (x{next})", percent(1)),
            UpgradeId::BulletSize => format!("+{}% bullet size (x{next})", percent(1)),
            UpgradeId::XpPickupRadius => format!("+{}% XP pickup radius (x{next})", percent(0)),
            UpgradeId::DashDuration => format!("+{}% dash duration (x{next})", percent(1)),
            UpgradeId::DashCooldown => format!("-{}% dash cooldown (x{next})", percent(1)),
            UpgradeId::DashSpeed => format!("+{}% dash speed (x{next})", percent(1)),
            UpgradeId::DirectionalPulse if level == 0 => "Unlock forward-facing pulse attack".into(),
            UpgradeId::DirectionalPulse => {
                format!("{} bullets in forward cone (x{next})", 8 + level * 2)
            }
            UpgradeId::Piercing if level == 0 => "Bullets pierce through 2 enemies".into(),
            UpgradeId::Piercing => format!("Bullets pierce through {} enemies (x{next})", 2 + level),
            UpgradeId::ExplosiveBullets if level == 0 => "Unlock: Bullets split into 2 on hit".into(),
            UpgradeId::ExplosiveBullets => format!("Bullets split into 2 on hit (x{next})"),
            UpgradeId::HomingBurst if level == 0 => "Burst bullets home in on enemies".into(),
            UpgradeId::HomingBurst => format!("Burst bullets home in on enemies (x{next})"),
        }
    }
}

/// Presentation record for an offered upgrade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeOffer {
    pub id: UpgradeId,
    pub name: String,
    pub rare: bool,
    /// Level before taking this offer
    pub level: u32,
    pub description: String,
}

/// One line of the taken-upgrades summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeSummary {
    pub name: String,
    pub level: u32,
    pub rare: bool,
}

/// Config values captured before any upgrade is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBases {
    pub bullet_count: u32,
    pub burst_bullet_count: u32,
    pub pulse_interval_ms: f64,
    pub burst_interval_ms: f64,
    pub player_max_speed: f32,
    pub bullet_size: f32,
    pub xp_pickup_radius: f32,
    pub dash_duration_ms: f64,
    pub dash_cooldown_ms: f64,
    pub dash_speed_multiplier: f32,
}

impl StatBases {
    pub fn capture(config: &GameConfig) -> Self {
        Self {
            bullet_count: config.bullet_count,
            burst_bullet_count: config.burst_bullet_count,
            pulse_interval_ms: config.bullet_pulse_interval_ms,
            burst_interval_ms: config.burst_interval_ms,
            player_max_speed: config.player_max_speed,
            bullet_size: config.bullet_size,
            xp_pickup_radius: config.xp_pickup_radius,
            dash_duration_ms: config.dash_duration_ms,
            dash_cooldown_ms: config.dash_cooldown_ms,
            dash_speed_multiplier: config.dash_speed_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeRegistry {
    levels: BTreeMap<UpgradeId, u32>,
    bases: StatBases,
}

impl UpgradeRegistry {
    /// Fresh registry with every level at zero
    pub fn new(config: &GameConfig) -> Self {
        Self {
            levels: OPTIONS.iter().map(|o| (o.id, 0)).collect(),
            bases: StatBases::capture(config),
        }
    }

    pub fn level(&self, id: UpgradeId) -> u32 {
        self.levels.get(&id).copied().unwrap_or(0)
    }

    pub fn bases(&self) -> &StatBases {
        &self.bases
    }

    /// True once an option has reached its level cap
    pub fn is_capped(&self, id: UpgradeId) -> bool {
        id.option().max_level.is_some_and(|max| self.level(id) >= max)
    }

    /// Take one level of `id` and recompute derived stats.
    /// Returns false when the option is already capped.
    pub fn apply(&mut self, id: UpgradeId, config: &mut GameConfig) -> bool {
        if self.is_capped(id) {
            log::warn!("Upgrade {id:?} already at max level");
            return false;
        }
        let level = self.levels.entry(id).or_insert(0);
        *level += 1;
        log::info!("Upgrade {} -> level {}", id.option().name, *level);
        self.recalculate(config);
        true
    }

    /// Overwrite every upgrade-driven tunable from base values and levels
    pub fn recalculate(&self, config: &mut GameConfig) {
        let b = &self.bases;
        let factor = |id: UpgradeId| id.option().effect.factor(self.level(id));

        let bullets = factor(UpgradeId::BulletCount);
        config.bullet_count = (b.bullet_count as f64 * bullets).floor() as u32;
        config.burst_bullet_count =
            (b.burst_bullet_count as f64 * bullets).floor() as u32 + self.level(UpgradeId::BulletCount);

        let fire_rate = factor(UpgradeId::FireRate);
        config.bullet_pulse_interval_ms = (b.pulse_interval_ms * fire_rate).max(PULSE_INTERVAL_FLOOR_MS);
        config.burst_interval_ms = (b.burst_interval_ms * fire_rate).max(BURST_INTERVAL_FLOOR_MS);

        config.player_max_speed = (b.player_max_speed as f64 * factor(UpgradeId::PlayerSpeed)) as f32;
        config.bullet_size = (b.bullet_size as f64 * factor(UpgradeId::BulletSize)) as f32;
        config.xp_pickup_radius = (b.xp_pickup_radius as f64 * factor(UpgradeId::XpPickupRadius)) as f32;

        config.dash_duration_ms = (b.dash_duration_ms * factor(UpgradeId::DashDuration)).floor();
        config.dash_cooldown_ms =
            (b.dash_cooldown_ms * factor(UpgradeId::DashCooldown)).floor().max(DASH_COOLDOWN_FLOOR_MS);
        config.dash_speed_multiplier =
            (b.dash_speed_multiplier as f64 * factor(UpgradeId::DashSpeed)) as f32;
    }

    fn offer(&self, option: &UpgradeOption) -> UpgradeOffer {
        let level = self.level(option.id);
        UpgradeOffer {
            id: option.id,
            name: option.name.to_string(),
            rare: option.rare,
            level,
            description: option.describe(level),
        }
    }

    /// Draw up to `count` distinct, uncapped offers. With probability
    /// `rare_chance` one eligible rare option takes the first slot before
    /// the rest are filled from the shuffled common pool.
    pub fn random_offers(&self, count: usize, rare_chance: f64, rng: &mut impl Rng) -> Vec<UpgradeOffer> {
        let (rare, common): (Vec<&UpgradeOption>, Vec<&UpgradeOption>) = OPTIONS
            .iter()
            .filter(|o| !self.is_capped(o.id))
            .partition(|o| o.rare);

        let mut selected: Vec<&UpgradeOption> = Vec::with_capacity(count);
        if !rare.is_empty() && rng.random_bool(rare_chance.clamp(0.0, 1.0)) {
            if let Some(pick) = rare.choose(rng) {
                selected.push(*pick);
            }
        }

        let mut pool = common;
        pool.shuffle(rng);
        selected.extend(pool.into_iter().take(count.saturating_sub(selected.len())));
        selected.shuffle(rng);
        selected.truncate(count);

        selected.into_iter().map(|o| self.offer(o)).collect()
    }

    /// Every option in registry order (debug menu)
    pub fn all_offers(&self) -> Vec<UpgradeOffer> {
        OPTIONS.iter().map(|o| self.offer(o)).collect()
    }

    /// Taken upgrades in registry order
    pub fn summary(&self) -> Vec<UpgradeSummary> {
        OPTIONS
            .iter()
            .filter(|o| self.level(o.id) > 0)
            .map(|o| UpgradeSummary {
                name: o.name.to_string(),
                level: self.level(o.id),
                rare: o.rare,
            })
            .collect()
    }

    /// Extra enemies a bullet may pass through; 0 until piercing is taken
    pub fn pierce_count(&self) -> u32 {
        match self.level(UpgradeId::Piercing) {
            0 => 0,
            level => 1 + level,
        }
    }

    pub fn bullets_split(&self) -> bool {
        self.level(UpgradeId::ExplosiveBullets) > 0
    }

    pub fn burst_homing(&self) -> bool {
        self.level(UpgradeId::HomingBurst) > 0
    }

    pub fn directional_pulse_level(&self) -> u32 {
        self.level(UpgradeId::DirectionalPulse)
    }
}
