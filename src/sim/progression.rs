//! Score, experience and lives
//!
//! Level is never stored independently of XP: it is re-derived from the
//! cumulative schedule on every check, so the check is idempotent.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;

/// XP needed to advance out of `level` (1-based)
pub fn xp_for_level(level: u32, config: &GameConfig) -> u64 {
    let exponent = level.saturating_sub(1) as i32;
    (config.xp_base * config.xp_multiplier.powi(exponent)).floor() as u64
}

/// Total XP needed to reach `level` from zero
pub fn cumulative_xp_for_level(level: u32, config: &GameConfig) -> u64 {
    (1..level).map(|l| xp_for_level(l, config)).sum()
}

/// Largest level whose cumulative requirement is covered by `xp`
pub fn level_from_xp(xp: u64, config: &GameConfig) -> u32 {
    let mut level = 1;
    let mut threshold = 0u64;
    loop {
        let step = xp_for_level(level, config).max(1);
        threshold = threshold.saturating_add(step);
        if threshold > xp {
            return level;
        }
        level += 1;
    }
}

/// Result of folding new XP into the tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelChange {
    pub from: u32,
    pub to: u32,
    /// Lives granted for milestones crossed in this change
    pub lives_gained: u32,
}

impl LevelChange {
    pub fn leveled_up(&self) -> bool {
        self.to > self.from
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub score: u64,
    pub xp: u64,
    pub level: u32,
    pub lives: u32,
}

impl Progression {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            score: 0,
            xp: 0,
            level: 1,
            lives: config.starting_lives,
        }
    }

    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    /// Add XP and recompute the level. Every multiple of `extra_life_every`
    /// crossed on the way up grants one life.
    pub fn add_xp(&mut self, amount: u64, config: &GameConfig) -> LevelChange {
        self.xp = self.xp.saturating_add(amount);
        let from = self.level;
        let to = level_from_xp(self.xp, config);

        let mut change = LevelChange {
            from,
            to: from,
            lives_gained: 0,
        };
        if to > from {
            let every = config.extra_life_every.max(1);
            change.lives_gained = to / every - from / every;
            change.to = to;
            self.level = to;
            self.lives += change.lives_gained;
        }
        change
    }

    /// Consume a life. Returns the lives left.
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// XP accumulated inside the current level and the span of that level
    pub fn level_progress(&self, config: &GameConfig) -> (u64, u64) {
        let floor = cumulative_xp_for_level(self.level, config);
        (self.xp - floor.min(self.xp), xp_for_level(self.level, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_level_schedule_boundaries() {
        let config = GameConfig::default();
        assert_eq!(xp_for_level(1, &config), 600);
        assert_eq!(xp_for_level(2, &config), 750);
        assert_eq!(cumulative_xp_for_level(1, &config), 0);
        assert_eq!(cumulative_xp_for_level(3, &config), 1350);
        assert_eq!(level_from_xp(599, &config), 1);
        assert_eq!(level_from_xp(600, &config), 2);
        assert_eq!(level_from_xp(1349, &config), 2);
        assert_eq!(level_from_xp(1350, &config), 3);
    }

    #[test]
    fn test_add_xp_reports_level_change() {
        let config = GameConfig::default();
        let mut progression = Progression::new(&config);
        let change = progression.add_xp(599, &config);
        assert!(!change.leveled_up());

        let change = progression.add_xp(1, &config);
        assert_eq!((change.from, change.to), (1, 2));
        assert_eq!(progression.level, 2);
        assert_eq!(progression.lives, 3);
    }

    #[test]
    fn test_extra_life_every_fifth_level() {
        let config = GameConfig::default();
        let mut progression = Progression::new(&config);
        let change = progression.add_xp(cumulative_xp_for_level(5, &config), &config);
        assert_eq!(change.to, 5);
        assert_eq!(change.lives_gained, 1);
        assert_eq!(progression.lives, 4);

        // Jumping straight past two milestones grants both lives
        let change = progression.add_xp(cumulative_xp_for_level(15, &config), &config);
        assert!(change.to >= 15);
        assert_eq!(change.lives_gained, change.to / 5 - 1);
    }

    #[test]
    fn test_level_progress_within_level() {
        let config = GameConfig::default();
        let mut progression = Progression::new(&config);
        progression.add_xp(700, &config);
        assert_eq!(progression.level_progress(&config), (100, 750));
    }

    proptest! {
        #[test]
        fn prop_cumulative_boundary_maps_to_level(level in 1u32..40) {
            let config = GameConfig::default();
            let threshold = cumulative_xp_for_level(level, &config);
            prop_assert_eq!(level_from_xp(threshold, &config), level);
            if threshold > 0 {
                prop_assert_eq!(level_from_xp(threshold - 1, &config), level - 1);
            }
        }

        #[test]
        fn prop_level_is_monotonic(a in 0u64..5_000_000, b in 0u64..5_000_000) {
            let config = GameConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_from_xp(lo, &config) <= level_from_xp(hi, &config));
        }

        #[test]
        fn prop_level_bracket_holds(xp in 0u64..5_000_000) {
            let config = GameConfig::default();
            let level = level_from_xp(xp, &config);
            prop_assert!(cumulative_xp_for_level(level, &config) <= xp);
            prop_assert!(xp < cumulative_xp_for_level(level + 1, &config));
        }
    }
}
