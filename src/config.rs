//! Game balance configuration
//!
//! One table of named tunables read by every subsystem. Loaded from JSON
//! (partial files override defaults field by field). At runtime only the
//! upgrade recalculation and viewport resizing write to it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floor for the enemy spawn interval regardless of configured minimum
pub const SPAWN_INTERVAL_FLOOR_MS: f64 = 50.0;
/// Floor for the radial pulse interval
pub const PULSE_INTERVAL_FLOOR_MS: f64 = 100.0;
/// Floor for the dash cooldown
pub const DASH_COOLDOWN_FLOOR_MS: f64 = 500.0;
/// Floor for the automatic burst interval
pub const BURST_INTERVAL_FLOOR_MS: f64 = 500.0;
/// Largest viewport the simulation will size spawn rings for
pub const MAX_VIEWPORT: (f32, f32) = (1280.0, 800.0);

/// Errors raised while loading or validating a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("enemy type table has no `{0:?}` entry")]
    MissingEnemyType(EnemyKind),
}

/// Enemy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    Basic,
    Tank,
    Squiggly,
}

/// Side-to-side weave applied on top of the chase vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Squiggle {
    /// Lateral offset scale (pixels per reference frame)
    pub amplitude: f32,
    /// Phase advance per millisecond
    pub frequency: f32,
}

/// One row of the enemy-type table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTypeDef {
    pub kind: EnemyKind,
    pub name: String,
    pub size: f32,
    pub hp: i32,
    pub speed: f32,
    pub color: String,
    /// Seconds of game time before this type can spawn
    pub spawn_after_secs: f32,
    /// Relative weight in the spawn draw
    pub spawn_chance: f32,
    #[serde(default)]
    pub squiggle: Option<Squiggle>,
}

fn default_enemy_types() -> Vec<EnemyTypeDef> {
    vec![
        EnemyTypeDef {
            kind: EnemyKind::Basic,
            name: "Basic".into(),
            size: 15.0,
            hp: 1,
            speed: 2.0,
            color: "#ff0000".into(),
            spawn_after_secs: 0.0,
            spawn_chance: 1.0,
            squiggle: None,
        },
        EnemyTypeDef {
            kind: EnemyKind::Tank,
            name: "Tank".into(),
            size: 25.0,
            hp: 2,
            speed: 1.5,
            color: "#ff6600".into(),
            spawn_after_secs: 10.0,
            spawn_chance: 0.3,
            squiggle: None,
        },
        EnemyTypeDef {
            kind: EnemyKind::Squiggly,
            name: "Squiggly".into(),
            size: 12.0,
            hp: 1,
            speed: 4.0,
            color: "#ff00ff".into(),
            spawn_after_secs: 20.0,
            spawn_chance: 0.4,
            squiggle: Some(Squiggle {
                amplitude: 30.0,
                frequency: 0.1,
            }),
        },
    ]
}

/// All tunables. Distances are pixels, speeds are pixels per 60 Hz frame,
/// times are milliseconds of simulation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === Viewport ===
    pub canvas_width: f32,
    pub canvas_height: f32,
    /// Spawn ring distance as a fraction of the larger viewport side
    pub spawn_distance_factor: f32,

    // === Feedback ===
    pub screen_shake_intensity: f32,
    pub screen_shake_duration_ms: f64,

    // === Player ===
    pub player_acceleration: f32,
    pub player_friction: f32,
    pub player_max_speed: f32,
    pub player_size: f32,
    pub player_color: String,

    // === Dash ===
    pub dash_speed_multiplier: f32,
    pub dash_duration_ms: f64,
    pub dash_cooldown_ms: f64,
    pub dash_trail_ms: f64,

    // === Bullets ===
    pub bullet_speed: f32,
    pub bullet_lifetime_ms: f64,
    pub bullet_size: f32,
    /// Bullets despawn beyond this multiple of the larger viewport side
    pub bullet_range_factor: f32,
    pub bullet_color: String,
    pub bullet_count: u32,
    pub bullet_pulse_interval_ms: f64,
    pub split_angle: f32,
    pub max_split_generation: u32,

    // === Directional pulse ===
    pub directional_pulse_base_count: u32,
    pub directional_pulse_per_level: u32,
    pub directional_pulse_spread: f32,

    // === Burst fire ===
    pub burst_bullet_count: u32,
    pub burst_interval_ms: f64,
    pub burst_bullet_speed: f32,
    pub burst_spacing: f32,
    pub homing_range: f32,
    /// Maximum heading change per reference frame, radians
    pub homing_turn_rate: f32,

    // === Enemies ===
    pub enemy_spawn_interval_ms: f64,
    pub enemy_spawn_interval_min_ms: f64,
    pub enemy_types: Vec<EnemyTypeDef>,

    // === Difficulty ===
    pub difficulty_scale_rate: f64,
    pub difficulty_update_interval_ms: f64,

    // === Clustering ===
    pub enemy_cluster_size: u32,
    pub enemy_cluster_radius: f32,
    pub enemy_min_spawn_distance: f32,
    pub cluster_placement_attempts: u32,
    /// One extra enemy per cluster for every this many seconds survived
    pub cluster_growth_interval_secs: f64,

    // === Directional spawning ===
    pub movement_direction_window_ms: f64,
    pub movement_sample_interval_ms: f64,
    pub movement_direction_angle_tolerance: f32,
    pub movement_direction_min_distance: f32,
    pub movement_segment_min_distance: f32,
    pub movement_consistency_ratio: f32,
    pub directional_spawn_multiplier: f32,

    // === Swarms ===
    pub standing_still_threshold_ms: f64,
    pub standing_still_speed: f32,
    pub swarm_size: u32,
    pub swarm_min_game_time_ms: f64,
    pub swarm_cooldown_ms: f64,

    // === Orb absorbers ===
    pub orb_absorber_spawn_interval_ms: f64,
    pub orb_absorber_spawn_distance: f32,
    pub orb_absorber_spawn_jitter: f32,
    pub orb_absorber_collection_radius: f32,
    pub orb_absorber_touch_radius: f32,
    pub orb_absorber_lifespan_ms: f64,
    pub orb_absorber_drift_speed: f32,

    // === Boss ===
    pub boss_spawn_interval_ms: f64,
    pub boss_spawn_distance: f32,
    pub boss_hp: i32,
    pub boss_size: f32,
    pub boss_speed: f32,
    pub boss_color: String,
    pub boss_dash_speed: f32,
    pub boss_dash_duration_ms: f64,
    pub boss_dash_cooldown_ms: f64,
    pub boss_dash_min_distance: f32,
    pub boss_satellite_count: u32,
    pub boss_satellite_distance: f32,
    pub boss_satellite_hp: i32,
    pub boss_satellite_size: f32,
    pub boss_satellite_orbit_speed: f32,
    pub boss_satellite_color: String,

    // === Asteroids ===
    pub asteroid_spawn_interval_ms: f64,
    pub asteroid_field_size: u32,
    pub asteroid_cluster_size: u32,
    pub asteroid_cluster_radius: f32,
    pub asteroid_spawn_distance: f32,
    pub asteroid_speed: f32,
    pub asteroid_color: String,
    pub asteroid_size_min: f32,
    pub asteroid_size_max: f32,
    pub asteroid_hp_min: i32,
    pub asteroid_hp_max: i32,
    pub asteroid_trail_ms: f64,
    /// Asteroids despawn beyond this multiple of the larger viewport side
    pub asteroid_despawn_factor: f32,

    // === Score / XP ===
    pub score_per_kill: u64,
    pub boss_score_multiplier: u64,
    pub xp_per_kill: u64,
    pub boss_xp_multiplier: u64,
    pub xp_base: f64,
    pub xp_multiplier: f64,
    pub xp_orb_size: f32,
    pub boss_xp_orb_size: f32,
    pub xp_pickup_radius: f32,

    // === Progression ===
    pub upgrade_options_count: usize,
    pub rare_upgrade_chance: f64,
    pub starting_lives: u32,
    pub extra_life_every: u32,
    pub respawn_delay_ms: f64,
    pub respawn_safety_radius: f32,

    // === Cosmetics ===
    pub max_particles: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1024.0,
            canvas_height: 768.0,
            spawn_distance_factor: 0.6,

            screen_shake_intensity: 5.0,
            screen_shake_duration_ms: 200.0,

            player_acceleration: 0.18,
            player_friction: 0.97,
            player_max_speed: 4.5,
            player_size: 20.0,
            player_color: "#00ffff".into(),

            dash_speed_multiplier: 2.0,
            dash_duration_ms: 1000.0,
            dash_cooldown_ms: 2000.0,
            dash_trail_ms: 200.0,

            bullet_speed: 4.0,
            bullet_lifetime_ms: 2000.0,
            bullet_size: 3.0,
            bullet_range_factor: 1.5,
            bullet_color: "#ffff00".into(),
            bullet_count: 12,
            bullet_pulse_interval_ms: 900.0,
            split_angle: std::f32::consts::FRAC_PI_6,
            max_split_generation: 2,

            directional_pulse_base_count: 8,
            directional_pulse_per_level: 2,
            directional_pulse_spread: 0.8,

            burst_bullet_count: 3,
            burst_interval_ms: 2000.0,
            burst_bullet_speed: 8.0,
            burst_spacing: 15.0,
            homing_range: 400.0,
            homing_turn_rate: 0.08,

            enemy_spawn_interval_ms: 2500.0,
            enemy_spawn_interval_min_ms: 400.0,
            enemy_types: default_enemy_types(),

            difficulty_scale_rate: 0.995,
            difficulty_update_interval_ms: 2000.0,

            enemy_cluster_size: 3,
            enemy_cluster_radius: 50.0,
            enemy_min_spawn_distance: 30.0,
            cluster_placement_attempts: 20,
            cluster_growth_interval_secs: 30.0,

            movement_direction_window_ms: 1500.0,
            movement_sample_interval_ms: 100.0,
            movement_direction_angle_tolerance: 0.6,
            movement_direction_min_distance: 50.0,
            movement_segment_min_distance: 10.0,
            movement_consistency_ratio: 0.6,
            directional_spawn_multiplier: 3.0,

            standing_still_threshold_ms: 5000.0,
            standing_still_speed: 0.5,
            swarm_size: 8,
            swarm_min_game_time_ms: 20000.0,
            swarm_cooldown_ms: 10000.0,

            orb_absorber_spawn_interval_ms: 30000.0,
            orb_absorber_spawn_distance: 200.0,
            orb_absorber_spawn_jitter: 100.0,
            orb_absorber_collection_radius: 1200.0,
            orb_absorber_touch_radius: 25.0,
            orb_absorber_lifespan_ms: 30000.0,
            orb_absorber_drift_speed: 1.5,

            boss_spawn_interval_ms: 60000.0,
            boss_spawn_distance: 500.0,
            boss_hp: 15,
            boss_size: 40.0,
            boss_speed: 1.2,
            boss_color: "#ff00ff".into(),
            boss_dash_speed: 4.0,
            boss_dash_duration_ms: 8000.0,
            boss_dash_cooldown_ms: 3000.0,
            boss_dash_min_distance: 100.0,
            boss_satellite_count: 5,
            boss_satellite_distance: 60.0,
            boss_satellite_hp: 3,
            boss_satellite_size: 12.0,
            boss_satellite_orbit_speed: 0.02,
            boss_satellite_color: "#ff88ff".into(),

            asteroid_spawn_interval_ms: 8000.0,
            asteroid_field_size: 3,
            asteroid_cluster_size: 4,
            asteroid_cluster_radius: 40.0,
            asteroid_spawn_distance: 600.0,
            asteroid_speed: 1.5,
            asteroid_color: "#ffffff".into(),
            asteroid_size_min: 8.0,
            asteroid_size_max: 15.0,
            asteroid_hp_min: 2,
            asteroid_hp_max: 4,
            asteroid_trail_ms: 200.0,
            asteroid_despawn_factor: 2.0,

            score_per_kill: 10,
            boss_score_multiplier: 10,
            xp_per_kill: 35,
            boss_xp_multiplier: 20,
            xp_base: 600.0,
            xp_multiplier: 1.25,
            xp_orb_size: 6.0,
            boss_xp_orb_size: 12.0,
            xp_pickup_radius: 100.0,

            upgrade_options_count: 3,
            rare_upgrade_chance: 0.1,
            starting_lives: 3,
            extra_life_every: 5,
            respawn_delay_ms: 2000.0,
            respawn_safety_radius: 200.0,

            max_particles: 512,
        }
    }
}

impl GameConfig {
    /// Parse a (possibly partial) JSON config, then validate and sanitize it
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.sanitize();
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }

        positive("canvas_width", self.canvas_width as f64)?;
        positive("canvas_height", self.canvas_height as f64)?;
        positive("player_size", self.player_size as f64)?;
        positive("player_max_speed", self.player_max_speed as f64)?;
        positive("bullet_size", self.bullet_size as f64)?;
        positive("bullet_lifetime_ms", self.bullet_lifetime_ms)?;
        positive("enemy_spawn_interval_ms", self.enemy_spawn_interval_ms)?;
        positive("difficulty_update_interval_ms", self.difficulty_update_interval_ms)?;
        positive("xp_base", self.xp_base)?;
        positive("cluster_growth_interval_secs", self.cluster_growth_interval_secs)?;

        if !(0.0..=1.0).contains(&self.difficulty_scale_rate) || self.difficulty_scale_rate == 0.0 {
            return Err(ConfigError::Invalid {
                field: "difficulty_scale_rate",
                reason: format!("must be in (0, 1], got {}", self.difficulty_scale_rate),
            });
        }
        if self.xp_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                field: "xp_multiplier",
                reason: format!("must be >= 1.0, got {}", self.xp_multiplier),
            });
        }
        if !(0.0..=1.0).contains(&self.rare_upgrade_chance) {
            return Err(ConfigError::Invalid {
                field: "rare_upgrade_chance",
                reason: format!("must be a probability, got {}", self.rare_upgrade_chance),
            });
        }
        if !(0.0..=1.0).contains(&self.player_friction) {
            return Err(ConfigError::Invalid {
                field: "player_friction",
                reason: format!("must be in [0, 1], got {}", self.player_friction),
            });
        }
        if self.asteroid_hp_min > self.asteroid_hp_max || self.asteroid_size_min > self.asteroid_size_max {
            return Err(ConfigError::Invalid {
                field: "asteroid_hp_min",
                reason: "asteroid min bounds exceed max bounds".into(),
            });
        }
        if self.enemy_type(EnemyKind::Basic).is_none() {
            return Err(ConfigError::MissingEnemyType(EnemyKind::Basic));
        }
        Ok(())
    }

    /// Clamp timings to their safety floors
    pub fn sanitize(&mut self) {
        let min_spawn = self.enemy_spawn_interval_min_ms.max(SPAWN_INTERVAL_FLOOR_MS);
        if min_spawn != self.enemy_spawn_interval_min_ms {
            log::warn!(
                "enemy_spawn_interval_min_ms {} below floor, clamped to {}",
                self.enemy_spawn_interval_min_ms,
                min_spawn
            );
        }
        self.enemy_spawn_interval_min_ms = min_spawn;
        self.enemy_spawn_interval_ms = self.enemy_spawn_interval_ms.max(min_spawn);
        self.bullet_pulse_interval_ms = self.bullet_pulse_interval_ms.max(PULSE_INTERVAL_FLOOR_MS);
        self.dash_cooldown_ms = self.dash_cooldown_ms.max(DASH_COOLDOWN_FLOOR_MS);
        self.burst_interval_ms = self.burst_interval_ms.max(BURST_INTERVAL_FLOOR_MS);
        self.upgrade_options_count = self.upgrade_options_count.max(1);
        self.cluster_placement_attempts = self.cluster_placement_attempts.max(1);
        self.extra_life_every = self.extra_life_every.max(1);
    }

    /// Look up an enemy type definition
    pub fn enemy_type(&self, kind: EnemyKind) -> Option<&EnemyTypeDef> {
        self.enemy_types.iter().find(|t| t.kind == kind)
    }

    /// Larger side of the viewport
    pub fn viewport_extent(&self) -> f32 {
        self.canvas_width.max(self.canvas_height)
    }

    /// Distance from the player at which off-screen spawns are placed
    pub fn spawn_distance(&self) -> f32 {
        self.viewport_extent() * self.spawn_distance_factor
    }

    /// Apply a host resize, capped to the largest supported viewport
    pub fn resize(&mut self, width: f32, height: f32) {
        self.canvas_width = width.clamp(1.0, MAX_VIEWPORT.0);
        self.canvas_height = height.clamp(1.0, MAX_VIEWPORT.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides_only_named_fields() {
        let config = GameConfig::from_json_str(r#"{ "bullet_count": 20, "xp_base": 100.0 }"#).unwrap();
        assert_eq!(config.bullet_count, 20);
        assert_eq!(config.xp_base, 100.0);
        assert_eq!(config.enemy_types.len(), 3);
        assert_eq!(config.player_max_speed, GameConfig::default().player_max_speed);
    }

    #[test]
    fn test_rejects_missing_basic_enemy() {
        let err = GameConfig::from_json_str(r#"{ "enemy_types": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnemyType(EnemyKind::Basic)));
    }

    #[test]
    fn test_rejects_bad_scale_rate() {
        let err = GameConfig::from_json_str(r#"{ "difficulty_scale_rate": 1.5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "difficulty_scale_rate", .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = GameConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_sanitize_applies_floors() {
        let mut config = GameConfig {
            enemy_spawn_interval_min_ms: 1.0,
            bullet_pulse_interval_ms: 10.0,
            dash_cooldown_ms: 0.0,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.enemy_spawn_interval_min_ms, SPAWN_INTERVAL_FLOOR_MS);
        assert_eq!(config.bullet_pulse_interval_ms, PULSE_INTERVAL_FLOOR_MS);
        assert_eq!(config.dash_cooldown_ms, DASH_COOLDOWN_FLOOR_MS);
    }

    #[test]
    fn test_resize_caps_viewport() {
        let mut config = GameConfig::default();
        config.resize(4000.0, 300.0);
        assert_eq!(config.canvas_width, MAX_VIEWPORT.0);
        assert_eq!(config.canvas_height, 300.0);
        assert_eq!(config.spawn_distance(), MAX_VIEWPORT.0 * 0.6);
    }
}
