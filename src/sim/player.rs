//! Player ship: momentum movement, facing, dash and burst fire

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entities::{Bullet, BulletTraits, TrailPoint, push_trail};
use crate::config::GameConfig;
use crate::consts::SIM_DT_MS;
use crate::{heading, polar_to_cartesian};

/// Movement intent for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerControls {
    /// Desired direction scaled by strength, length at most 1
    pub movement: Vec2,
    /// Absolute facing override (mouse or right stick)
    pub look: Option<f32>,
    /// Relative facing change in radians
    pub turn: f32,
    /// Dash trigger edge
    pub dash: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Facing angle in radians
    pub angle: f32,
    pub alive: bool,
    pub is_dashing: bool,
    /// Remaining dash cooldown
    pub dash_cooldown_ms: f64,
    pub dash_started_at_ms: f64,
    #[serde(skip)]
    pub trail: VecDeque<TrailPoint>,
    /// `None` until the first burst, which fires immediately
    pub last_burst_at_ms: Option<f64>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            angle: 0.0,
            alive: true,
            is_dashing: false,
            dash_cooldown_ms: 0.0,
            dash_started_at_ms: 0.0,
            trail: VecDeque::new(),
            last_burst_at_ms: None,
        }
    }
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Speed cap for the current dash state
    pub fn max_speed(&self, config: &GameConfig) -> f32 {
        if self.is_dashing {
            config.player_max_speed * config.dash_speed_multiplier
        } else {
            config.player_max_speed
        }
    }

    /// Back to the origin, at rest, with dash state cleared
    pub fn respawn(&mut self) {
        self.alive = true;
        self.pos = Vec2::ZERO;
        self.vel = Vec2::ZERO;
        self.is_dashing = false;
        self.dash_cooldown_ms = 0.0;
        self.trail.clear();
    }

    fn start_dash(&mut self, now_ms: f64) {
        self.is_dashing = true;
        self.dash_started_at_ms = now_ms;
        self.trail.clear();
    }

    fn end_dash(&mut self, config: &GameConfig) {
        self.is_dashing = false;
        self.dash_cooldown_ms = config.dash_cooldown_ms;
        self.trail.clear();
    }

    /// Advance one frame. Returns true when a dash started this frame.
    pub fn update(&mut self, controls: &PlayerControls, dt_ms: f64, now_ms: f64, config: &GameConfig) -> bool {
        if !self.alive {
            return false;
        }
        let frames = (dt_ms / SIM_DT_MS) as f32;

        self.angle += controls.turn;
        if let Some(look) = controls.look {
            self.angle = look;
        } else if controls.movement != Vec2::ZERO {
            self.angle = heading(controls.movement);
        }

        if self.dash_cooldown_ms > 0.0 {
            self.dash_cooldown_ms = (self.dash_cooldown_ms - dt_ms).max(0.0);
        }
        let dash_started = controls.dash && !self.is_dashing && self.dash_cooldown_ms <= 0.0;
        if dash_started {
            self.start_dash(now_ms);
        }

        let movement = controls.movement.clamp_length_max(1.0);
        self.vel += movement * config.player_acceleration * frames;

        if self.is_dashing && now_ms - self.dash_started_at_ms >= config.dash_duration_ms {
            self.end_dash(config);
        }

        let max_speed = self.max_speed(config);
        let speed = self.vel.length();
        if speed > max_speed {
            self.vel *= max_speed / speed;
        }

        // Friction weakens as speed approaches the cap, so fast ships drift
        let speed_factor = (self.vel.length() / config.player_max_speed).min(1.0);
        let friction = config.player_friction + (1.0 - config.player_friction) * (1.0 - speed_factor * 0.3);
        self.vel *= friction.powf(frames);

        self.pos += self.vel * frames;

        if self.is_dashing {
            push_trail(&mut self.trail, self.pos, now_ms, config.dash_trail_ms);
        }
        dash_started
    }

    pub fn burst_ready(&self, now_ms: f64, config: &GameConfig) -> bool {
        match self.last_burst_at_ms {
            None => true,
            Some(last) => now_ms - last >= config.burst_interval_ms,
        }
    }

    /// A straight line of bullets ahead of the ship along its facing
    pub fn fire_burst(&mut self, traits: BulletTraits, now_ms: f64, config: &GameConfig) -> Vec<Bullet> {
        self.last_burst_at_ms = Some(now_ms);
        (0..config.burst_bullet_count)
            .map(|i| {
                let offset = config.player_size + 5.0 + i as f32 * config.burst_spacing;
                let origin = self.pos + polar_to_cartesian(offset, self.angle);
                Bullet::new(origin, self.angle, config.burst_bullet_speed, traits, now_ms)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn push_right() -> PlayerControls {
        PlayerControls {
            movement: Vec2::X,
            ..Default::default()
        }
    }

    #[test]
    fn test_acceleration_faces_movement() {
        let config = GameConfig::default();
        let mut player = Player::new();
        player.update(&push_right(), SIM_DT_MS, 0.0, &config);
        assert!(player.vel.x > 0.0);
        assert_eq!(player.angle, 0.0);

        let up = PlayerControls {
            movement: Vec2::new(0.0, -1.0),
            ..Default::default()
        };
        player.update(&up, SIM_DT_MS, 16.0, &config);
        assert!((player.angle + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_look_overrides_movement_heading() {
        let config = GameConfig::default();
        let mut player = Player::new();
        let controls = PlayerControls {
            movement: Vec2::X,
            look: Some(1.0),
            ..Default::default()
        };
        player.update(&controls, SIM_DT_MS, 0.0, &config);
        assert_eq!(player.angle, 1.0);
    }

    #[test]
    fn test_dash_cycle_and_cooldown() {
        let config = GameConfig::default();
        let mut player = Player::new();
        let dash = PlayerControls {
            dash: true,
            ..push_right()
        };
        assert!(player.update(&dash, SIM_DT_MS, 0.0, &config));
        assert!(player.is_dashing);

        player.update(&push_right(), SIM_DT_MS, config.dash_duration_ms, &config);
        assert!(!player.is_dashing);
        assert!(player.trail.is_empty());
        assert!(player.dash_cooldown_ms > 0.0);

        // Still cooling down
        assert!(!player.update(&dash, SIM_DT_MS, config.dash_duration_ms + 16.0, &config));
    }

    #[test]
    fn test_dead_player_does_not_move() {
        let config = GameConfig::default();
        let mut player = Player::new();
        player.alive = false;
        player.update(&push_right(), SIM_DT_MS, 0.0, &config);
        assert_eq!(player.pos, Vec2::ZERO);
    }

    #[test]
    fn test_first_burst_is_immediate() {
        let config = GameConfig::default();
        let mut player = Player::new();
        assert!(player.burst_ready(0.0, &config));
        let bullets = player.fire_burst(BulletTraits::default(), 0.0, &config);
        assert_eq!(bullets.len(), config.burst_bullet_count as usize);
        assert!((bullets[1].pos.x - bullets[0].pos.x - config.burst_spacing).abs() < 1e-4);
        assert!(!player.burst_ready(config.burst_interval_ms - 1.0, &config));
        assert!(player.burst_ready(config.burst_interval_ms, &config));
    }

    proptest! {
        #[test]
        fn prop_speed_never_exceeds_cap(
            inputs in proptest::collection::vec((-1.0f32..1.0, -1.0f32..1.0, any::<bool>()), 1..200)
        ) {
            let config = GameConfig::default();
            let mut player = Player::new();
            for (i, (x, y, dash)) in inputs.into_iter().enumerate() {
                let controls = PlayerControls {
                    movement: Vec2::new(x, y),
                    dash,
                    ..Default::default()
                };
                player.update(&controls, SIM_DT_MS, i as f64 * SIM_DT_MS, &config);
                prop_assert!(player.speed() <= player.max_speed(&config) + 1e-4);
            }
        }
    }
}
