//! Spawn director
//!
//! Independent time-driven spawners (enemy clusters, bullet pulses,
//! absorbers, asteroid fields, bosses) plus the two behaviour-driven ones:
//! directional clusters when the player runs in a straight line and a swarm
//! when the player parks. Every spawner is best-effort; nothing here fails.

use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::entities::{Asteroid, Boss, Bullet, BulletTraits, Enemy, OrbAbsorber, TrailPoint};
use super::state::World;
use super::upgrades::UpgradeRegistry;
use crate::config::{EnemyKind, GameConfig};
use crate::{angle_between, heading, polar_to_cartesian};

/// True when no active enemy sits closer than `min_distance` to `pos`
pub fn is_valid_spawn_position(pos: Vec2, enemies: &[Enemy], min_distance: f32) -> bool {
    !enemies
        .iter()
        .any(|e| e.active && e.pos.distance(pos) < min_distance)
}

/// Evenly spaced full-circle ring
pub fn radial_pulse(origin: Vec2, count: u32, speed: f32, traits: BulletTraits, now_ms: f64) -> Vec<Bullet> {
    let step = TAU / count.max(1) as f32;
    (0..count)
        .map(|i| Bullet::new(origin, i as f32 * step, speed, traits, now_ms))
        .collect()
}

/// Forward cone of `count` bullets spanning `spread` radians around `facing`
pub fn directional_pulse(
    origin: Vec2,
    facing: f32,
    count: u32,
    spread: f32,
    speed: f32,
    traits: BulletTraits,
    now_ms: f64,
) -> Vec<Bullet> {
    if count <= 1 {
        return (0..count)
            .map(|_| Bullet::new(origin, facing, speed, traits, now_ms))
            .collect();
    }
    let step = spread / (count - 1) as f32;
    let start = facing - spread / 2.0;
    (0..count)
        .map(|i| Bullet::new(origin, start + i as f32 * step, speed, traits, now_ms))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnDirector {
    /// Current enemy cluster interval, decays toward the configured minimum
    pub spawn_interval_ms: f64,
    last_enemy_spawn_ms: f64,
    last_difficulty_update_ms: f64,
    last_pulse_ms: f64,
    last_absorber_spawn_ms: f64,
    last_asteroid_spawn_ms: f64,
    last_boss_spawn_ms: f64,
    last_swarm_ms: Option<f64>,
    standing_still_since_ms: Option<f64>,
    /// Sampled player positions inside the direction window
    #[serde(skip)]
    movement_history: VecDeque<TrailPoint>,
}

impl SpawnDirector {
    /// Fresh director for a session whose clock starts at zero
    pub fn new(config: &GameConfig) -> Self {
        Self {
            spawn_interval_ms: config.enemy_spawn_interval_ms,
            last_enemy_spawn_ms: 0.0,
            last_difficulty_update_ms: 0.0,
            last_pulse_ms: 0.0,
            last_absorber_spawn_ms: 0.0,
            last_asteroid_spawn_ms: 0.0,
            last_boss_spawn_ms: 0.0,
            last_swarm_ms: None,
            standing_still_since_ms: None,
            movement_history: VecDeque::new(),
        }
    }

    /// Run every spawner for this frame, in fixed order
    pub fn update(
        &mut self,
        world: &mut World,
        upgrades: &UpgradeRegistry,
        config: &GameConfig,
        rng: &mut impl Rng,
        now_ms: f64,
    ) {
        let player_pos = world.player.pos;

        self.record_movement(player_pos, now_ms, config);
        self.update_difficulty(now_ms, config);

        if now_ms - self.last_enemy_spawn_ms >= self.spawn_interval_ms {
            self.spawn_enemy_cluster(world, config, rng, now_ms);
            self.last_enemy_spawn_ms = now_ms;
        }

        if now_ms - self.last_pulse_ms >= config.bullet_pulse_interval_ms {
            self.fire_pulses(world, upgrades, config, now_ms);
            self.last_pulse_ms = now_ms;
        }

        let absorber_present = world.absorbers.iter().any(|a| a.is_available());
        if !absorber_present && now_ms - self.last_absorber_spawn_ms >= config.orb_absorber_spawn_interval_ms {
            self.spawn_absorber(world, config, rng, now_ms);
            self.last_absorber_spawn_ms = now_ms;
        }

        if now_ms - self.last_asteroid_spawn_ms >= config.asteroid_spawn_interval_ms {
            self.spawn_asteroid_field(world, config, rng);
            self.last_asteroid_spawn_ms = now_ms;
        }

        let boss_alive = world.bosses.iter().any(|b| b.active);
        if !boss_alive && now_ms - self.last_boss_spawn_ms >= config.boss_spawn_interval_ms {
            self.spawn_boss(world, config, rng, now_ms);
            self.last_boss_spawn_ms = now_ms;
        }

        self.check_standing_still(world, config, rng, now_ms);
    }

    /// One multiplicative step per elapsed difficulty tick, never compounded
    /// for ticks that were skipped
    pub fn update_difficulty(&mut self, now_ms: f64, config: &GameConfig) {
        if now_ms - self.last_difficulty_update_ms < config.difficulty_update_interval_ms {
            return;
        }
        self.spawn_interval_ms =
            (self.spawn_interval_ms * config.difficulty_scale_rate).max(config.enemy_spawn_interval_min_ms);
        self.last_difficulty_update_ms = now_ms;
    }

    /// Sample the player position at a fixed cadence and drop samples that
    /// fell out of the window
    pub fn record_movement(&mut self, pos: Vec2, now_ms: f64, config: &GameConfig) {
        let due = self
            .movement_history
            .back()
            .is_none_or(|last| now_ms - last.time_ms >= config.movement_sample_interval_ms);
        if due {
            self.movement_history.push_back(TrailPoint { pos, time_ms: now_ms });
        }
        while self
            .movement_history
            .front()
            .is_some_and(|p| now_ms - p.time_ms > config.movement_direction_window_ms)
        {
            self.movement_history.pop_front();
        }
    }

    /// Heading of sustained straight-line movement, if there is one
    pub fn movement_direction(&self, config: &GameConfig) -> Option<f32> {
        let (first, last) = (self.movement_history.front()?, self.movement_history.back()?);
        if self.movement_history.len() < 2 {
            return None;
        }
        let net = last.pos - first.pos;
        if net.length() < config.movement_direction_min_distance {
            return None;
        }
        let direction = heading(net);

        let consistent = self
            .movement_history
            .iter()
            .zip(self.movement_history.iter().skip(1))
            .map(|(a, b)| b.pos - a.pos)
            .filter(|seg| seg.length() > config.movement_segment_min_distance)
            .filter(|seg| angle_between(heading(*seg), direction) <= config.movement_direction_angle_tolerance)
            .count();

        let required = (self.movement_history.len() as f32 * config.movement_consistency_ratio).max(2.0);
        (consistent as f32 >= required).then_some(direction)
    }

    /// Weighted draw over types unlocked at `elapsed_secs`
    pub fn pick_enemy_kind(&self, elapsed_secs: f32, config: &GameConfig, rng: &mut impl Rng) -> EnemyKind {
        let eligible: Vec<_> = config
            .enemy_types
            .iter()
            .filter(|t| elapsed_secs >= t.spawn_after_secs)
            .collect();
        let Some(last) = eligible.last() else {
            return EnemyKind::Basic;
        };

        let total: f32 = eligible.iter().map(|t| t.spawn_chance).sum();
        let mut roll = rng.random::<f32>() * total;
        for def in &eligible {
            roll -= def.spawn_chance;
            if roll <= 0.0 {
                return def.kind;
            }
        }
        last.kind
    }

    /// Place `count` enemies around `center`. Each placement retries for
    /// spacing a bounded number of times, then accepts the last candidate.
    pub fn spawn_cluster_at(
        &self,
        world: &mut World,
        center: Vec2,
        count: u32,
        kind: EnemyKind,
        config: &GameConfig,
        rng: &mut impl Rng,
    ) {
        let Some(def) = config.enemy_type(kind).or_else(|| config.enemy_type(EnemyKind::Basic)) else {
            return;
        };

        for _ in 0..count {
            let mut candidate = center;
            for _ in 0..config.cluster_placement_attempts {
                let offset = polar_to_cartesian(
                    rng.random::<f32>() * config.enemy_cluster_radius,
                    rng.random::<f32>() * TAU,
                );
                candidate = center + offset;
                if is_valid_spawn_position(candidate, &world.enemies, config.enemy_min_spawn_distance) {
                    break;
                }
            }
            let id = world.next_entity_id();
            world.enemies.push(Enemy::new(id, candidate, def, rng));
        }
    }

    fn spawn_enemy_cluster(&mut self, world: &mut World, config: &GameConfig, rng: &mut impl Rng, now_ms: f64) {
        let player_pos = world.player.pos;
        let distance = config.spawn_distance();
        let direction = self.movement_direction(config);

        let center = match direction {
            Some(angle) => {
                let spread = (rng.random::<f32>() - 0.5) * config.canvas_width * 0.8;
                player_pos + polar_to_cartesian(distance, angle) + polar_to_cartesian(spread, angle + FRAC_PI_2)
            }
            None => {
                let along_x = (rng.random::<f32>() - 0.5) * config.canvas_width;
                let along_y = (rng.random::<f32>() - 0.5) * config.canvas_height;
                let offset = match rng.random_range(0..4) {
                    0 => Vec2::new(along_x, -distance),
                    1 => Vec2::new(distance, along_y),
                    2 => Vec2::new(along_x, distance),
                    _ => Vec2::new(-distance, along_y),
                };
                player_pos + offset
            }
        };

        let elapsed_secs = now_ms / 1000.0;
        let kind = self.pick_enemy_kind(elapsed_secs as f32, config, rng);
        let growth = (elapsed_secs / config.cluster_growth_interval_secs).floor() as u32;
        let mut count = config.enemy_cluster_size + growth;
        if direction.is_some() {
            count = (count as f32 * config.directional_spawn_multiplier).floor() as u32;
        }

        log::debug!(
            "Spawning {count} {kind:?} at {center} (directional: {})",
            direction.is_some()
        );
        self.spawn_cluster_at(world, center, count, kind, config, rng);
    }

    fn check_standing_still(&mut self, world: &mut World, config: &GameConfig, rng: &mut impl Rng, now_ms: f64) {
        if now_ms < config.swarm_min_game_time_ms {
            return;
        }
        if self
            .last_swarm_ms
            .is_some_and(|last| now_ms - last < config.swarm_cooldown_ms)
        {
            return;
        }

        // Velocity rather than position, so momentum drift still counts as parked
        if world.player.speed() > config.standing_still_speed {
            self.standing_still_since_ms = None;
            return;
        }
        let since = *self.standing_still_since_ms.get_or_insert(now_ms);
        if now_ms - since >= config.standing_still_threshold_ms {
            self.spawn_swarm(world, config, rng, now_ms);
            self.standing_still_since_ms = None;
            self.last_swarm_ms = Some(now_ms);
        }
    }

    /// Full ring of enemies around the player, just off screen
    pub fn spawn_swarm(&self, world: &mut World, config: &GameConfig, rng: &mut impl Rng, now_ms: f64) {
        let kind = self.pick_enemy_kind((now_ms / 1000.0) as f32, config, rng);
        let Some(def) = config.enemy_type(kind) else {
            return;
        };
        let player_pos = world.player.pos;
        let step = TAU / config.swarm_size.max(1) as f32;
        for i in 0..config.swarm_size {
            let pos = player_pos + polar_to_cartesian(config.spawn_distance(), i as f32 * step);
            let id = world.next_entity_id();
            world.enemies.push(Enemy::new(id, pos, def, rng));
        }
        log::info!("Swarm of {} {kind:?} around parked player", config.swarm_size);
    }

    fn fire_pulses(&self, world: &mut World, upgrades: &UpgradeRegistry, config: &GameConfig, now_ms: f64) {
        let traits = BulletTraits {
            pierce_count: upgrades.pierce_count(),
            can_split: upgrades.bullets_split(),
            split_generation: 0,
            homing: false,
        };
        let origin = world.player.pos;
        world
            .bullets
            .extend(radial_pulse(origin, config.bullet_count, config.bullet_speed, traits, now_ms));

        let level = upgrades.directional_pulse_level();
        if level > 0 {
            let count = config.directional_pulse_base_count + level * config.directional_pulse_per_level;
            world.bullets.extend(directional_pulse(
                origin,
                world.player.angle,
                count,
                config.directional_pulse_spread,
                config.bullet_speed,
                traits,
                now_ms,
            ));
        }
    }

    fn spawn_absorber(&self, world: &mut World, config: &GameConfig, rng: &mut impl Rng, now_ms: f64) {
        let angle = rng.random::<f32>() * TAU;
        let distance = config.orb_absorber_spawn_distance + rng.random::<f32>() * config.orb_absorber_spawn_jitter;
        let pos = world.player.pos + polar_to_cartesian(distance, angle);
        let id = world.next_entity_id();
        world.absorbers.push(OrbAbsorber::new(id, pos, now_ms));
        log::debug!("Orb absorber spawned at {pos}");
    }

    /// Clusters on a ring around the player, all aimed at where the player is now
    pub fn spawn_asteroid_field(&self, world: &mut World, config: &GameConfig, rng: &mut impl Rng) {
        let player_pos = world.player.pos;
        let step = TAU / config.asteroid_field_size.max(1) as f32;
        for i in 0..config.asteroid_field_size {
            let angle = i as f32 * step + (rng.random::<f32>() - 0.5) * 0.5;
            let center = player_pos + polar_to_cartesian(config.asteroid_spawn_distance, angle);
            for _ in 0..config.asteroid_cluster_size {
                let offset = polar_to_cartesian(
                    rng.random::<f32>() * config.asteroid_cluster_radius,
                    rng.random::<f32>() * TAU,
                );
                world
                    .asteroids
                    .push(Asteroid::new(center + offset, player_pos, config, rng));
            }
        }
    }

    /// A boss with its satellite ring at a random bearing from the player
    pub fn spawn_boss(&self, world: &mut World, config: &GameConfig, rng: &mut impl Rng, now_ms: f64) {
        let angle = rng.random::<f32>() * TAU;
        let pos = world.player.pos + polar_to_cartesian(config.boss_spawn_distance, angle);
        world.bosses.push(Boss::new(pos, config, now_ms));
        log::info!("Boss spawned at {pos}");
    }
}
