//! Entity records and factories
//!
//! Every entity carries an `active` flag. Destruction only clears the flag;
//! the orchestrator compacts collections after each update pass.

use std::collections::{HashSet, VecDeque};
use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{EnemyKind, EnemyTypeDef, GameConfig, Squiggle};
use crate::{direction_to, heading, normalize_angle, polar_to_cartesian};

/// Stable identity for entities that other entities refer to by key
pub type EntityId = u32;

/// Timestamped position for trails and movement history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub pos: Vec2,
    pub time_ms: f64,
}

/// Push a trail point and drop everything older than `window_ms`
pub fn push_trail(trail: &mut VecDeque<TrailPoint>, pos: Vec2, now_ms: f64, window_ms: f64) {
    trail.push_back(TrailPoint { pos, time_ms: now_ms });
    while trail
        .front()
        .is_some_and(|p| now_ms - p.time_ms >= window_ms)
    {
        trail.pop_front();
    }
}

/// Homing capability. `target` is a lookup key only; the enemy may be gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Homing {
    pub target: Option<EntityId>,
}

/// Creation-time bullet properties
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BulletTraits {
    /// Extra enemies the bullet may pass through (0 = no piercing)
    pub pierce_count: u32,
    pub can_split: bool,
    pub split_generation: u32,
    pub homing: bool,
}

/// A projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub pos: Vec2,
    pub vel: Vec2,
    pub spawned_at_ms: f64,
    pub active: bool,
    pub pierce_count: u32,
    /// Enemies already struck, so a piercing pass never counts twice
    pub enemies_hit: HashSet<EntityId>,
    pub can_split: bool,
    pub split_generation: u32,
    #[serde(default)]
    pub homing: Option<Homing>,
}

impl Bullet {
    pub fn new(pos: Vec2, angle: f32, speed: f32, traits: BulletTraits, now_ms: f64) -> Self {
        Self {
            pos,
            vel: polar_to_cartesian(speed, angle),
            spawned_at_ms: now_ms,
            active: true,
            pierce_count: traits.pierce_count,
            enemies_hit: HashSet::new(),
            can_split: traits.can_split,
            split_generation: traits.split_generation,
            homing: traits.homing.then(Homing::default),
        }
    }

    /// Number of enemies this bullet has struck
    pub fn hits_landed(&self) -> u32 {
        self.enemies_hit.len() as u32
    }

    /// Whether a hit right now would spawn children
    pub fn can_split_further(&self, max_generation: u32) -> bool {
        self.can_split && self.split_generation < max_generation
    }

    /// Two children diverging by ±`split_angle` from the current heading
    pub fn split_children(&self, split_angle: f32, speed: f32, now_ms: f64) -> [Bullet; 2] {
        let current = heading(self.vel);
        let traits = BulletTraits {
            pierce_count: self.pierce_count,
            can_split: true,
            split_generation: self.split_generation + 1,
            homing: false,
        };
        [
            Bullet::new(self.pos, current - split_angle, speed, traits, now_ms),
            Bullet::new(self.pos, current + split_angle, speed, traits, now_ms),
        ]
    }

    /// Advance position, steer if homing, expire on age or range
    pub fn update(
        &mut self,
        frames: f32,
        now_ms: f64,
        player_pos: Vec2,
        enemies: &[Enemy],
        config: &GameConfig,
    ) {
        if !self.active {
            return;
        }

        if let Some(homing) = self.homing.as_mut() {
            let tracked = homing
                .target
                .and_then(|id| enemies.iter().find(|e| e.active && e.id == id));
            let target = tracked.or_else(|| nearest_enemy(enemies, self.pos, config.homing_range));
            homing.target = target.map(|e| e.id);

            if let Some(desired) = target.and_then(|e| direction_to(self.pos, e.pos)) {
                let speed = self.vel.length();
                let current = heading(self.vel);
                let max_turn = config.homing_turn_rate * frames;
                let turn = normalize_angle(heading(desired) - current).clamp(-max_turn, max_turn);
                self.vel = polar_to_cartesian(speed, current + turn);
            }
        }

        self.pos += self.vel * frames;

        if now_ms - self.spawned_at_ms > config.bullet_lifetime_ms {
            self.active = false;
            return;
        }

        let max_range = config.viewport_extent() * config.bullet_range_factor;
        if self.pos.distance(player_pos) > max_range {
            self.active = false;
        }
    }
}

fn nearest_enemy(enemies: &[Enemy], from: Vec2, range: f32) -> Option<&Enemy> {
    enemies
        .iter()
        .filter(|e| e.active)
        .map(|e| (e, e.pos.distance_squared(from)))
        .filter(|(_, d2)| *d2 <= range * range)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(e, _)| e)
}

/// A chasing enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    pub size: f32,
    pub speed: f32,
    pub color: String,
    pub squiggle: Option<Squiggle>,
    /// Weave phase; starts random so a cluster does not move in lockstep
    pub squiggle_phase: f32,
    pub active: bool,
}

impl Enemy {
    pub fn new(id: EntityId, pos: Vec2, def: &EnemyTypeDef, rng: &mut impl Rng) -> Self {
        Self {
            id,
            kind: def.kind,
            pos,
            hp: def.hp,
            max_hp: def.hp,
            size: def.size,
            speed: def.speed,
            color: def.color.clone(),
            squiggle: def.squiggle,
            squiggle_phase: rng.random::<f32>() * TAU,
            active: true,
        }
    }

    /// Collision radius
    pub fn radius(&self) -> f32 {
        self.size / 2.0
    }

    /// Chase the target, weaving sideways if this is a squiggly variant
    pub fn update(&mut self, target: Vec2, dt_ms: f32, frames: f32) {
        if !self.active {
            return;
        }
        let Some(dir) = direction_to(self.pos, target) else {
            return;
        };

        let mut step = dir * self.speed;
        if let Some(squiggle) = self.squiggle {
            self.squiggle_phase += dt_ms * squiggle.frequency;
            let perp = Vec2::new(-dir.y, dir.x);
            step += perp * self.squiggle_phase.sin() * squiggle.amplitude;
        }
        self.pos += step * frames;
    }
}

/// Number of vertices in an asteroid outline
pub const ASTEROID_SIDES: usize = 6;

/// A drifting rock. Velocity is fixed at spawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asteroid {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub hp: i32,
    pub max_hp: i32,
    /// Irregular outline relative to the centre, fixed at creation
    pub shape: Vec<Vec2>,
    pub rotation: f32,
    pub rotation_speed: f32,
    #[serde(skip)]
    pub trail: VecDeque<TrailPoint>,
    pub active: bool,
}

impl Asteroid {
    /// Aim at `target` once; the asteroid never retargets
    pub fn new(pos: Vec2, target: Vec2, config: &GameConfig, rng: &mut impl Rng) -> Self {
        let angle = heading(target - pos);
        let size = config.asteroid_size_min
            + rng.random::<f32>() * (config.asteroid_size_max - config.asteroid_size_min);
        let hp = rng.random_range(config.asteroid_hp_min..=config.asteroid_hp_max);

        let shape = (0..ASTEROID_SIDES)
            .map(|i| {
                let point_angle = i as f32 / ASTEROID_SIDES as f32 * TAU;
                let radius = size * (0.7 + rng.random::<f32>() * 0.3);
                polar_to_cartesian(radius, point_angle)
            })
            .collect();

        Self {
            pos,
            vel: polar_to_cartesian(config.asteroid_speed, angle),
            size,
            hp,
            max_hp: hp,
            shape,
            rotation: rng.random::<f32>() * TAU,
            rotation_speed: (rng.random::<f32>() - 0.5) * 0.05,
            trail: VecDeque::new(),
            active: true,
        }
    }

    pub fn update(&mut self, frames: f32, now_ms: f64, trail_ms: f64) {
        if !self.active {
            return;
        }
        push_trail(&mut self.trail, self.pos, now_ms, trail_ms);
        self.pos += self.vel * frames;
        self.rotation += self.rotation_speed * frames;
    }
}

/// Boss movement state machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BossMotion {
    /// Chasing at walking speed, ready to dash
    Idle,
    /// Charging the player at dash speed
    Dashing { started_at_ms: f64 },
    /// Chasing at walking speed, dash recharging
    Cooldown { since_ms: f64 },
}

/// An orbiting escort. Position is derived from the parent every frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Satellite {
    pub orbit_angle: f32,
    pub orbit_distance: f32,
    pub orbit_speed: f32,
    pub pos: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    pub size: f32,
    pub color: String,
    pub active: bool,
}

impl Satellite {
    pub fn new(boss_pos: Vec2, angle: f32, config: &GameConfig) -> Self {
        Self {
            orbit_angle: angle,
            orbit_distance: config.boss_satellite_distance,
            orbit_speed: config.boss_satellite_orbit_speed,
            pos: boss_pos + polar_to_cartesian(config.boss_satellite_distance, angle),
            hp: config.boss_satellite_hp,
            max_hp: config.boss_satellite_hp,
            size: config.boss_satellite_size,
            color: config.boss_satellite_color.clone(),
            active: true,
        }
    }
}

/// A boss with its satellite ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub pos: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    pub size: f32,
    pub speed: f32,
    pub color: String,
    pub motion: BossMotion,
    pub satellites: Vec<Satellite>,
    /// Accumulated ring rotation (cosmetic)
    pub orbit_phase: f32,
    pub spawned_at_ms: f64,
    pub active: bool,
}

impl Boss {
    /// Boss with `boss_satellite_count` satellites evenly spaced around it
    pub fn new(pos: Vec2, config: &GameConfig, now_ms: f64) -> Self {
        let count = config.boss_satellite_count;
        let step = TAU / count.max(1) as f32;
        let satellites = (0..count)
            .map(|i| Satellite::new(pos, i as f32 * step, config))
            .collect();

        Self {
            pos,
            hp: config.boss_hp,
            max_hp: config.boss_hp,
            size: config.boss_size,
            speed: config.boss_speed,
            color: config.boss_color.clone(),
            motion: BossMotion::Idle,
            satellites,
            orbit_phase: 0.0,
            spawned_at_ms: now_ms,
            active: true,
        }
    }

    pub fn is_dashing(&self) -> bool {
        matches!(self.motion, BossMotion::Dashing { .. })
    }

    /// Advance the dash state machine, move, then re-seat the satellites
    pub fn update(&mut self, target: Vec2, frames: f32, now_ms: f64, config: &GameConfig) {
        if !self.active {
            return;
        }

        self.motion = match self.motion {
            BossMotion::Idle if self.pos.distance(target) > config.boss_dash_min_distance => {
                BossMotion::Dashing { started_at_ms: now_ms }
            }
            BossMotion::Dashing { started_at_ms }
                if now_ms - started_at_ms >= config.boss_dash_duration_ms =>
            {
                BossMotion::Cooldown { since_ms: now_ms }
            }
            BossMotion::Cooldown { since_ms } if now_ms - since_ms >= config.boss_dash_cooldown_ms => {
                BossMotion::Idle
            }
            other => other,
        };

        let speed = if self.is_dashing() {
            config.boss_dash_speed
        } else {
            self.speed
        };
        if let Some(dir) = direction_to(self.pos, target) {
            self.pos += dir * speed * frames;
        }

        self.orbit_phase += config.boss_satellite_orbit_speed * frames;
        for satellite in self.satellites.iter_mut().filter(|s| s.active) {
            satellite.orbit_angle += satellite.orbit_speed * frames;
            satellite.pos = self.pos + polar_to_cartesian(satellite.orbit_distance, satellite.orbit_angle);
        }
    }
}

/// Experience pickup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpOrb {
    pub pos: Vec2,
    pub xp: u64,
    pub size: f32,
    pub collected: bool,
    pub active: bool,
    /// Absorber currently pulling this orb (lookup key, may be stale)
    #[serde(default)]
    pub absorber: Option<EntityId>,
}

impl XpOrb {
    pub fn new(pos: Vec2, xp: u64, size: f32) -> Self {
        Self {
            pos,
            xp,
            size,
            collected: false,
            active: true,
            absorber: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.active && !self.collected
    }

    /// Drift toward a live absorber if one claimed this orb, otherwise get
    /// pulled by the player's magnet when inside the pickup radius.
    pub fn update(
        &mut self,
        player_pos: Vec2,
        absorbers: &[OrbAbsorber],
        frames: f32,
        config: &GameConfig,
    ) {
        if !self.is_available() {
            return;
        }

        let claimed = self
            .absorber
            .and_then(|id| absorbers.iter().find(|a| a.id == id && a.is_available()));
        let claimed = claimed.or_else(|| {
            absorbers.iter().find(|a| {
                a.is_available() && a.pos.distance(self.pos) < config.orb_absorber_collection_radius
            })
        });
        self.absorber = claimed.map(|a| a.id);

        let dist = self.pos.distance(player_pos);
        let radius = config.xp_pickup_radius;
        if dist < radius {
            if let Some(dir) = direction_to(self.pos, player_pos) {
                let speed = 3.0 + (radius - dist) / 20.0;
                self.pos += dir * speed * frames;
            }
        } else if let Some(absorber) = claimed {
            if let Some(dir) = direction_to(self.pos, absorber.pos) {
                let step = (config.orb_absorber_drift_speed * frames).min(self.pos.distance(absorber.pos));
                self.pos += dir * step;
            }
        }
    }
}

/// Field object that hoovers up every orb in range when touched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbAbsorber {
    pub id: EntityId,
    pub pos: Vec2,
    pub active: bool,
    pub collected: bool,
    /// True while at least one orb is drifting toward it
    pub is_collecting: bool,
    pub spawned_at_ms: f64,
    /// Pulse animation clock
    pub pulse_ms: f64,
}

impl OrbAbsorber {
    pub fn new(id: EntityId, pos: Vec2, now_ms: f64) -> Self {
        Self {
            id,
            pos,
            active: true,
            collected: false,
            is_collecting: false,
            spawned_at_ms: now_ms,
            pulse_ms: 0.0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.active && !self.collected
    }

    /// Expire after its lifespan; otherwise animate
    pub fn update(&mut self, dt_ms: f64, now_ms: f64, lifespan_ms: f64) {
        if !self.is_available() {
            return;
        }
        if now_ms - self.spawned_at_ms > lifespan_ms {
            self.active = false;
            return;
        }
        self.pulse_ms += dt_ms;
    }
}

/// Cosmetic debris
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// 1.0 at birth, inactive at 0.0
    pub life: f32,
    pub decay: f32,
    pub size: f32,
    pub color: String,
    pub active: bool,
}

impl Particle {
    pub fn new(pos: Vec2, color: &str, rng: &mut impl Rng) -> Self {
        let angle = rng.random::<f32>() * TAU;
        let speed = 1.0 + rng.random::<f32>() * 3.0;
        Self {
            pos,
            vel: polar_to_cartesian(speed, angle),
            life: 1.0,
            decay: 0.02 + rng.random::<f32>() * 0.03,
            size: 2.0 + rng.random::<f32>() * 3.0,
            color: color.to_string(),
            active: true,
        }
    }

    pub fn update(&mut self, frames: f32) {
        if !self.active {
            return;
        }
        self.pos += self.vel * frames;
        self.vel *= 0.98f32.powf(frames);
        self.life -= self.decay * frames;
        if self.life <= 0.0 {
            self.active = false;
        }
    }
}

/// `count` particles bursting from `pos`
pub fn particle_burst(pos: Vec2, count: usize, color: &str, rng: &mut impl Rng) -> Vec<Particle> {
    (0..count).map(|_| Particle::new(pos, color, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    #[test]
    fn test_bullet_expires_after_lifetime() {
        let config = GameConfig::default();
        let mut bullet = Bullet::new(Vec2::ZERO, 0.0, 4.0, BulletTraits::default(), 0.0);
        bullet.update(1.0, 1000.0, Vec2::ZERO, &[], &config);
        assert!(bullet.active);
        bullet.update(1.0, config.bullet_lifetime_ms + 1.0, Vec2::ZERO, &[], &config);
        assert!(!bullet.active);
    }

    #[test]
    fn test_bullet_expires_out_of_range() {
        let config = GameConfig::default();
        let far = Vec2::new(config.viewport_extent() * 2.0, 0.0);
        let mut bullet = Bullet::new(far, 0.0, 4.0, BulletTraits::default(), 0.0);
        bullet.update(1.0, 10.0, Vec2::ZERO, &[], &config);
        assert!(!bullet.active);
    }

    #[test]
    fn test_split_children_diverge_and_advance_generation() {
        let bullet = Bullet::new(
            Vec2::ZERO,
            0.0,
            4.0,
            BulletTraits {
                can_split: true,
                ..Default::default()
            },
            0.0,
        );
        let [left, right] = bullet.split_children(0.5, 4.0, 0.0);
        assert!((heading(left.vel) + 0.5).abs() < 1e-5);
        assert!((heading(right.vel) - 0.5).abs() < 1e-5);
        assert_eq!(left.split_generation, 1);
        assert!(left.can_split && right.can_split);
    }

    #[test]
    fn test_homing_retargets_when_target_dies() {
        let config = GameConfig::default();
        let def = config.enemy_type(EnemyKind::Basic).unwrap().clone();
        let mut rng = rng();
        let mut enemies = vec![
            Enemy::new(1, Vec2::new(100.0, 0.0), &def, &mut rng),
            Enemy::new(2, Vec2::new(0.0, 150.0), &def, &mut rng),
        ];
        let traits = BulletTraits {
            homing: true,
            ..Default::default()
        };
        let mut bullet = Bullet::new(Vec2::ZERO, 0.0, 8.0, traits, 0.0);
        bullet.update(1.0, 16.0, Vec2::ZERO, &enemies, &config);
        assert_eq!(bullet.homing.unwrap().target, Some(1));

        enemies[0].active = false;
        bullet.update(1.0, 32.0, Vec2::ZERO, &enemies, &config);
        assert_eq!(bullet.homing.unwrap().target, Some(2));
    }

    #[test]
    fn test_enemy_chases_target() {
        let config = GameConfig::default();
        let def = config.enemy_type(EnemyKind::Basic).unwrap();
        let mut enemy = Enemy::new(1, Vec2::new(100.0, 0.0), def, &mut rng());
        enemy.update(Vec2::ZERO, 16.67, 1.0);
        assert!((enemy.pos.x - 98.0).abs() < 1e-4);
        // Zero distance is a no-op rather than a NaN
        let mut on_top = Enemy::new(2, Vec2::ZERO, def, &mut rng());
        on_top.update(Vec2::ZERO, 16.67, 1.0);
        assert_eq!(on_top.pos, Vec2::ZERO);
    }

    #[test]
    fn test_asteroid_keeps_spawn_heading() {
        let config = GameConfig::default();
        let mut asteroid = Asteroid::new(Vec2::new(600.0, 0.0), Vec2::ZERO, &config, &mut rng());
        let vel = asteroid.vel;
        assert!(vel.x < 0.0);
        for i in 0..10 {
            asteroid.update(1.0, i as f64 * 16.0, config.asteroid_trail_ms);
        }
        assert_eq!(asteroid.vel, vel);
        assert_eq!(asteroid.shape.len(), ASTEROID_SIDES);
        assert!((config.asteroid_hp_min..=config.asteroid_hp_max).contains(&asteroid.hp));
    }

    #[test]
    fn test_boss_dash_cycle() {
        let config = GameConfig::default();
        let mut boss = Boss::new(Vec2::new(500.0, 0.0), &config, 0.0);
        assert_eq!(boss.satellites.len(), config.boss_satellite_count as usize);

        boss.update(Vec2::ZERO, 1.0, 0.0, &config);
        assert!(boss.is_dashing());

        boss.update(Vec2::ZERO, 1.0, config.boss_dash_duration_ms, &config);
        assert!(matches!(boss.motion, BossMotion::Cooldown { .. }));

        boss.update(
            Vec2::ZERO,
            1.0,
            config.boss_dash_duration_ms + config.boss_dash_cooldown_ms,
            &config,
        );
        assert_eq!(boss.motion, BossMotion::Idle);
    }

    #[test]
    fn test_satellites_follow_boss() {
        let config = GameConfig::default();
        let mut boss = Boss::new(Vec2::new(300.0, 0.0), &config, 0.0);
        boss.satellites[1].active = false;
        boss.update(Vec2::ZERO, 1.0, 0.0, &config);
        assert_eq!(boss.satellites.len(), config.boss_satellite_count as usize);
        for satellite in boss.satellites.iter().filter(|s| s.active) {
            let d = satellite.pos.distance(boss.pos);
            assert!((d - config.boss_satellite_distance).abs() < 1e-3);
        }
    }

    #[test]
    fn test_absorber_expires() {
        let mut absorber = OrbAbsorber::new(1, Vec2::ZERO, 0.0);
        absorber.update(16.0, 29_000.0, 30_000.0);
        assert!(absorber.active);
        absorber.update(16.0, 30_001.0, 30_000.0);
        assert!(!absorber.active);
    }

    #[test]
    fn test_orb_claims_absorber_in_range() {
        let config = GameConfig::default();
        let absorbers = vec![OrbAbsorber::new(9, Vec2::new(500.0, 0.0), 0.0)];
        let mut orb = XpOrb::new(Vec2::new(400.0, 0.0), 35, 6.0);
        orb.update(Vec2::new(-2000.0, 0.0), &absorbers, 1.0, &config);
        assert_eq!(orb.absorber, Some(9));
        assert!(orb.pos.x > 400.0);
    }

    #[test]
    fn test_particle_fades_out() {
        let mut particle = Particle::new(Vec2::ZERO, "#fff", &mut rng());
        for _ in 0..100 {
            particle.update(1.0);
        }
        assert!(!particle.active);
    }
}
