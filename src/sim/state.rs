//! Game state and core simulation types
//!
//! Everything one session needs is owned by `GameState` and passed down by
//! reference; there is no process-wide state.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entities::{
    Asteroid, Boss, Bullet, Enemy, EntityId, OrbAbsorber, Particle, XpOrb, particle_burst,
};
use super::player::Player;
use super::progression::Progression;
use super::spawn::SpawnDirector;
use super::upgrades::{UpgradeOffer, UpgradeRegistry, UpgradeSummary};
use crate::config::GameConfig;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Full simulation runs
    Playing,
    /// Frozen until pause is pressed again
    Paused,
    /// Waiting for the player to pick one of `offers`
    Upgrade,
    /// Run ended; only restart does anything
    GameOver,
}

/// Notable things that happened during a tick, drained by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    EnemyDestroyed { pos: Vec2 },
    BossDestroyed { pos: Vec2 },
    LevelUp { level: u32 },
    ExtraLife { lives: u32 },
    PlayerDied { lives_left: u32 },
    Respawned,
    GameOver { score: u64 },
    Restarted,
    DashStarted,
}

/// Camera shake request that decays linearly to zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenShake {
    pub intensity: f32,
    pub duration_ms: f64,
    pub remaining_ms: f64,
}

impl ScreenShake {
    /// Current magnitude in pixels
    pub fn current(&self) -> f32 {
        if self.remaining_ms <= 0.0 || self.duration_ms <= 0.0 {
            return 0.0;
        }
        self.intensity * (self.remaining_ms / self.duration_ms) as f32
    }

    /// Start a shake unless a stronger one is still running
    pub fn trigger(&mut self, intensity: f32, duration_ms: f64) {
        if intensity >= self.current() {
            self.intensity = intensity;
            self.duration_ms = duration_ms;
            self.remaining_ms = duration_ms;
        }
    }

    pub fn update(&mut self, dt_ms: f64) {
        self.remaining_ms = (self.remaining_ms - dt_ms).max(0.0);
    }
}

/// All entity collections plus the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub player: Player,
    pub bullets: Vec<Bullet>,
    pub enemies: Vec<Enemy>,
    pub asteroids: Vec<Asteroid>,
    pub bosses: Vec<Boss>,
    pub xp_orbs: Vec<XpOrb>,
    pub absorbers: Vec<OrbAbsorber>,
    #[serde(skip)]
    pub particles: Vec<Particle>,
    next_id: EntityId,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            player: Player::new(),
            bullets: Vec::new(),
            enemies: Vec::new(),
            asteroids: Vec::new(),
            bosses: Vec::new(),
            xp_orbs: Vec::new(),
            absorbers: Vec::new(),
            particles: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Drop every inactive entity. Only the orchestrator calls this, after
    /// all systems for the frame have run.
    pub fn compact(&mut self) {
        self.bullets.retain(|b| b.active);
        self.enemies.retain(|e| e.active);
        self.asteroids.retain(|a| a.active);
        self.bosses.retain(|b| b.active);
        for boss in &mut self.bosses {
            boss.satellites.retain(|s| s.active);
        }
        self.xp_orbs.retain(|o| o.active);
        self.absorbers.retain(|a| a.active);
        self.particles.retain(|p| p.active);
    }

    /// Deactivate enemies and bullets within `radius` of `center`
    pub fn clear_around(&mut self, center: Vec2, radius: f32) {
        for enemy in self.enemies.iter_mut().filter(|e| e.pos.distance(center) <= radius) {
            enemy.active = false;
        }
        for bullet in self.bullets.iter_mut().filter(|b| b.pos.distance(center) <= radius) {
            bullet.active = false;
        }
    }

    /// Add a particle burst, dropping whatever exceeds the cap
    pub fn emit_particles(&mut self, pos: Vec2, count: usize, color: &str, max: usize, rng: &mut impl Rng) {
        let room = max.saturating_sub(self.particles.len());
        self.particles
            .extend(particle_burst(pos, count.min(room), color, rng));
    }

    /// Entities other than the player and particles
    pub fn entity_count(&self) -> usize {
        self.bullets.len()
            + self.enemies.len()
            + self.asteroids.len()
            + self.bosses.len()
            + self.xp_orbs.len()
            + self.absorbers.len()
    }
}

/// Snapshot for hosts and logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub phase: GamePhase,
    pub time_ms: f64,
    pub score: u64,
    pub xp: u64,
    pub level: u32,
    pub lives: u32,
    pub enemies: usize,
    pub bosses: usize,
    pub upgrades: Vec<UpgradeSummary>,
}

/// Complete state of one session
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Live tunables, rewritten by upgrade recalculation and resizing
    pub config: GameConfig,
    /// Tunables as loaded, restored on restart
    base_config: GameConfig,
    pub upgrades: UpgradeRegistry,
    pub progression: Progression,
    pub spawner: SpawnDirector,
    pub world: World,
    pub phase: GamePhase,
    /// Options on screen while in `Upgrade`
    pub offers: Vec<UpgradeOffer>,
    /// Simulation clock; advances only while playing
    pub time_ms: f64,
    /// Set while the player waits to respawn
    pub respawn_timer_ms: Option<f64>,
    pub screen_shake: ScreenShake,
    /// Events recorded since the host last drained them
    pub events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let upgrades = UpgradeRegistry::new(&config);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            progression: Progression::new(&config),
            spawner: SpawnDirector::new(&config),
            upgrades,
            base_config: config.clone(),
            config,
            world: World::new(),
            phase: GamePhase::Playing,
            offers: Vec::new(),
            time_ms: 0.0,
            respawn_timer_ms: None,
            screen_shake: ScreenShake::default(),
            events: Vec::new(),
        }
    }

    /// Discard the session and start over with the loaded tunables
    pub fn restart(&mut self) {
        let mut config = self.base_config.clone();
        config.resize(self.config.canvas_width, self.config.canvas_height);
        self.upgrades = UpgradeRegistry::new(&config);
        self.progression = Progression::new(&config);
        self.spawner = SpawnDirector::new(&config);
        self.config = config;
        self.world = World::new();
        self.offers.clear();
        self.time_ms = 0.0;
        self.respawn_timer_ms = None;
        self.screen_shake = ScreenShake::default();
        self.set_phase(GamePhase::Playing);
        self.events.push(GameEvent::Restarted);
        log::info!("Game restarted");
    }

    pub fn set_phase(&mut self, phase: GamePhase) {
        if self.phase != phase {
            log::info!("Phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Host viewport change
    pub fn resize(&mut self, width: f32, height: f32) {
        self.config.resize(width, height);
        self.base_config.resize(width, height);
    }

    /// Enter the upgrade menu with a fresh random draw
    pub fn offer_upgrades(&mut self) {
        self.offers = self.upgrades.random_offers(
            self.config.upgrade_options_count,
            self.config.rare_upgrade_chance,
            &mut self.rng,
        );
        self.set_phase(GamePhase::Upgrade);
    }

    /// Enter the upgrade menu listing every option
    pub fn show_all_upgrades(&mut self) {
        self.offers = self.upgrades.all_offers();
        self.set_phase(GamePhase::Upgrade);
    }

    /// Take the offer at `index` and resume play. Out-of-range indices and
    /// capped upgrades are refused and leave the menu open.
    pub fn select_upgrade(&mut self, index: usize) -> bool {
        if self.phase != GamePhase::Upgrade {
            return false;
        }
        let Some(offer) = self.offers.get(index) else {
            return false;
        };
        let id = offer.id;
        if !self.upgrades.apply(id, &mut self.config) {
            return false;
        }
        self.offers.clear();
        self.set_phase(GamePhase::Playing);
        true
    }

    /// Take every event recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            seed: self.seed,
            phase: self.phase,
            time_ms: self.time_ms,
            score: self.progression.score,
            xp: self.progression.xp,
            level: self.progression.level,
            lives: self.progression.lives,
            enemies: self.world.enemies.len(),
            bosses: self.world.bosses.len(),
            upgrades: self.upgrades.summary(),
        }
    }
}
