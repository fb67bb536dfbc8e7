//! Draw-call seam
//!
//! The simulation never draws. A backend implements `Renderer`; `render_world`
//! walks the active entities back to front and hands each one over with a
//! `Camera` that keeps the player centred on screen.

use glam::Vec2;
use rand::Rng;

use crate::config::GameConfig;
use crate::sim::entities::{Asteroid, Boss, Bullet, Enemy, OrbAbsorber, Particle, Satellite, XpOrb};
use crate::sim::upgrades::{UpgradeOffer, UpgradeSummary};
use crate::sim::{GamePhase, GameState, Player, ScreenShake};

/// World-to-screen transform for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World point at the screen centre (the player)
    pub center: Vec2,
    pub viewport: Vec2,
    /// Screen-space jitter from screen shake
    pub shake: Vec2,
}

impl Camera {
    pub fn new(center: Vec2, viewport: Vec2, shake: Vec2) -> Self {
        Self {
            center,
            viewport,
            shake,
        }
    }

    /// Offset added to world coordinates to get screen coordinates
    pub fn offset(&self) -> Vec2 {
        self.viewport / 2.0 - self.center + self.shake
    }

    pub fn world_to_screen(&self, pos: Vec2) -> Vec2 {
        pos + self.offset()
    }

    /// Whether a circle of `radius` around `pos` touches the screen
    pub fn is_visible(&self, pos: Vec2, radius: f32) -> bool {
        let p = self.world_to_screen(pos);
        p.x + radius >= 0.0
            && p.y + radius >= 0.0
            && p.x - radius <= self.viewport.x
            && p.y - radius <= self.viewport.y
    }
}

/// Random jitter of the shake's current magnitude
pub fn shake_offset(shake: &ScreenShake, rng: &mut impl Rng) -> Vec2 {
    let magnitude = shake.current();
    if magnitude <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        (rng.random::<f32>() - 0.5) * 2.0 * magnitude,
        (rng.random::<f32>() - 0.5) * 2.0 * magnitude,
    )
}

/// Parse `#rgb` or `#rrggbb` into linear RGBA; unknown input is white
pub fn parse_color(hex: &str) -> [f32; 4] {
    let digits = hex.trim_start_matches('#');
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_owned(),
        _ => return [1.0; 4],
    };
    let channel = |i: usize| {
        expanded
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(|v| v as f32 / 255.0)
    };
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => [r, g, b, 1.0],
        _ => [1.0; 4],
    }
}

/// Numbers the overlay shows
#[derive(Debug, Clone, PartialEq)]
pub struct Hud<'a> {
    pub phase: GamePhase,
    pub score: u64,
    pub level: u32,
    /// (earned, needed) within the current level
    pub level_progress: (u64, u64),
    pub lives: u32,
    /// 1.0 when dash is ready
    pub dash_charge: f32,
    pub respawning: bool,
    pub offers: &'a [UpgradeOffer],
    pub upgrades: Vec<UpgradeSummary>,
}

impl<'a> Hud<'a> {
    pub fn from_state(state: &'a GameState) -> Self {
        let config = &state.config;
        let player = &state.world.player;
        let dash_charge = if config.dash_cooldown_ms > 0.0 {
            (1.0 - player.dash_cooldown_ms / config.dash_cooldown_ms).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
        Self {
            phase: state.phase,
            score: state.progression.score,
            level: state.progression.level,
            level_progress: state.progression.level_progress(config),
            lives: state.progression.lives,
            dash_charge,
            respawning: state.respawn_timer_ms.is_some(),
            offers: &state.offers,
            upgrades: state.upgrades.summary(),
        }
    }
}

/// Rendering backend. Implementations cull off-screen entities themselves
/// (see `Camera::is_visible`) and must not touch simulation state.
pub trait Renderer {
    fn begin_frame(&mut self, _camera: &Camera) {}
    fn draw_absorber(&mut self, absorber: &OrbAbsorber, camera: &Camera, config: &GameConfig);
    fn draw_xp_orb(&mut self, orb: &XpOrb, camera: &Camera);
    fn draw_particle(&mut self, particle: &Particle, camera: &Camera);
    fn draw_bullet(&mut self, bullet: &Bullet, camera: &Camera, config: &GameConfig);
    fn draw_enemy(&mut self, enemy: &Enemy, camera: &Camera);
    fn draw_asteroid(&mut self, asteroid: &Asteroid, camera: &Camera, config: &GameConfig);
    fn draw_boss(&mut self, boss: &Boss, camera: &Camera);
    fn draw_satellite(&mut self, satellite: &Satellite, camera: &Camera);
    fn draw_player(&mut self, player: &Player, camera: &Camera, config: &GameConfig);
    fn draw_hud(&mut self, _hud: &Hud<'_>) {}
    fn end_frame(&mut self) {}
}

/// Draw one frame. Inactive entities are skipped; the dead player is not drawn.
pub fn render_world<R: Renderer + ?Sized>(renderer: &mut R, state: &GameState, shake: Vec2) {
    let config = &state.config;
    let world = &state.world;
    let camera = Camera::new(
        world.player.pos,
        Vec2::new(config.canvas_width, config.canvas_height),
        shake,
    );

    renderer.begin_frame(&camera);
    for absorber in world.absorbers.iter().filter(|a| a.is_available()) {
        renderer.draw_absorber(absorber, &camera, config);
    }
    for orb in world.xp_orbs.iter().filter(|o| o.is_available()) {
        renderer.draw_xp_orb(orb, &camera);
    }
    for particle in world.particles.iter().filter(|p| p.active) {
        renderer.draw_particle(particle, &camera);
    }
    for bullet in world.bullets.iter().filter(|b| b.active) {
        renderer.draw_bullet(bullet, &camera, config);
    }
    for enemy in world.enemies.iter().filter(|e| e.active) {
        renderer.draw_enemy(enemy, &camera);
    }
    for asteroid in world.asteroids.iter().filter(|a| a.active) {
        renderer.draw_asteroid(asteroid, &camera, config);
    }
    for boss in world.bosses.iter().filter(|b| b.active) {
        renderer.draw_boss(boss, &camera);
        for satellite in boss.satellites.iter().filter(|s| s.active) {
            renderer.draw_satellite(satellite, &camera);
        }
    }
    if world.player.alive {
        renderer.draw_player(&world.player, &camera, config);
    }
    renderer.draw_hud(&Hud::from_state(state));
    renderer.end_frame();
}
