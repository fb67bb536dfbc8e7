//! Pulse Survivor headless driver
//!
//! Runs the simulation at a fixed host frame rate with a scripted autopilot
//! at the controls, then prints the run summary as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use pulse_survivor::GameConfig;
use pulse_survivor::audio::{AudioDirector, LogSink};
use pulse_survivor::input::{InputState, Key};
use pulse_survivor::render::{Camera, Hud, Renderer, render_world, shake_offset};
use pulse_survivor::sim::entities::{
    Asteroid, Boss, Bullet, Enemy, OrbAbsorber, Particle, Satellite, XpOrb,
};
use pulse_survivor::sim::{FrameClock, GameEvent, GamePhase, GameState, Player};

#[derive(Parser, Debug)]
#[command(name = "pulse-survivor", about = "Run a headless Pulse Survivor session")]
struct Args {
    /// RNG seed for the run
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Simulated seconds of host time
    #[arg(long, default_value_t = 120.0)]
    seconds: f64,

    /// Host frame rate
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// JSON file with tunables to override
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long)]
    width: Option<f32>,

    /// Viewport height in pixels
    #[arg(long)]
    height: Option<f32>,

    /// Start a new run instead of stopping at game over
    #[arg(long)]
    keep_playing: bool,
}

/// Steers away from the closest threat and picks the first upgrade offered
#[derive(Debug, Default)]
struct Autopilot {
    held: Vec<Key>,
}

impl Autopilot {
    /// Distance under which a threat triggers a dash
    const PANIC_RANGE: f32 = 120.0;

    fn drive(&mut self, input: &mut InputState, state: &GameState) {
        match state.phase {
            GamePhase::Upgrade => {
                self.release_all(input);
                input.key_down(Key::Digit(1));
                input.key_up(Key::Digit(1));
            }
            GamePhase::Playing => self.steer(input, state),
            _ => self.release_all(input),
        }
    }

    fn steer(&mut self, input: &mut InputState, state: &GameState) {
        let player = state.world.player.pos;
        let threat = state
            .world
            .enemies
            .iter()
            .filter(|e| e.active)
            .map(|e| e.pos)
            .chain(state.world.bosses.iter().filter(|b| b.active).map(|b| b.pos))
            .min_by(|a, b| a.distance_squared(player).total_cmp(&b.distance_squared(player)));

        // Orbit slowly when nothing is near, so the spawner sees movement
        let away = match threat {
            Some(pos) if pos.distance(player) < 400.0 => (player - pos).normalize_or_zero(),
            _ => Vec2::from_angle(state.time_ms as f32 / 4000.0),
        };

        let mut wanted = Vec::new();
        if away.x < -0.3 {
            wanted.push(Key::A);
        }
        if away.x > 0.3 {
            wanted.push(Key::D);
        }
        if away.y < -0.3 {
            wanted.push(Key::W);
        }
        if away.y > 0.3 {
            wanted.push(Key::S);
        }
        if threat.is_some_and(|pos| pos.distance(player) < Self::PANIC_RANGE) {
            input.key_down(Key::Space);
            input.key_up(Key::Space);
        }

        for key in self.held.drain(..) {
            if !wanted.contains(&key) {
                input.key_up(key);
            }
        }
        for &key in &wanted {
            input.key_down(key);
        }
        self.held = wanted;
    }

    fn release_all(&mut self, input: &mut InputState) {
        for key in self.held.drain(..) {
            input.key_up(key);
        }
    }
}

/// Renderer that only counts what would be drawn on screen
#[derive(Debug, Default)]
struct DrawCounter {
    frames: u64,
    draws: u64,
    culled: u64,
}

impl DrawCounter {
    fn count(&mut self, camera: &Camera, pos: Vec2, radius: f32) {
        if camera.is_visible(pos, radius) {
            self.draws += 1;
        } else {
            self.culled += 1;
        }
    }
}

impl Renderer for DrawCounter {
    fn draw_absorber(&mut self, absorber: &OrbAbsorber, camera: &Camera, config: &GameConfig) {
        self.count(camera, absorber.pos, config.orb_absorber_collection_radius);
    }
    fn draw_xp_orb(&mut self, orb: &XpOrb, camera: &Camera) {
        self.count(camera, orb.pos, orb.size);
    }
    fn draw_particle(&mut self, particle: &Particle, camera: &Camera) {
        self.count(camera, particle.pos, particle.size);
    }
    fn draw_bullet(&mut self, bullet: &Bullet, camera: &Camera, config: &GameConfig) {
        self.count(camera, bullet.pos, config.bullet_size);
    }
    fn draw_enemy(&mut self, enemy: &Enemy, camera: &Camera) {
        self.count(camera, enemy.pos, enemy.radius());
    }
    fn draw_asteroid(&mut self, asteroid: &Asteroid, camera: &Camera, _config: &GameConfig) {
        self.count(camera, asteroid.pos, asteroid.size);
    }
    fn draw_boss(&mut self, boss: &Boss, camera: &Camera) {
        self.count(camera, boss.pos, boss.size);
    }
    fn draw_satellite(&mut self, satellite: &Satellite, camera: &Camera) {
        self.count(camera, satellite.pos, satellite.size);
    }
    fn draw_player(&mut self, player: &Player, camera: &Camera, config: &GameConfig) {
        self.count(camera, player.pos, config.player_size);
    }
    fn draw_hud(&mut self, hud: &Hud<'_>) {
        if hud.phase == GamePhase::Upgrade {
            log::debug!("Upgrade menu: {} offers", hud.offers.len());
        }
    }
    fn end_frame(&mut self) {
        self.frames += 1;
    }
}

fn load_config(args: &Args) -> Result<GameConfig, pulse_survivor::ConfigError> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if args.width.is_some() || args.height.is_some() {
        let width = args.width.unwrap_or(config.canvas_width);
        let height = args.height.unwrap_or(config.canvas_height);
        config.resize(width, height);
    }
    Ok(config)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    log::info!("Pulse Survivor (headless) starting, seed {}", args.seed);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            log::error!("Failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    if !(args.fps > 0.0) {
        log::error!("--fps must be positive, got {}", args.fps);
        return ExitCode::FAILURE;
    }

    let viewport = Vec2::new(config.canvas_width, config.canvas_height);
    let mut state = GameState::new(config, args.seed);
    let mut clock = FrameClock::new();
    let mut input = InputState::new(viewport);
    let mut autopilot = Autopilot::default();
    let mut audio = AudioDirector::new(Box::new(LogSink::default()));
    let mut renderer = DrawCounter::default();
    // Cosmetic randomness stays off the simulation RNG
    let mut fx_rng = Pcg32::seed_from_u64(args.seed ^ 0x5eed);

    let frame_ms = 1000.0 / args.fps;
    let frames = (args.seconds * args.fps).ceil() as u64;
    let mut runs = 1u32;

    for _ in 0..frames {
        autopilot.drive(&mut input, &state);
        if state.phase == GamePhase::GameOver && args.keep_playing {
            input.key_down(Key::R);
            input.key_up(Key::R);
        }

        let tick_input = input.to_tick_input(state.phase, state.offers.len());
        clock.advance(&mut state, &tick_input, frame_ms);
        input.end_frame();

        let events = state.drain_events();
        audio.handle_events(&events, state.time_ms);
        for event in &events {
            match event {
                GameEvent::Restarted => runs += 1,
                GameEvent::ExtraLife { lives } => log::info!("Extra life, {lives} lives"),
                _ => {}
            }
        }

        let shake = shake_offset(&state.screen_shake, &mut fx_rng);
        render_world(&mut renderer, &state, shake);

        if state.phase == GamePhase::GameOver && !args.keep_playing {
            break;
        }
    }

    log::info!(
        "Rendered {} frames ({} draws, {} culled) over {} run(s)",
        renderer.frames,
        renderer.draws,
        renderer.culled,
        runs
    );

    match serde_json::to_string_pretty(&state.summary()) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("Failed to serialize summary: {err}");
            ExitCode::FAILURE
        }
    }
}
