//! Per-frame orchestration
//!
//! `tick` advances the game by one fixed step: phase handling first, then
//! (only while playing) player, bullets, enemies, spawners, collisions,
//! rewards, pickups and progression, and finally one compaction pass.

use glam::Vec2;

use super::collision::{KillKind, collect_absorbers, collect_orbs, resolve_collisions};
use super::entities::{BulletTraits, XpOrb};
use super::player::PlayerControls;
use super::state::{GameEvent, GamePhase, GameState};
use crate::consts::{MAX_FRAME_MS, MAX_SUBSTEPS, SIM_DT_MS};

/// Particles for a regular kill
const KILL_PARTICLES: usize = 8;
const BOSS_KILL_PARTICLES: usize = 20;
const DEATH_PARTICLES: usize = 30;
const DEATH_PARTICLE_COLOR: &str = "#ffffff";

/// Input for a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Movement intent, length at most 1
    pub movement: Vec2,
    /// Absolute facing (mouse or right stick)
    pub look: Option<f32>,
    /// Relative facing change (Q/E)
    pub turn: f32,
    pub dash: bool,
    pub pause: bool,
    pub restart: bool,
    /// Index into the current upgrade offers
    pub select_upgrade: Option<usize>,
    /// Debug: spawn a boss now
    pub spawn_boss: bool,
    /// Debug: open the upgrade menu with every option
    pub show_all_upgrades: bool,
}

impl TickInput {
    /// Fold a newer input into this one: held state is replaced, one-shot
    /// triggers accumulate until a tick consumes them
    pub fn merge(&mut self, newer: &TickInput) {
        self.movement = newer.movement;
        self.look = newer.look;
        self.turn += newer.turn;
        self.dash |= newer.dash;
        self.pause |= newer.pause;
        self.restart |= newer.restart;
        self.select_upgrade = newer.select_upgrade.or(self.select_upgrade);
        self.spawn_boss |= newer.spawn_boss;
        self.show_all_upgrades |= newer.show_all_upgrades;
    }

    /// Clear one-shot triggers after a tick has seen them
    pub fn clear_triggers(&mut self) {
        self.turn = 0.0;
        self.dash = false;
        self.pause = false;
        self.restart = false;
        self.select_upgrade = None;
        self.spawn_boss = false;
        self.show_all_upgrades = false;
    }

    fn controls(&self) -> PlayerControls {
        PlayerControls {
            movement: self.movement,
            look: self.look,
            turn: self.turn,
            dash: self.dash,
        }
    }
}

/// Advance the game state by one step of `dt_ms`
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: f64) {
    if input.restart {
        state.restart();
        return;
    }

    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.set_phase(GamePhase::Paused);
                return;
            }
            GamePhase::Paused => {
                state.set_phase(GamePhase::Playing);
                return;
            }
            _ => {}
        }
    }

    match state.phase {
        GamePhase::Paused | GamePhase::GameOver => {}
        GamePhase::Upgrade => {
            if let Some(index) = input.select_upgrade {
                state.select_upgrade(index);
            }
        }
        GamePhase::Playing => step_playing(state, input, dt_ms),
    }
}

fn step_playing(state: &mut GameState, input: &TickInput, dt_ms: f64) {
    state.time_ms += dt_ms;
    let now = state.time_ms;
    let frames = (dt_ms / SIM_DT_MS) as f32;
    state.screen_shake.update(dt_ms);

    if input.show_all_upgrades {
        state.show_all_upgrades();
        return;
    }
    if input.spawn_boss {
        state
            .spawner
            .spawn_boss(&mut state.world, &state.config, &mut state.rng, now);
    }

    let config = &state.config;
    let world = &mut state.world;

    if world.player.alive && world.player.burst_ready(now, config) {
        let traits = BulletTraits {
            pierce_count: state.upgrades.pierce_count(),
            can_split: state.upgrades.bullets_split(),
            split_generation: 0,
            homing: state.upgrades.burst_homing(),
        };
        let burst = world.player.fire_burst(traits, now, config);
        log::debug!("Burst of {} bullets", burst.len());
        world.bullets.extend(burst);
    }

    if world.player.update(&input.controls(), dt_ms, now, config) {
        state.events.push(GameEvent::DashStarted);
        state.screen_shake.trigger(
            config.screen_shake_intensity * 0.4,
            config.screen_shake_duration_ms * 0.3,
        );
    }
    let player_pos = world.player.pos;

    for bullet in world.bullets.iter_mut() {
        bullet.update(frames, now, player_pos, &world.enemies, config);
    }
    for particle in world.particles.iter_mut() {
        particle.update(frames);
    }
    for enemy in world.enemies.iter_mut() {
        enemy.update(player_pos, dt_ms as f32, frames);
    }

    state
        .spawner
        .update(world, &state.upgrades, config, &mut state.rng, now);

    let kills = resolve_collisions(world, config, now);
    let mut regular_kills = 0u32;
    for kill in &kills {
        match kill.kind {
            KillKind::Boss => {
                state
                    .progression
                    .add_score(config.score_per_kill * config.boss_score_multiplier);
                world.xp_orbs.push(XpOrb::new(
                    kill.pos,
                    config.xp_per_kill * config.boss_xp_multiplier,
                    config.boss_xp_orb_size,
                ));
                world.emit_particles(kill.pos, BOSS_KILL_PARTICLES, &kill.color, config.max_particles, &mut state.rng);
                state.screen_shake.trigger(
                    config.screen_shake_intensity * 2.0,
                    config.screen_shake_duration_ms * 2.0,
                );
                state.events.push(GameEvent::BossDestroyed { pos: kill.pos });
                log::info!("Boss destroyed at {}", kill.pos);
            }
            KillKind::Enemy | KillKind::Satellite => {
                regular_kills += 1;
                state.progression.add_score(config.score_per_kill);
                world
                    .xp_orbs
                    .push(XpOrb::new(kill.pos, config.xp_per_kill, config.xp_orb_size));
                world.emit_particles(kill.pos, KILL_PARTICLES, &kill.color, config.max_particles, &mut state.rng);
                state.events.push(GameEvent::EnemyDestroyed { pos: kill.pos });
            }
            KillKind::Asteroid => {
                world.emit_particles(kill.pos, KILL_PARTICLES, &kill.color, config.max_particles, &mut state.rng);
            }
        }
    }
    if regular_kills > 1 {
        let base = config.screen_shake_intensity;
        state.screen_shake.trigger(
            (base * 0.2 * regular_kills as f32).min(base * 0.5),
            config.screen_shake_duration_ms * 0.5,
        );
    }

    for orb in world.xp_orbs.iter_mut() {
        orb.update(player_pos, &world.absorbers, frames, config);
    }
    for absorber in world.absorbers.iter_mut() {
        absorber.update(dt_ms, now, config.orb_absorber_lifespan_ms);
        let id = absorber.id;
        absorber.is_collecting = absorber.is_available()
            && world
                .xp_orbs
                .iter()
                .any(|o| o.is_available() && o.absorber == Some(id));
    }

    let despawn_range = config.viewport_extent() * config.asteroid_despawn_factor;
    for asteroid in world.asteroids.iter_mut() {
        asteroid.update(frames, now, config.asteroid_trail_ms);
        if asteroid.pos.distance(player_pos) >= despawn_range {
            asteroid.active = false;
        }
    }
    for boss in world.bosses.iter_mut() {
        boss.update(player_pos, frames, now, config);
    }

    let absorbed = collect_absorbers(world, config);
    if absorbed > 0 {
        state.screen_shake.trigger(
            config.screen_shake_intensity * 1.5,
            config.screen_shake_duration_ms * 1.5,
        );
    }
    let collected = absorbed + collect_orbs(world, config);

    let change = state.progression.add_xp(collected, config);
    if change.leveled_up() {
        log::info!("Level up: {} -> {}", change.from, change.to);
        state.screen_shake.trigger(config.screen_shake_intensity, config.screen_shake_duration_ms);
        state.events.push(GameEvent::LevelUp { level: change.to });
        if change.lives_gained > 0 {
            state.screen_shake.trigger(
                config.screen_shake_intensity * 1.5,
                config.screen_shake_duration_ms * 1.5,
            );
            state.events.push(GameEvent::ExtraLife {
                lives: state.progression.lives,
            });
        }
    }

    if change.leveled_up() {
        state.offer_upgrades();
    } else {
        // A death in the same frame as a level-up waits for the menu to close
        handle_death(state, dt_ms);
    }
    state.world.compact();
}

/// Start the respawn timer or end the run when the player has just died;
/// count the timer down and bring the player back when it expires
fn handle_death(state: &mut GameState, dt_ms: f64) {
    let config = &state.config;

    if !state.world.player.alive && state.respawn_timer_ms.is_none() {
        let lives_left = state.progression.lose_life();
        let pos = state.world.player.pos;
        state
            .world
            .emit_particles(pos, DEATH_PARTICLES, DEATH_PARTICLE_COLOR, config.max_particles, &mut state.rng);
        state.screen_shake.trigger(
            config.screen_shake_intensity * 2.0,
            config.screen_shake_duration_ms * 2.0,
        );
        state.events.push(GameEvent::PlayerDied { lives_left });

        if lives_left > 0 {
            log::info!("Player died, {lives_left} lives left");
            state.respawn_timer_ms = Some(config.respawn_delay_ms);
        } else {
            let score = state.progression.score;
            log::info!("Game over, final score {score}");
            state.events.push(GameEvent::GameOver { score });
            state.set_phase(GamePhase::GameOver);
            return;
        }
    }

    if let Some(remaining) = state.respawn_timer_ms {
        let remaining = remaining - dt_ms;
        if remaining > 0.0 {
            state.respawn_timer_ms = Some(remaining);
        } else {
            state.respawn_timer_ms = None;
            respawn_player(state);
        }
    }
}

fn respawn_player(state: &mut GameState) {
    let radius = state.config.respawn_safety_radius;
    let death_pos = state.world.player.pos;
    state.world.clear_around(death_pos, radius);
    state.world.player.respawn();
    let spawn_pos = state.world.player.pos;
    state.world.clear_around(spawn_pos, radius);
    state.events.push(GameEvent::Respawned);
    log::info!("Player respawned");
}

/// Fixed-step accumulator between the host frame callback and `tick`
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    accumulator_ms: f64,
    /// Input carried until a tick consumes its triggers
    pending: TickInput,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one host frame. Runs zero or more fixed ticks and returns how many.
    pub fn advance(&mut self, state: &mut GameState, input: &TickInput, frame_ms: f64) -> u32 {
        self.pending.merge(input);
        self.accumulator_ms += frame_ms.clamp(0.0, MAX_FRAME_MS);

        let mut substeps = 0;
        while self.accumulator_ms >= SIM_DT_MS && substeps < MAX_SUBSTEPS {
            tick(state, &self.pending, SIM_DT_MS);
            self.pending.clear_triggers();
            self.accumulator_ms -= SIM_DT_MS;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS {
            // Drop the backlog rather than spiral
            self.accumulator_ms = self.accumulator_ms.min(SIM_DT_MS);
        }
        substeps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::progression::xp_for_level;
    use crate::sim::upgrades::UpgradeId;

    fn new_game() -> GameState {
        GameState::new(GameConfig::default(), 42)
    }

    fn step(state: &mut GameState, input: &TickInput) {
        tick(state, input, SIM_DT_MS);
    }

    fn idle(state: &mut GameState, frames: usize) {
        for _ in 0..frames {
            step(state, &TickInput::default());
        }
    }

    /// Drop an orb on the player so the next tick collects it
    fn feed_xp(state: &mut GameState, xp: u64) {
        let pos = state.world.player.pos;
        state.world.xp_orbs.push(XpOrb::new(pos, xp, 6.0));
    }

    fn kill_player(state: &mut GameState) {
        state.world.player.alive = false;
    }

    #[test]
    fn test_pause_toggles_and_freezes_clock() {
        let mut state = new_game();
        idle(&mut state, 3);
        let t = state.time_ms;

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        step(&mut state, &pause);
        assert_eq!(state.phase, GamePhase::Paused);
        idle(&mut state, 10);
        assert_eq!(state.time_ms, t);

        step(&mut state, &pause);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_level_up_then_select_upgrade() {
        let mut state = new_game();
        assert_eq!(
            (state.progression.lives, state.progression.level, state.progression.xp),
            (3, 1, 0)
        );

        let needed = xp_for_level(1, &state.config);
        feed_xp(&mut state, needed);
        step(&mut state, &TickInput::default());
        assert_eq!(state.phase, GamePhase::Upgrade);
        assert_eq!(state.progression.level, 2);
        assert!(!state.offers.is_empty());
        assert!(state.events.contains(&GameEvent::LevelUp { level: 2 }));

        let chosen = state.offers[0].id;
        let before = state.upgrades.level(chosen);
        step(
            &mut state,
            &TickInput {
                select_upgrade: Some(0),
                ..Default::default()
            },
        );
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.upgrades.level(chosen), before + 1);
    }

    #[test]
    fn test_upgrade_phase_freezes_simulation() {
        let mut state = new_game();
        feed_xp(&mut state, 10_000);
        step(&mut state, &TickInput::default());
        assert_eq!(state.phase, GamePhase::Upgrade);
        let t = state.time_ms;
        let enemies = state.world.enemies.len();
        idle(&mut state, 200);
        assert_eq!(state.time_ms, t);
        assert_eq!(state.world.enemies.len(), enemies);
    }

    #[test]
    fn test_far_asteroids_despawn() {
        use crate::sim::entities::Asteroid;
        use rand::SeedableRng;

        let mut state = new_game();
        let mut rng = rand_pcg::Pcg32::seed_from_u64(9);
        let range = state.config.viewport_extent() * state.config.asteroid_despawn_factor;
        let near = Asteroid::new(Vec2::new(0.0, 600.0), Vec2::new(0.0, 1200.0), &state.config, &mut rng);
        let far = Asteroid::new(
            Vec2::new(range + 100.0, 0.0),
            Vec2::new(range + 500.0, 0.0),
            &state.config,
            &mut rng,
        );
        state.world.asteroids.push(near);
        state.world.asteroids.push(far);

        step(&mut state, &TickInput::default());
        assert_eq!(state.world.asteroids.len(), 1);
        assert!(state.world.asteroids[0].pos.distance(state.world.player.pos) < range);
    }

    #[test]
    fn test_death_respawn_cycle() {
        let mut state = new_game();
        idle(&mut state, 1);
        state.world.player.pos = Vec2::new(300.0, 0.0);
        kill_player(&mut state);
        step(&mut state, &TickInput::default());

        assert_eq!(state.progression.lives, 2);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.respawn_timer_ms.is_some());
        assert!(!state.world.player.alive);

        let frames = (state.config.respawn_delay_ms / SIM_DT_MS).ceil() as usize + 1;
        idle(&mut state, frames);
        assert!(state.world.player.alive);
        assert_eq!(state.world.player.pos, Vec2::ZERO);
        assert!(state.respawn_timer_ms.is_none());
        assert!(state.events.contains(&GameEvent::Respawned));
    }

    #[test]
    fn test_respawn_clears_safety_radius() {
        let mut state = new_game();
        idle(&mut state, 1);
        kill_player(&mut state);
        step(&mut state, &TickInput::default());

        let def = state.config.enemy_type(crate::EnemyKind::Basic).unwrap().clone();
        let near = state.world.next_entity_id();
        let far = state.world.next_entity_id();
        state
            .world
            .enemies
            .push(crate::sim::entities::Enemy::new(near, Vec2::new(50.0, 0.0), &def, &mut state.rng));
        let mut distant = crate::sim::entities::Enemy::new(far, Vec2::new(5000.0, 0.0), &def, &mut state.rng);
        distant.speed = 0.0;
        state.world.enemies.push(distant);

        state.respawn_timer_ms = Some(1.0);
        step(&mut state, &TickInput::default());
        assert!(state.world.player.alive);
        assert!(state.world.enemies.iter().all(|e| e.id != near));
        assert!(state.world.enemies.iter().any(|e| e.id == far));
    }

    #[test]
    fn test_game_over_and_restart() {
        let mut state = new_game();
        idle(&mut state, 1);

        let respawn_frames = (state.config.respawn_delay_ms / SIM_DT_MS).ceil() as usize + 1;
        for _ in 0..3 {
            assert!(state.world.player.alive);
            kill_player(&mut state);
            step(&mut state, &TickInput::default());
            if state.progression.lives > 0 {
                idle(&mut state, respawn_frames);
            }
        }
        assert_eq!(state.progression.lives, 0);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.events.iter().any(|e| matches!(e, GameEvent::GameOver { .. })));

        // Game over ignores everything but restart
        let t = state.time_ms;
        idle(&mut state, 10);
        assert_eq!(state.time_ms, t);

        step(
            &mut state,
            &TickInput {
                restart: true,
                ..Default::default()
            },
        );
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.progression.score, 0);
        assert_eq!(state.progression.xp, 0);
        assert_eq!(state.progression.level, 1);
        assert_eq!(state.progression.lives, 3);
        assert_eq!(state.world.entity_count(), 0);
        assert!(state.world.particles.is_empty());
        assert_eq!(state.time_ms, 0.0);
    }

    #[test]
    fn test_kill_rewards() {
        let mut state = new_game();
        idle(&mut state, 1);
        state.world.bullets.clear();
        let def = state.config.enemy_type(crate::EnemyKind::Basic).unwrap().clone();
        let id = state.world.next_entity_id();
        let pos = Vec2::new(200.0, 0.0);
        let mut enemy = crate::sim::entities::Enemy::new(id, pos, &def, &mut state.rng);
        enemy.speed = 0.0;
        state.world.enemies.push(enemy);
        state.world.bullets.push(crate::sim::entities::Bullet::new(
            pos,
            0.0,
            0.0,
            BulletTraits::default(),
            state.time_ms,
        ));

        let score = state.progression.score;
        step(&mut state, &TickInput::default());
        assert_eq!(state.progression.score, score + state.config.score_per_kill);
        assert!(state
            .world
            .xp_orbs
            .iter()
            .any(|o| o.xp == state.config.xp_per_kill && o.pos == pos));
        assert!(state
            .events
            .contains(&GameEvent::EnemyDestroyed { pos }));
    }

    #[test]
    fn test_first_burst_fires_on_first_tick() {
        let mut state = new_game();
        step(&mut state, &TickInput::default());
        assert!(state.world.bullets.len() >= state.config.burst_bullet_count as usize);
        assert!(state.world.player.last_burst_at_ms.is_some());
    }

    #[test]
    fn test_debug_show_all_and_spawn_boss() {
        let mut state = new_game();
        step(
            &mut state,
            &TickInput {
                spawn_boss: true,
                ..Default::default()
            },
        );
        assert_eq!(state.world.bosses.len(), 1);

        step(
            &mut state,
            &TickInput {
                show_all_upgrades: true,
                ..Default::default()
            },
        );
        assert_eq!(state.phase, GamePhase::Upgrade);
        assert_eq!(state.offers.len(), crate::sim::upgrades::OPTIONS.len());

        step(
            &mut state,
            &TickInput {
                select_upgrade: Some(UpgradeId::HomingBurst as usize),
                ..Default::default()
            },
        );
        assert!(state.upgrades.burst_homing());
    }

    #[test]
    fn test_frame_clock_substeps_and_carries_triggers() {
        let mut state = new_game();
        let mut clock = FrameClock::new();
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };

        // Too short for a tick: the pause waits for the next one
        assert_eq!(clock.advance(&mut state, &pause, 5.0), 0);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(clock.advance(&mut state, &TickInput::default(), 12.0), 1);
        assert_eq!(state.phase, GamePhase::Paused);

        // Huge frames are clamped, and the trigger is not replayed per substep
        let ticks = clock.advance(&mut state, &pause, 10_000.0);
        assert!(ticks <= MAX_SUBSTEPS);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_long_autoplay_keeps_invariants() {
        let mut state = new_game();
        for frame in 0..(60 * 90) {
            let angle = frame as f32 * 0.01;
            let input = TickInput {
                movement: Vec2::new(angle.cos(), angle.sin()),
                dash: frame % 240 == 0,
                select_upgrade: Some(0),
                ..Default::default()
            };
            step(&mut state, &input);
            if state.phase == GamePhase::GameOver {
                break;
            }
            assert!(state.world.player.speed() <= state.world.player.max_speed(&state.config) + 1e-3);
            assert!(state.world.bullets.iter().all(|b| b.active));
            assert!(state.world.particles.len() <= state.config.max_particles);
            assert!(state.world.bullets.iter().all(|b| b.split_generation <= state.config.max_split_generation));
        }
    }
}
