//! Collision resolution
//!
//! Every test is circle against circle. Resolution mutates hp and `active`
//! flags in place and reports kills; nothing is removed from a collection
//! here. Bullets spawned by splits are appended after the bullet pass, so
//! they are first tested next frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entities::Bullet;
use super::state::World;
use crate::config::GameConfig;

/// What was destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillKind {
    Enemy,
    Satellite,
    Boss,
    /// Cosmetic only: no score, no XP
    Asteroid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillEvent {
    pub pos: Vec2,
    pub color: String,
    pub kind: KillKind,
}

impl KillEvent {
    pub fn is_boss(&self) -> bool {
        self.kind == KillKind::Boss
    }

    /// Kills that pay out score and an XP orb at normal rate
    pub fn is_regular(&self) -> bool {
        matches!(self.kind, KillKind::Enemy | KillKind::Satellite)
    }
}

#[inline]
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    a.distance(b) < radius_a + radius_b
}

fn split_on_hit(bullet: &Bullet, config: &GameConfig, now_ms: f64, spawned: &mut Vec<Bullet>) {
    if bullet.can_split_further(config.max_split_generation) {
        spawned.extend(bullet.split_children(config.split_angle, config.bullet_speed, now_ms));
    }
}

/// Resolve one frame of combat contacts.
///
/// Order: dash kills, then each bullet against asteroids, bosses and their
/// satellites, enemies (first category hit wins), then lethal contact
/// against the player when not dashing.
pub fn resolve_collisions(world: &mut World, config: &GameConfig, now_ms: f64) -> Vec<KillEvent> {
    let World {
        player,
        bullets,
        enemies,
        asteroids,
        bosses,
        ..
    } = world;
    let mut kills = Vec::new();
    let player_radius = config.player_size;

    if player.alive && player.is_dashing {
        for enemy in enemies.iter_mut().filter(|e| e.active) {
            if circles_overlap(player.pos, player_radius, enemy.pos, enemy.radius()) {
                enemy.active = false;
                kills.push(KillEvent {
                    pos: enemy.pos,
                    color: enemy.color.clone(),
                    kind: KillKind::Enemy,
                });
            }
        }
    }

    let bullet_radius = config.bullet_size;
    let mut spawned = Vec::new();

    'bullets: for bullet in bullets.iter_mut().filter(|b| b.active) {
        // Asteroids stop every bullet
        if let Some(asteroid) = asteroids
            .iter_mut()
            .find(|a| a.active && circles_overlap(bullet.pos, bullet_radius, a.pos, a.size))
        {
            asteroid.hp -= 1;
            if asteroid.hp <= 0 {
                asteroid.active = false;
                kills.push(KillEvent {
                    pos: asteroid.pos,
                    color: config.asteroid_color.clone(),
                    kind: KillKind::Asteroid,
                });
            }
            split_on_hit(bullet, config, now_ms, &mut spawned);
            bullet.active = false;
            continue;
        }

        for boss in bosses.iter_mut().filter(|b| b.active) {
            if circles_overlap(bullet.pos, bullet_radius, boss.pos, boss.size) {
                boss.hp -= 1;
                if boss.hp <= 0 {
                    boss.active = false;
                    kills.push(KillEvent {
                        pos: boss.pos,
                        color: boss.color.clone(),
                        kind: KillKind::Boss,
                    });
                }
                split_on_hit(bullet, config, now_ms, &mut spawned);
                bullet.active = false;
                continue 'bullets;
            }

            if let Some(satellite) = boss
                .satellites
                .iter_mut()
                .find(|s| s.active && circles_overlap(bullet.pos, bullet_radius, s.pos, s.size))
            {
                satellite.hp -= 1;
                if satellite.hp <= 0 {
                    satellite.active = false;
                    kills.push(KillEvent {
                        pos: satellite.pos,
                        color: satellite.color.clone(),
                        kind: KillKind::Satellite,
                    });
                }
                split_on_hit(bullet, config, now_ms, &mut spawned);
                bullet.active = false;
                continue 'bullets;
            }
        }

        let Some(enemy) = enemies.iter_mut().find(|e| {
            e.active
                && !bullet.enemies_hit.contains(&e.id)
                && circles_overlap(bullet.pos, bullet_radius, e.pos, e.radius())
        }) else {
            continue;
        };

        bullet.enemies_hit.insert(enemy.id);
        enemy.hp -= 1;
        if enemy.hp <= 0 {
            enemy.active = false;
            kills.push(KillEvent {
                pos: enemy.pos,
                color: enemy.color.clone(),
                kind: KillKind::Enemy,
            });
        }
        split_on_hit(bullet, config, now_ms, &mut spawned);
        if bullet.can_split || bullet.hits_landed() > bullet.pierce_count {
            bullet.active = false;
        }
    }
    bullets.extend(spawned);

    if player.alive && !player.is_dashing {
        let touching = |pos: Vec2, radius: f32| circles_overlap(player.pos, player_radius, pos, radius);
        let hit = enemies.iter().any(|e| e.active && touching(e.pos, e.radius()))
            || bosses.iter().filter(|b| b.active).any(|b| {
                touching(b.pos, b.size)
                    || b.satellites.iter().any(|s| s.active && touching(s.pos, s.size))
            })
            || asteroids.iter().any(|a| a.active && touching(a.pos, a.size));
        if hit {
            player.alive = false;
        }
    }

    kills
}

/// Touching an absorber sweeps up every orb inside its collection radius.
/// Returns the XP collected.
pub fn collect_absorbers(world: &mut World, config: &GameConfig) -> u64 {
    if !world.player.alive {
        return 0;
    }
    let mut total = 0;
    for absorber in world.absorbers.iter_mut().filter(|a| a.is_available()) {
        if world.player.pos.distance(absorber.pos) >= config.orb_absorber_touch_radius {
            continue;
        }
        absorber.collected = true;
        absorber.active = false;
        absorber.is_collecting = false;

        for orb in world.xp_orbs.iter_mut().filter(|o| o.is_available()) {
            if orb.pos.distance(absorber.pos) < config.orb_absorber_collection_radius {
                orb.collected = true;
                orb.active = false;
                total += orb.xp;
            }
        }
    }
    total
}

/// Individual pickup of orbs inside the pickup radius. Returns the XP collected.
pub fn collect_orbs(world: &mut World, config: &GameConfig) -> u64 {
    if !world.player.alive {
        return 0;
    }
    let player_pos = world.player.pos;
    world
        .xp_orbs
        .iter_mut()
        .filter(|o| o.is_available() && o.pos.distance(player_pos) < config.xp_pickup_radius)
        .map(|orb| {
            orb.collected = true;
            orb.active = false;
            orb.xp
        })
        .sum()
}
