//! Pulse Survivor - a top-down arcade survival shooter
//!
//! Core modules:
//! - `sim`: Frame simulation (spawning, collisions, progression, upgrades)
//! - `config`: Data-driven game balance
//! - `input`: Polled input state and per-frame command derivation
//! - `audio`: Sound cue dispatch with throttling
//! - `render`: Draw-call seam and camera

pub mod audio;
pub mod config;
pub mod input;
pub mod render;
pub mod sim;

pub use config::{ConfigError, EnemyKind, EnemyTypeDef, GameConfig};

use glam::Vec2;

/// Simulation timing constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (60 Hz reference frame)
    pub const SIM_DT_MS: f64 = 1000.0 / 60.0;
    /// Maximum substeps per host frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Host frame times above this are clamped (tab switches, breakpoints)
    pub const MAX_FRAME_MS: f64 = 100.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Absolute angular distance between two headings, in [0, π]
#[inline]
pub fn angle_between(a: f32, b: f32) -> f32 {
    normalize_angle(a - b).abs()
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Unit vector from `from` toward `to`, or `None` when the points coincide
#[inline]
pub fn direction_to(from: Vec2, to: Vec2) -> Option<Vec2> {
    let delta = to - from;
    let dist = delta.length();
    if dist > 0.0 { Some(delta / dist) } else { None }
}

/// Heading of a vector in radians
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}
