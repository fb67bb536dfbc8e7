//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (insertion order of each collection)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod entities;
pub mod player;
pub mod progression;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod upgrades;

pub use collision::{KillEvent, KillKind, circles_overlap, resolve_collisions};
pub use entities::{
    Asteroid, Boss, BossMotion, Bullet, BulletTraits, Enemy, EntityId, OrbAbsorber, Particle,
    Satellite, XpOrb,
};
pub use player::{Player, PlayerControls};
pub use progression::{LevelChange, Progression};
pub use spawn::SpawnDirector;
pub use state::{GameEvent, GamePhase, GameState, RunSummary, ScreenShake, World};
pub use tick::{FrameClock, TickInput, tick};
pub use upgrades::{UpgradeId, UpgradeOffer, UpgradeRegistry};
