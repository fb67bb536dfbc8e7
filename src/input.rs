//! Polled input state
//!
//! Hosts feed raw key, mouse and gamepad events in; the game reads held
//! state, just-pressed edges and derived movement/look once per frame, then
//! calls `end_frame` to clear the edges.

use std::collections::HashSet;
use std::f32::consts::FRAC_PI_4;

use glam::Vec2;

use crate::heading;
use crate::sim::{GamePhase, TickInput};

/// Stick values inside this magnitude read as zero
pub const STICK_DEADZONE: f32 = 0.15;
/// Trigger travel that counts as pressed
pub const TRIGGER_THRESHOLD: f32 = 0.3;
/// Q/E facing step
pub const TURN_STEP: f32 = FRAC_PI_4;
/// Mouse must be this far from screen centre to steer facing
const MOUSE_ACTIVE_PX: f32 = 1.0;

/// Standard gamepad layout indices
pub mod pad {
    pub const A: usize = 0;
    pub const X: usize = 2;
    pub const RIGHT_TRIGGER: usize = 7;
    pub const START: usize = 9;
    pub const DPAD_UP: usize = 12;
    pub const DPAD_DOWN: usize = 13;
    pub const DPAD_LEFT: usize = 14;
    pub const DPAD_RIGHT: usize = 15;

    pub const LEFT_X: usize = 0;
    pub const LEFT_Y: usize = 1;
    pub const RIGHT_X: usize = 2;
    pub const RIGHT_Y: usize = 3;
    /// Triggers on axes, when the pad reports them there
    pub const RIGHT_TRIGGER_AXIS: usize = 5;
}

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    R,
    /// Debug: spawn boss
    B,
    /// Debug: show every upgrade
    V,
    Space,
    Escape,
    /// Number row 1-9
    Digit(u8),
}

/// One gamepad snapshot as reported by the host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gamepad {
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
}

impl Gamepad {
    fn axis(&self, index: usize) -> f32 {
        let value = self.axes.get(index).copied().unwrap_or(0.0);
        if value.abs() > STICK_DEADZONE { value } else { 0.0 }
    }

    fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Right trigger in [0, 1], from the axis if present, else the button
    fn right_trigger(&self) -> f32 {
        match self.axes.get(pad::RIGHT_TRIGGER_AXIS) {
            Some(&value) => value.max(0.0),
            None if self.button(pad::RIGHT_TRIGGER) => 1.0,
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    /// Mouse position in screen pixels
    pub mouse: Vec2,
    pub mouse_clicked: bool,
    /// Screen size used to find the centre for mouse look
    pub screen: Vec2,
    gamepad: Option<Gamepad>,
    pad_just_pressed: HashSet<usize>,
    prev_right_trigger: f32,
    /// Highlighted entry in the upgrade menu for D-pad navigation
    pub menu_cursor: usize,
}

impl InputState {
    pub fn new(screen: Vec2) -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            mouse: screen / 2.0,
            mouse_clicked: false,
            screen,
            gamepad: None,
            pad_just_pressed: HashSet::new(),
            prev_right_trigger: 0.0,
            menu_cursor: 0,
        }
    }

    // === Host events ===

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn mouse_move(&mut self, pos: Vec2) {
        self.mouse = pos;
    }

    pub fn mouse_down(&mut self) {
        self.mouse_clicked = true;
    }

    /// Replace the gamepad snapshot, recording rising button edges.
    /// `None` means disconnected.
    pub fn poll_gamepad(&mut self, snapshot: Option<Gamepad>) {
        let Some(next) = snapshot else {
            if self.gamepad.take().is_some() {
                log::info!("Gamepad disconnected");
            }
            self.prev_right_trigger = 0.0;
            return;
        };

        match &self.gamepad {
            Some(prev) => {
                self.prev_right_trigger = prev.right_trigger();
                for (i, &down) in next.buttons.iter().enumerate() {
                    if down && !prev.button(i) {
                        self.pad_just_pressed.insert(i);
                    }
                }
            }
            None => {
                log::info!("Gamepad connected");
                self.prev_right_trigger = 0.0;
                for (i, &down) in next.buttons.iter().enumerate() {
                    if down {
                        self.pad_just_pressed.insert(i);
                    }
                }
            }
        }
        self.gamepad = Some(next);
    }

    // === Queries ===

    pub fn is_pressed(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn was_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn has_gamepad(&self) -> bool {
        self.gamepad.is_some()
    }

    /// Axis value with the deadzone applied; 0 without a gamepad
    pub fn axis(&self, index: usize) -> f32 {
        self.gamepad.as_ref().map_or(0.0, |g| g.axis(index))
    }

    pub fn button_pressed(&self, index: usize) -> bool {
        self.gamepad.as_ref().is_some_and(|g| g.button(index))
    }

    pub fn button_just_pressed(&self, index: usize) -> bool {
        self.gamepad.is_some() && self.pad_just_pressed.contains(&index)
    }

    fn stick(&self, x: usize, y: usize) -> Option<Vec2> {
        let v = Vec2::new(self.axis(x), self.axis(y));
        (v != Vec2::ZERO).then_some(v)
    }

    /// Movement intent with length at most 1. The left stick keeps its
    /// magnitude; the D-pad and WASD are normalised.
    pub fn movement(&self) -> Vec2 {
        if self.has_gamepad() {
            if let Some(stick) = self.stick(pad::LEFT_X, pad::LEFT_Y) {
                return stick.clamp_length_max(1.0);
            }
            let mut dpad = Vec2::ZERO;
            if self.button_pressed(pad::DPAD_LEFT) {
                dpad.x -= 1.0;
            }
            if self.button_pressed(pad::DPAD_RIGHT) {
                dpad.x += 1.0;
            }
            if self.button_pressed(pad::DPAD_UP) {
                dpad.y -= 1.0;
            }
            if self.button_pressed(pad::DPAD_DOWN) {
                dpad.y += 1.0;
            }
            return dpad.normalize_or_zero();
        }

        let mut dir = Vec2::ZERO;
        if self.is_pressed(Key::W) {
            dir.y -= 1.0;
        }
        if self.is_pressed(Key::S) {
            dir.y += 1.0;
        }
        if self.is_pressed(Key::A) {
            dir.x -= 1.0;
        }
        if self.is_pressed(Key::D) {
            dir.x += 1.0;
        }
        dir.normalize_or_zero()
    }

    /// Absolute facing, if any look source is active. Right stick wins over
    /// left stick; the mouse is only used without a gamepad and once it has
    /// left the screen centre. `None` lets the ship face its movement.
    pub fn look_angle(&self) -> Option<f32> {
        if self.has_gamepad() {
            return self
                .stick(pad::RIGHT_X, pad::RIGHT_Y)
                .or_else(|| self.stick(pad::LEFT_X, pad::LEFT_Y))
                .map(heading);
        }
        let offset = self.mouse - self.screen / 2.0;
        if offset.x.abs() > MOUSE_ACTIVE_PX || offset.y.abs() > MOUSE_ACTIVE_PX {
            Some(heading(offset))
        } else {
            None
        }
    }

    /// Q/E facing step; disabled while a gamepad is connected
    pub fn turn(&self) -> f32 {
        if self.has_gamepad() {
            0.0
        } else if self.was_just_pressed(Key::Q) {
            -TURN_STEP
        } else if self.was_just_pressed(Key::E) {
            TURN_STEP
        } else {
            0.0
        }
    }

    /// Space, or the right trigger crossing its threshold this frame
    pub fn dash_pressed(&self) -> bool {
        if self.was_just_pressed(Key::Space) {
            return true;
        }
        self.gamepad.as_ref().is_some_and(|g| {
            g.right_trigger() > TRIGGER_THRESHOLD && self.prev_right_trigger <= TRIGGER_THRESHOLD
        })
    }

    /// Upgrade index chosen this frame by number key or pad confirm
    fn upgrade_choice(&mut self, offer_count: usize) -> Option<usize> {
        if offer_count == 0 {
            self.menu_cursor = 0;
            return None;
        }
        self.menu_cursor = self.menu_cursor.min(offer_count - 1);
        if self.button_just_pressed(pad::DPAD_UP) {
            self.menu_cursor = self.menu_cursor.saturating_sub(1);
        }
        if self.button_just_pressed(pad::DPAD_DOWN) {
            self.menu_cursor = (self.menu_cursor + 1).min(offer_count - 1);
        }
        if self.button_just_pressed(pad::A) || self.button_just_pressed(pad::X) {
            return Some(self.menu_cursor);
        }
        (1..=9u8)
            .find(|&d| self.was_just_pressed(Key::Digit(d)))
            .map(|d| usize::from(d - 1))
            .filter(|&i| i < offer_count)
    }

    /// Everything the simulation needs for one frame
    pub fn to_tick_input(&mut self, phase: GamePhase, offer_count: usize) -> TickInput {
        let start = self.button_just_pressed(pad::START);
        let in_upgrade_menu = phase == GamePhase::Upgrade;
        let select_upgrade = if in_upgrade_menu {
            self.upgrade_choice(offer_count)
        } else {
            None
        };
        if select_upgrade.is_some() {
            self.menu_cursor = 0;
        }

        TickInput {
            movement: self.movement(),
            look: self.look_angle(),
            turn: self.turn(),
            dash: self.dash_pressed(),
            pause: self.was_just_pressed(Key::Escape) || (start && phase != GamePhase::GameOver),
            restart: self.was_just_pressed(Key::R) || (start && phase == GamePhase::GameOver),
            select_upgrade,
            spawn_boss: self.was_just_pressed(Key::B),
            show_all_upgrades: self.was_just_pressed(Key::V),
        }
    }

    /// Clear edge state after every read for the frame
    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.pad_just_pressed.clear();
        self.mouse_clicked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> InputState {
        InputState::new(Vec2::new(800.0, 600.0))
    }

    fn pad_with(axes: &[f32], pressed: &[usize]) -> Gamepad {
        let mut buttons = vec![false; 16];
        for &i in pressed {
            buttons[i] = true;
        }
        Gamepad {
            axes: axes.to_vec(),
            buttons,
        }
    }

    #[test]
    fn test_just_pressed_is_edge_only() {
        let mut input = input();
        input.key_down(Key::Space);
        assert!(input.was_just_pressed(Key::Space));
        assert!(input.dash_pressed());
        input.end_frame();

        // Key repeat while held is not a new press
        input.key_down(Key::Space);
        assert!(input.is_pressed(Key::Space));
        assert!(!input.was_just_pressed(Key::Space));

        input.key_up(Key::Space);
        assert!(!input.is_pressed(Key::Space));
    }

    #[test]
    fn test_wasd_is_normalised() {
        let mut input = input();
        input.key_down(Key::W);
        input.key_down(Key::D);
        let m = input.movement();
        assert!((m.length() - 1.0).abs() < 1e-5);
        assert!(m.x > 0.0 && m.y < 0.0);
    }

    #[test]
    fn test_deadzone_and_stick_magnitude() {
        let mut input = input();
        input.poll_gamepad(Some(pad_with(&[0.1, -0.1, 0.0, 0.0], &[])));
        assert_eq!(input.axis(pad::LEFT_X), 0.0);
        assert_eq!(input.movement(), Vec2::ZERO);

        input.poll_gamepad(Some(pad_with(&[0.5, 0.0, 0.0, 0.0], &[])));
        assert!((input.movement().x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_look_priority() {
        let mut input = input();
        assert_eq!(input.look_angle(), None);

        input.mouse_move(Vec2::new(400.0, 500.0));
        let angle = input.look_angle().unwrap();
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5);

        // Gamepad disables the mouse; right stick beats left stick
        input.poll_gamepad(Some(pad_with(&[1.0, 0.0, 0.0, 0.0], &[])));
        assert_eq!(input.look_angle(), Some(0.0));
        input.poll_gamepad(Some(pad_with(&[1.0, 0.0, 0.0, -1.0], &[])));
        let angle = input.look_angle().unwrap();
        assert!((angle + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_turn_steps() {
        let mut input = input();
        input.key_down(Key::Q);
        assert_eq!(input.turn(), -TURN_STEP);
        input.end_frame();
        assert_eq!(input.turn(), 0.0);
    }

    #[test]
    fn test_trigger_rising_edge_dashes_once() {
        let mut input = input();
        input.poll_gamepad(Some(pad_with(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0], &[])));
        input.poll_gamepad(Some(pad_with(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.9], &[])));
        assert!(input.dash_pressed());
        input.poll_gamepad(Some(pad_with(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.9], &[])));
        assert!(!input.dash_pressed());
    }

    #[test]
    fn test_start_pauses_or_restarts_by_phase() {
        let mut input = input();
        input.poll_gamepad(Some(pad_with(&[], &[])));
        input.poll_gamepad(Some(pad_with(&[], &[pad::START])));
        let playing = input.to_tick_input(GamePhase::Playing, 0);
        assert!(playing.pause && !playing.restart);
        let over = input.to_tick_input(GamePhase::GameOver, 0);
        assert!(over.restart && !over.pause);
    }

    #[test]
    fn test_upgrade_selection_by_digit_and_pad() {
        let mut input = input();
        input.key_down(Key::Digit(2));
        assert_eq!(input.to_tick_input(GamePhase::Upgrade, 3).select_upgrade, Some(1));
        // Digits only count in the menu and within range
        assert_eq!(input.to_tick_input(GamePhase::Playing, 3).select_upgrade, None);
        assert_eq!(input.to_tick_input(GamePhase::Upgrade, 1).select_upgrade, None);
        input.end_frame();

        input.poll_gamepad(Some(pad_with(&[], &[])));
        input.poll_gamepad(Some(pad_with(&[], &[pad::DPAD_DOWN])));
        assert_eq!(input.to_tick_input(GamePhase::Upgrade, 3).select_upgrade, None);
        input.end_frame();
        input.poll_gamepad(Some(pad_with(&[], &[pad::A])));
        assert_eq!(input.to_tick_input(GamePhase::Upgrade, 3).select_upgrade, Some(1));
    }
}
