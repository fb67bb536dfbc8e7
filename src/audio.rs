//! Sound cue dispatch
//!
//! Procedural sound effects described as oscillator sweeps. The game only
//! decides *what* to play; an `AudioSink` backend turns voices into sound.
//! A missing or suspended device never reaches the simulation.

use thiserror::Error;

use crate::sim::GameEvent;

/// Minimum spacing between enemy-destroyed pops, in simulation ms
pub const ENEMY_SOUND_COOLDOWN_MS: f64 = 50.0;

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    /// Short digital pop
    EnemyDestroyed,
    /// Lower, two-voice crunch
    BossDestroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Square,
    Sawtooth,
}

/// One oscillator: exponential frequency sweep under an attack/decay envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub waveform: Waveform,
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration_s: f32,
    pub attack_s: f32,
    /// Envelope peak before master volume
    pub peak_gain: f32,
}

const ENEMY_POP: [Voice; 1] = [Voice {
    waveform: Waveform::Square,
    start_hz: 400.0,
    end_hz: 100.0,
    duration_s: 0.1,
    attack_s: 0.01,
    peak_gain: 0.3,
}];

const BOSS_CRUNCH: [Voice; 2] = [
    Voice {
        waveform: Waveform::Square,
        start_hz: 200.0,
        end_hz: 80.0,
        duration_s: 0.2,
        attack_s: 0.02,
        peak_gain: 0.2,
    },
    Voice {
        waveform: Waveform::Sawtooth,
        start_hz: 150.0,
        end_hz: 60.0,
        duration_s: 0.2,
        attack_s: 0.02,
        peak_gain: 0.2,
    },
];

impl SoundCue {
    pub fn voices(self) -> &'static [Voice] {
        match self {
            SoundCue::EnemyDestroyed => &ENEMY_POP,
            SoundCue::BossDestroyed => &BOSS_CRUNCH,
        }
    }

    /// Cue a game event should trigger, if any
    pub fn for_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::EnemyDestroyed { .. } => Some(SoundCue::EnemyDestroyed),
            GameEvent::BossDestroyed { .. } => Some(SoundCue::BossDestroyed),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    /// No output device, or the host has not allowed playback yet
    #[error("audio device unavailable")]
    Unavailable,
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Audio output backend
pub trait AudioSink {
    /// Start the voices at `volume`. Must not block.
    fn play(&mut self, effect: SoundCue, voices: &[Voice], volume: f32) -> Result<(), AudioError>;

    /// Try to (re)acquire the device; called before each play
    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&mut self, _: SoundCue, _: &[Voice], _: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Writes each cue to the log, for headless runs
#[derive(Debug, Default)]
pub struct LogSink {
    pub played: u64,
}

impl AudioSink for LogSink {
    fn play(&mut self, effect: SoundCue, voices: &[Voice], volume: f32) -> Result<(), AudioError> {
        self.played += 1;
        log::debug!("Sound {:?}: {} voice(s) at volume {:.2}", effect, voices.len(), volume);
        Ok(())
    }
}

/// Turns game events into cues for the sink
pub struct AudioDirector {
    sink: Box<dyn AudioSink>,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
    last_enemy_sound_ms: Option<f64>,
}

impl AudioDirector {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            last_enemy_sound_ms: None,
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Play a cue at simulation time `now_ms`. Enemy pops closer
    /// than the cooldown are dropped. Returns whether the sink accepted it.
    pub fn play(&mut self, effect: SoundCue, now_ms: f64) -> bool {
        if effect == SoundCue::EnemyDestroyed {
            if self
                .last_enemy_sound_ms
                .is_some_and(|last| now_ms - last < ENEMY_SOUND_COOLDOWN_MS)
            {
                return false;
            }
            self.last_enemy_sound_ms = Some(now_ms);
        }

        let vol = self.effective_volume();
        if vol <= 0.0 {
            return false;
        }

        let result = self
            .sink
            .resume()
            .and_then(|()| self.sink.play(effect, effect.voices(), vol));
        match result {
            Ok(()) => true,
            Err(err) => {
                // Retried naturally on the next cue
                log::debug!("Dropped {:?}: {}", effect, err);
                false
            }
        }
    }

    /// Play whatever the drained events call for
    pub fn handle_events(&mut self, events: &[GameEvent], now_ms: f64) {
        for effect in events.iter().filter_map(SoundCue::for_event) {
            self.play(effect, now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records plays; fails until `ready` is set
    #[derive(Default)]
    struct Recorder {
        ready: bool,
        played: Vec<(SoundCue, f32)>,
    }

    #[derive(Clone, Default)]
    struct SharedRecorder(Rc<RefCell<Recorder>>);

    impl AudioSink for SharedRecorder {
        fn play(&mut self, effect: SoundCue, _: &[Voice], volume: f32) -> Result<(), AudioError> {
            self.0.borrow_mut().played.push((effect, volume));
            Ok(())
        }

        fn resume(&mut self) -> Result<(), AudioError> {
            if self.0.borrow().ready {
                Ok(())
            } else {
                Err(AudioError::Unavailable)
            }
        }
    }

    fn director() -> (AudioDirector, SharedRecorder) {
        let recorder = SharedRecorder::default();
        recorder.0.borrow_mut().ready = true;
        (AudioDirector::new(Box::new(recorder.clone())), recorder)
    }

    #[test]
    fn test_enemy_sound_throttled() {
        let (mut audio, recorder) = director();
        assert!(audio.play(SoundCue::EnemyDestroyed, 0.0));
        assert!(!audio.play(SoundCue::EnemyDestroyed, 20.0));
        assert!(!audio.play(SoundCue::EnemyDestroyed, 49.0));
        assert!(audio.play(SoundCue::EnemyDestroyed, 50.0));
        assert_eq!(recorder.0.borrow().played.len(), 2);
    }

    #[test]
    fn test_boss_sound_not_throttled() {
        let (mut audio, recorder) = director();
        assert!(audio.play(SoundCue::BossDestroyed, 0.0));
        assert!(audio.play(SoundCue::BossDestroyed, 1.0));
        assert_eq!(recorder.0.borrow().played.len(), 2);
    }

    #[test]
    fn test_unavailable_device_is_absorbed_then_retried() {
        let (mut audio, recorder) = director();
        recorder.0.borrow_mut().ready = false;
        assert!(!audio.play(SoundCue::BossDestroyed, 0.0));

        recorder.0.borrow_mut().ready = true;
        assert!(audio.play(SoundCue::BossDestroyed, 10.0));
    }

    #[test]
    fn test_mute_and_volume() {
        let (mut audio, recorder) = director();
        audio.set_master_volume(2.0);
        audio.set_sfx_volume(0.5);
        audio.play(SoundCue::BossDestroyed, 0.0);
        assert_eq!(recorder.0.borrow().played[0].1, 0.5);

        audio.set_muted(true);
        assert!(!audio.play(SoundCue::BossDestroyed, 0.0));
    }

    #[test]
    fn test_events_map_to_effects() {
        let (mut audio, recorder) = director();
        let events = [
            GameEvent::EnemyDestroyed { pos: Vec2::ZERO },
            GameEvent::EnemyDestroyed { pos: Vec2::ONE },
            GameEvent::LevelUp { level: 2 },
            GameEvent::BossDestroyed { pos: Vec2::ZERO },
        ];
        audio.handle_events(&events, 100.0);
        let played: Vec<_> = recorder.0.borrow().played.iter().map(|p| p.0).collect();
        assert_eq!(played, vec![SoundCue::EnemyDestroyed, SoundCue::BossDestroyed]);
    }
}
