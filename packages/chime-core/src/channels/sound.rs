//! Synthesized audio cues.
//!
//! Cues are short mono sine tones rendered on demand, one fixed
//! frequency/duration/loudness triple per cue kind. Rendering is pure; the
//! only side effects live in the [`AudioSink`]. Playback problems are
//! logged and swallowed, a missing sound card must never surface as a
//! notification failure.

use std::sync::Arc;

use bytes::Bytes;

use crate::constants::{CUE_ATTACK_MS, CUE_MIN_GAIN, CUE_SAMPLE_RATE};
use crate::platform::{AudioClip, AudioSink};
use crate::prefs::PreferenceStore;

/// The cue vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    Success,
    Error,
    Warning,
    Info,
    /// Fallback for unrecognized cue names.
    Default,
}

/// Rendering parameters of one cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    /// Sine frequency in Hz.
    pub frequency: f32,
    /// Tone length in milliseconds.
    pub duration_ms: u32,
    /// Peak amplitude before the master volume, 0.0 to 1.0.
    pub volume: f32,
}

impl CueKind {
    /// Maps a cue name to its kind. Unknown names get [`CueKind::Default`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "success" => Self::Success,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "info" => Self::Info,
            _ => Self::Default,
        }
    }

    /// The fixed tone for this cue.
    #[must_use]
    pub fn tone(self) -> ToneSpec {
        match self {
            Self::Success => ToneSpec {
                frequency: 800.0,
                duration_ms: 150,
                volume: 0.30,
            },
            Self::Error => ToneSpec {
                frequency: 400.0,
                duration_ms: 250,
                volume: 0.40,
            },
            Self::Warning => ToneSpec {
                frequency: 600.0,
                duration_ms: 200,
                volume: 0.35,
            },
            Self::Info => ToneSpec {
                frequency: 520.0,
                duration_ms: 150,
                volume: 0.25,
            },
            Self::Default => ToneSpec {
                frequency: 440.0,
                duration_ms: 150,
                volume: 0.25,
            },
        }
    }
}

/// Renders a tone as a mono i16 PCM clip.
///
/// The envelope is a 10 ms linear attack followed by an exponential decay
/// towards [`CUE_MIN_GAIN`] at the final sample, which kills the click a
/// hard cutoff would produce.
#[must_use]
pub fn render_tone(spec: ToneSpec, master_volume: f32, sample_rate: u32) -> AudioClip {
    let peak = (spec.volume * master_volume).clamp(0.0, 1.0);
    let total = (sample_rate * spec.duration_ms / 1_000) as usize;
    let attack = ((sample_rate * CUE_ATTACK_MS / 1_000) as usize).min(total);
    let decay = total.saturating_sub(attack);
    let step = std::f32::consts::TAU * spec.frequency / sample_rate as f32;

    let mut samples = Vec::with_capacity(total * 2);
    for n in 0..total {
        let gain = if n < attack {
            peak * n as f32 / attack as f32
        } else if decay == 0 {
            peak
        } else {
            let progress = (n - attack) as f32 / decay as f32;
            peak * (CUE_MIN_GAIN / peak.max(CUE_MIN_GAIN)).powf(progress)
        };
        let sample = ((step * n as f32).sin() * gain * f32::from(i16::MAX)) as i16;
        samples.extend_from_slice(&sample.to_le_bytes());
    }

    AudioClip {
        samples: Bytes::from(samples),
        sample_rate,
        channels: 1,
    }
}

/// Plays audio cues subject to the sounds preference.
pub struct SoundChannel {
    prefs: Arc<PreferenceStore>,
    sink: Arc<dyn AudioSink>,
}

impl SoundChannel {
    /// Creates the channel. The sink stays untouched until the first play.
    pub fn new(prefs: Arc<PreferenceStore>, sink: Arc<dyn AudioSink>) -> Self {
        Self { prefs, sink }
    }

    /// Renders and plays the cue, unless sounds are disabled.
    ///
    /// Sink trouble is logged at warn level and otherwise swallowed.
    pub fn play(&self, kind: CueKind) {
        let prefs = self.prefs.get();
        if !prefs.sounds_enabled {
            return;
        }

        let clip = render_tone(kind.tone(), prefs.sound_volume, CUE_SAMPLE_RATE);
        if let Err(e) = self.sink.ensure_ready() {
            log::warn!("[Sound] Output unavailable, cue dropped: {}", e);
            return;
        }
        if let Err(e) = self.sink.submit(&clip) {
            log::warn!("[Sound] Could not play cue: {}", e);
        }
    }

    /// Plays the cue for a named kind, falling back to the default cue.
    pub fn play_named(&self, name: &str) {
        self.play(CueKind::from_name(name));
    }

    /// Turns cues on and persists the choice.
    pub fn enable(&self) {
        self.prefs.update(|prefs| prefs.sounds_enabled = true);
    }

    /// Turns cues off and persists the choice.
    pub fn disable(&self) {
        self.prefs.update(|prefs| prefs.sounds_enabled = false);
    }

    /// Flips the cue flag. Returns the new value.
    pub fn toggle(&self) -> bool {
        let mut enabled = false;
        self.prefs.update(|prefs| {
            prefs.sounds_enabled = !prefs.sounds_enabled;
            enabled = prefs.sounds_enabled;
        });
        enabled
    }

    /// Whether cues are currently enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.prefs.get().sounds_enabled
    }

    /// Releases the audio output.
    pub fn dispose(&self) {
        self.sink.dispose();
    }
}

impl std::fmt::Debug for SoundChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundChannel")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
