//! Audio output abstraction for cue playback.

use bytes::Bytes;
use thiserror::Error;

/// Errors from audio sink operations.
#[derive(Debug, Error)]
pub enum AudioSinkError {
    /// No output device, or the output context could not be opened.
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    /// The sink rejected a submitted clip.
    #[error("Clip submission failed: {0}")]
    Submit(String),
}

/// A rendered PCM clip ready for playback.
///
/// Samples are interleaved signed 16-bit little-endian, the layout every
/// sink adapter so far has wanted as-is.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Raw interleaved i16 sample bytes.
    pub samples: Bytes,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Channel count (cues render mono).
    pub channels: u16,
}

/// Playback target for audio cues.
///
/// Implementations open their output lazily: constructing a sink must never
/// touch the audio device, because some host contexts (notably browser-style
/// runtimes) refuse audio output until a user gesture has happened.
/// `ensure_ready` is called before every submission and is where a suspended
/// context gets resumed.
pub trait AudioSink: Send + Sync {
    /// Opens or resumes the output, if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable output exists.
    fn ensure_ready(&self) -> Result<(), AudioSinkError>;

    /// Queues a clip for playback. Returns once the clip is handed to the
    /// output, not once it finishes playing.
    ///
    /// # Errors
    ///
    /// Returns an error if the output rejected the clip.
    fn submit(&self, clip: &AudioClip) -> Result<(), AudioSinkError>;

    /// Releases the output. The sink may be reused afterwards; the next
    /// `ensure_ready` reopens it.
    fn dispose(&self);
}

/// Sink that accepts and discards everything.
///
/// The headless default: cue rendering still runs, playback goes nowhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn ensure_ready(&self) -> Result<(), AudioSinkError> {
        Ok(())
    }

    fn submit(&self, _clip: &AudioClip) -> Result<(), AudioSinkError> {
        Ok(())
    }

    fn dispose(&self) {
        // No-op
    }
}
