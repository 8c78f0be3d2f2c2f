use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::player::Player;
use crate::audio::decode::{AudioData, Decoder};
use crate::error::{DecodeError, PlayerError};

#[derive(Debug, Default)]
struct ManualState {
    opened: Option<String>,
    running: bool,
    position: Duration,
}

/// Player whose clock only moves when the test says so.
#[derive(Debug, Default)]
pub struct ManualPlayer {
    state: Mutex<ManualState>,
    pub starts: AtomicUsize,
}

impl ManualPlayer {
    pub fn set_position(&self, position: Duration) {
        self.state.lock().unwrap().position = position;
    }

    /// Simulate the track running out.
    pub fn finish(&self) {
        self.state.lock().unwrap().running = false;
    }

    pub fn opened(&self) -> Option<String> {
        self.state.lock().unwrap().opened.clone()
    }
}

impl Player for ManualPlayer {
    fn open(&self, uri: &str, _duration: Option<Duration>) -> Result<(), PlayerError> {
        let mut state = self.state.lock().unwrap();
        *state = ManualState {
            opened: Some(uri.to_string()),
            ..Default::default()
        };
        Ok(())
    }

    fn start(&self) -> Result<(), PlayerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().running = true;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().unwrap().running = false;
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        state.position = Duration::ZERO;
    }

    fn seek(&self, position: Duration) -> Result<(), PlayerError> {
        self.state.lock().unwrap().position = position;
        Ok(())
    }

    fn current_position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }
}

/// Decoder returning a fixed PCM buffer for any URI.
pub struct SamplesDecoder {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Decoder for SamplesDecoder {
    fn decode(&self, _uri: &str) -> Result<AudioData, DecodeError> {
        Ok(AudioData {
            samples: self.samples.clone(),
            sample_rate: self.sample_rate,
            channels: 1,
        })
    }
}

/// Decoder that always reports a missing audio track.
pub struct FailingDecoder;

impl Decoder for FailingDecoder {
    fn decode(&self, _uri: &str) -> Result<AudioData, DecodeError> {
        Err(DecodeError::NoAudioTrack)
    }
}
