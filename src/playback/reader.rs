use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::player::Player;
use super::poller::{PollContext, PollTask};
use super::signals::{LoopGauge, Signals};
use crate::audio::analysis::{summarize, FrameAnalyzer};
use crate::audio::decode::Decoder;
use crate::audio::features::{FrameAnalysis, TrackSummary};
use crate::audio::frames::{segment, FrameIndex};
use crate::config::ReaderConfig;
use crate::error::{ConfigError, LoadError, ReaderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReaderState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Stopped,
}

impl ReaderState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loading,
            2 => Self::Ready,
            3 => Self::Playing,
            4 => Self::Paused,
            5 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn get(&self) -> ReaderState {
        ReaderState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ReaderState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: ReaderState, to: ReaderState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

struct LoadedTrack {
    frames: Arc<FrameIndex>,
    summary: TrackSummary,
    /// Rate used to turn player time into frame indices
    mapping_rate: u32,
}

#[derive(Default)]
struct Control {
    track: Option<LoadedTrack>,
    task: Option<PollTask>,
    load_seq: u64,
}

struct Inner {
    config: ReaderConfig,
    decoder: Box<dyn Decoder>,
    player: Arc<dyn Player>,
    signals: Arc<Signals>,
    state: Arc<StateCell>,
    gauge: Arc<LoopGauge>,
    control: Mutex<Control>,
}

impl Inner {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the loop and halt the transport.
    fn halt(&self, control: &mut Control) {
        if let Some(task) = control.task.take() {
            task.cancel();
        }
        if control.track.is_some() {
            self.player.stop();
        }
        self.signals.set_playing(false);
    }

    fn start_playback(&self, control: &mut Control) -> Result<(), ReaderError> {
        let (frames, sample_rate) = match control.track.as_ref() {
            Some(track) => (Arc::clone(&track.frames), track.mapping_rate),
            None => return Err(ReaderError::NotLoaded),
        };

        let loop_alive = control.task.as_ref().is_some_and(|t| !t.is_finished());
        if self.state.get() == ReaderState::Playing && loop_alive {
            return Ok(());
        }

        // At most one loop: the previous one is joined before the next starts.
        if let Some(task) = control.task.take() {
            task.cancel();
        }
        if !self.player.is_running() {
            self.player.start()?;
        }
        self.state.set(ReaderState::Playing);
        self.signals.set_playing(true);

        let ctx = PollContext {
            frames,
            player: Arc::clone(&self.player),
            signals: Arc::clone(&self.signals),
            gauge: Arc::clone(&self.gauge),
            sample_rate,
            delay: self.config.frame_delay(),
        };
        let state = Arc::clone(&self.state);
        let signals = Arc::clone(&self.signals);
        control.task = Some(PollTask::spawn(
            ctx,
            FrameAnalyzer::new(&self.config),
            move || {
                if state.transition(ReaderState::Playing, ReaderState::Stopped) {
                    signals.set_playing(false);
                    log::info!("Playback finished");
                }
            },
        ));
        log::info!("Playing");
        Ok(())
    }

    fn prepare(&self, uri: &str) -> Result<LoadedTrack, LoadError> {
        let audio = self.decoder.decode(uri)?;
        let total = audio.samples.len();
        let frame_size = self.config.frame_size;
        if total < frame_size {
            log::warn!(
                "Decoded {} samples, fewer than one {}-sample frame; playback will read as silence",
                total,
                frame_size
            );
        }

        let frames = segment(audio.samples, frame_size);
        let summary = summarize(&frames, audio.sample_rate, audio.channels, total);
        let mapping_rate = self.config.mapping_rate(audio.sample_rate);
        if mapping_rate != audio.sample_rate {
            log::warn!(
                "Mapping playback at {}Hz for audio decoded at {}Hz",
                mapping_rate,
                audio.sample_rate
            );
        }

        Ok(LoadedTrack {
            frames: Arc::new(frames),
            summary,
            mapping_rate,
        })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let control = self.control.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = control.task.take() {
            task.cancel();
        }
    }
}

/// Frame-synchronised analysis of one audio asset against an external player.
///
/// Cloning is cheap and yields another handle to the same reader. The polling
/// loop is cancelled when the last handle is dropped.
#[derive(Clone)]
pub struct Reader {
    inner: Arc<Inner>,
}

impl Reader {
    pub fn new(
        config: ReaderConfig,
        decoder: Box<dyn Decoder>,
        player: Arc<dyn Player>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let neutral = FrameAnalysis::silence(config.fft_bins, config.frame_size);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                decoder,
                player,
                signals: Arc::new(Signals::new(neutral)),
                state: Arc::new(StateCell(AtomicU8::new(ReaderState::Idle as u8))),
                gauge: Arc::new(LoopGauge::default()),
                control: Mutex::new(Control::default()),
            }),
        })
    }

    /// Decode `uri`, build the frame index and open it on the player.
    ///
    /// Blocks for the duration of decoding. Any current playback is stopped
    /// first. On failure the reader is left `Idle` and not ready. With
    /// `play_on_load`, playback starts after the configured grace period.
    pub fn load_file(&self, uri: &str) -> Result<(), LoadError> {
        let inner = &self.inner;
        let seq = {
            let mut control = inner.control();
            inner.halt(&mut control);
            control.track = None;
            control.load_seq += 1;
            inner.signals.set_ready(false);
            inner.signals.clear();
            inner.state.set(ReaderState::Loading);
            control.load_seq
        };
        log::info!("Loading {}", uri);

        let prepared = inner.prepare(uri);

        let mut control = inner.control();
        if control.load_seq != seq {
            log::warn!("Discarding load of {}: a newer load started", uri);
            return Err(LoadError::Superseded);
        }
        let opened = prepared.and_then(|track| {
            let duration = Duration::from_secs_f32(track.summary.duration);
            inner.player.open(uri, Some(duration))?;
            Ok(track)
        });
        let track = match opened {
            Ok(track) => track,
            Err(err) => {
                inner.state.set(ReaderState::Idle);
                log::warn!("Failed to load {}: {}", uri, err);
                return Err(err);
            }
        };
        control.track = Some(track);
        inner.state.set(ReaderState::Ready);
        inner.signals.set_ready(true);
        drop(control);
        log::info!("Ready: {}", uri);

        if inner.config.play_on_load {
            // Give the player a moment to attach before auto-play.
            thread::sleep(inner.config.play_delay());
            // A transport call or newer load during the grace period wins.
            let mut control = inner.control();
            if control.load_seq == seq && inner.state.get() == ReaderState::Ready {
                if let Err(err) = inner.start_playback(&mut control) {
                    log::warn!("Auto-play failed: {}", err);
                }
            }
        }
        Ok(())
    }

    /// Run [`Reader::load_file`] on a background thread.
    pub fn spawn_load(&self, uri: impl Into<String>) -> JoinHandle<Result<(), LoadError>> {
        let reader = self.clone();
        let uri = uri.into();
        thread::spawn(move || reader.load_file(&uri))
    }

    /// Start the player and the polling loop. No-op when already playing.
    pub fn play(&self) -> Result<(), ReaderError> {
        let mut control = self.inner.control();
        self.inner.start_playback(&mut control)
    }

    /// Pause playback, keeping the last published values.
    pub fn pause(&self) {
        let inner = &self.inner;
        let mut control = inner.control();
        if self.state() != ReaderState::Playing {
            return;
        }
        if let Some(task) = control.task.take() {
            task.cancel();
        }
        inner.player.pause();
        inner.state.set(ReaderState::Paused);
        inner.signals.set_playing(false);
        log::info!("Paused");
    }

    /// Stop playback, rewind to zero and publish the neutral state.
    pub fn stop(&self) {
        let inner = &self.inner;
        let mut control = inner.control();
        inner.halt(&mut control);
        inner.state.set(ReaderState::Stopped);
        inner.signals.clear();
        log::info!("Stopped");
    }

    /// Reposition the player. The next tick picks up the new position.
    pub fn seek_to(&self, position: Duration) -> Result<(), ReaderError> {
        let control = self.inner.control();
        if control.track.is_none() {
            return Err(ReaderError::NotLoaded);
        }
        self.inner.player.seek(position)?;
        log::debug!("Seeked to {:?}", position);
        Ok(())
    }

    pub fn toggle_playback(&self) -> Result<(), ReaderError> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Stop, rewind and optionally start again from the top.
    pub fn restart(&self, play: bool) -> Result<(), ReaderError> {
        self.stop();
        self.seek_to(Duration::ZERO)?;
        if play {
            self.play()?;
        }
        Ok(())
    }

    pub fn state(&self) -> ReaderState {
        self.inner.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.signals.is_ready()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.signals.is_playing()
    }

    pub fn signals(&self) -> Arc<Signals> {
        Arc::clone(&self.inner.signals)
    }

    pub fn snapshot(&self) -> Arc<FrameAnalysis> {
        self.inner.signals.snapshot()
    }

    pub fn amplitude(&self) -> f32 {
        self.inner.signals.amplitude()
    }

    pub fn spectrum(&self) -> Vec<f32> {
        self.inner.signals.spectrum()
    }

    pub fn waveform(&self) -> Vec<f32> {
        self.inner.signals.waveform()
    }

    pub fn summary(&self) -> Option<TrackSummary> {
        self.inner.control().track.as_ref().map(|t| t.summary.clone())
    }

    pub fn position(&self) -> Duration {
        self.inner.player.current_position()
    }

    pub fn loop_gauge(&self) -> Arc<LoopGauge> {
        Arc::clone(&self.inner.gauge)
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.inner.config
    }
}
