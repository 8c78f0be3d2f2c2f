use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::PlayerError;

/// External transport + clock the reader drives and polls.
///
/// Implementations use interior mutability: the polling loop reads
/// `current_position`/`is_running` while the reader issues commands.
pub trait Player: Send + Sync {
    /// Prepare `uri` for playback, paused at zero. `duration` is the decoded
    /// length when the caller knows it.
    fn open(&self, uri: &str, duration: Option<Duration>) -> Result<(), PlayerError>;
    fn start(&self) -> Result<(), PlayerError>;
    fn pause(&self);
    /// Halt playback and rewind to zero.
    fn stop(&self);
    fn seek(&self, position: Duration) -> Result<(), PlayerError>;
    fn current_position(&self) -> Duration;
    fn is_running(&self) -> bool;
}

#[derive(Debug, Default)]
struct Clock {
    opened: bool,
    duration: Option<Duration>,
    offset: Duration,
    started_at: Option<Instant>,
}

impl Clock {
    fn position(&self) -> Duration {
        let elapsed = self.started_at.map_or(Duration::ZERO, |t| t.elapsed());
        let position = self.offset + elapsed;
        match self.duration {
            Some(d) => position.min(d),
            None => position,
        }
    }

    fn at_end(&self) -> bool {
        self.duration.is_some_and(|d| self.position() >= d)
    }
}

/// Silent transport that advances with wall-clock time. Used for headless
/// analysis where no output device exists.
#[derive(Debug, Default)]
pub struct ClockPlayer {
    clock: Mutex<Clock>,
}

impl ClockPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn clock(&self) -> std::sync::MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Player for ClockPlayer {
    fn open(&self, _uri: &str, duration: Option<Duration>) -> Result<(), PlayerError> {
        *self.clock() = Clock {
            opened: true,
            duration,
            ..Clock::default()
        };
        Ok(())
    }

    fn start(&self) -> Result<(), PlayerError> {
        let mut clock = self.clock();
        if !clock.opened {
            return Err(PlayerError::NotOpened);
        }
        if clock.at_end() {
            clock.offset = Duration::ZERO;
            clock.started_at = None;
        }
        if clock.started_at.is_none() {
            clock.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&self) {
        let mut clock = self.clock();
        clock.offset = clock.position();
        clock.started_at = None;
    }

    fn stop(&self) {
        let mut clock = self.clock();
        clock.offset = Duration::ZERO;
        clock.started_at = None;
    }

    fn seek(&self, position: Duration) -> Result<(), PlayerError> {
        let mut clock = self.clock();
        if !clock.opened {
            return Err(PlayerError::NotOpened);
        }
        clock.offset = clock.duration.map_or(position, |d| position.min(d));
        if clock.started_at.is_some() {
            clock.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn current_position(&self) -> Duration {
        self.clock().position()
    }

    fn is_running(&self) -> bool {
        let clock = self.clock();
        clock.started_at.is_some() && !clock.at_end()
    }
}
