use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::audio::features::FrameAnalysis;

struct Latest {
    version: u64,
    analysis: Arc<FrameAnalysis>,
}

/// Latest-value container: one writer (the polling loop), any number of readers.
///
/// A snapshot is swapped in whole, so readers never see amplitude from one frame
/// with a spectrum from another. Nothing is buffered; a new publication replaces
/// the previous one.
pub struct Signals {
    latest: Mutex<Latest>,
    changed: Condvar,
    neutral: Arc<FrameAnalysis>,
    ready: AtomicBool,
    playing: AtomicBool,
}

impl Signals {
    pub fn new(neutral: FrameAnalysis) -> Self {
        let neutral = Arc::new(neutral);
        Self {
            latest: Mutex::new(Latest {
                version: 0,
                analysis: Arc::clone(&neutral),
            }),
            changed: Condvar::new(),
            neutral,
            ready: AtomicBool::new(false),
            playing: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Latest> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current snapshot and wake waiting observers.
    pub fn publish(&self, analysis: FrameAnalysis) -> u64 {
        self.swap(Arc::new(analysis))
    }

    /// Publish the neutral state (zero amplitude, zero spectrum and waveform).
    pub fn clear(&self) -> u64 {
        self.swap(Arc::clone(&self.neutral))
    }

    fn swap(&self, analysis: Arc<FrameAnalysis>) -> u64 {
        let mut latest = self.lock();
        latest.version += 1;
        latest.analysis = analysis;
        let version = latest.version;
        drop(latest);
        self.changed.notify_all();
        version
    }

    pub fn snapshot(&self) -> Arc<FrameAnalysis> {
        Arc::clone(&self.lock().analysis)
    }

    /// Snapshot together with its version.
    pub fn latest(&self) -> (u64, Arc<FrameAnalysis>) {
        let latest = self.lock();
        (latest.version, Arc::clone(&latest.analysis))
    }

    /// Number of publications so far.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn amplitude(&self) -> f32 {
        self.lock().analysis.amplitude
    }

    pub fn spectrum(&self) -> Vec<f32> {
        self.snapshot().spectrum.clone()
    }

    pub fn waveform(&self) -> Vec<f32> {
        self.snapshot().waveform.clone()
    }

    /// Block until a publication newer than `version` exists, or `timeout` passes.
    pub fn wait_newer(
        &self,
        version: u64,
        timeout: Duration,
    ) -> Option<(u64, Arc<FrameAnalysis>)> {
        let deadline = Instant::now() + timeout;
        let mut latest = self.lock();
        while latest.version <= version {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            latest = self
                .changed
                .wait_timeout(latest, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Some((latest.version, Arc::clone(&latest.analysis)))
    }

    /// Wait until a snapshot satisfies `accept`, checking each new publication.
    pub fn wait_for<F>(&self, timeout: Duration, mut accept: F) -> Option<Arc<FrameAnalysis>>
    where
        F: FnMut(&FrameAnalysis) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let (mut version, mut analysis) = self.latest();
        while !accept(&analysis) {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            (version, analysis) = self.wait_newer(version, remaining)?;
        }
        Some(analysis)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }
}

/// Counts running polling loops; a loop holds one [`LoopGuard`] while alive.
#[derive(Debug, Default)]
pub struct LoopGauge {
    active: AtomicU64,
    peak: AtomicU64,
}

impl LoopGauge {
    pub fn active(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of loops ever alive at once.
    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn enter(self: &Arc<Self>) -> LoopGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        LoopGuard(Arc::clone(self))
    }
}

pub(crate) struct LoopGuard(Arc<LoopGauge>);

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}
