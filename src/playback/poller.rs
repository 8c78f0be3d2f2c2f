use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::player::Player;
use super::signals::{LoopGauge, Signals};
use crate::audio::analysis::FrameAnalyzer;
use crate::audio::frames::FrameIndex;
use crate::audio::mapper::frame_index_for_time;

/// Everything one loop instance reads or writes.
pub(crate) struct PollContext {
    pub frames: Arc<FrameIndex>,
    pub player: Arc<dyn Player>,
    pub signals: Arc<Signals>,
    pub gauge: Arc<LoopGauge>,
    pub sample_rate: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    Cancelled,
    /// The player stopped running on its own (end of track).
    PlaybackEnded,
}

/// Handle to a running loop. Dropping it cancels and joins the loop.
pub(crate) struct PollTask {
    cancelled: Arc<AtomicBool>,
    wake: Option<Sender<()>>,
    handle: Option<JoinHandle<LoopExit>>,
}

impl PollTask {
    /// Start polling. `on_end` runs on the loop thread if playback ends by itself.
    pub fn spawn<F>(ctx: PollContext, analyzer: FrameAnalyzer, on_end: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (wake_tx, wake_rx) = mpsc::channel();
        let flag = Arc::clone(&cancelled);

        let handle = thread::spawn(move || {
            let exit = run(&ctx, analyzer, &flag, &wake_rx);
            if exit == LoopExit::PlaybackEnded {
                on_end();
            }
            exit
        });

        Self {
            cancelled,
            wake: Some(wake_tx),
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop and wait for it. No publication happens after this returns.
    pub fn cancel(mut self) -> Option<LoopExit> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<LoopExit> {
        self.cancelled.store(true, Ordering::Release);
        // Dropping the sender interrupts the inter-tick wait immediately.
        self.wake.take();
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(exit) => Some(exit),
            Err(_) => {
                log::warn!("Polling loop panicked");
                None
            }
        }
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    ctx: &PollContext,
    mut analyzer: FrameAnalyzer,
    cancelled: &AtomicBool,
    wake: &Receiver<()>,
) -> LoopExit {
    let _guard = ctx.gauge.enter();
    let frame_size = analyzer.frame_size();
    log::debug!(
        "Polling loop started ({} frames, every {:?})",
        ctx.frames.len(),
        ctx.delay
    );

    loop {
        if cancelled.load(Ordering::Acquire) {
            log::debug!("Polling loop cancelled");
            return LoopExit::Cancelled;
        }

        if !ctx.player.is_running() {
            if cancelled.load(Ordering::Acquire) {
                return LoopExit::Cancelled;
            }
            ctx.signals.clear();
            log::debug!("Polling loop exiting: player no longer running");
            return LoopExit::PlaybackEnded;
        }

        let position = ctx.player.current_position();
        let index = frame_index_for_time(position, ctx.sample_rate, frame_size);
        let analysis = match ctx.frames.get(index) {
            Some(frame) => analyzer.analyze(index, frame),
            None => {
                log::trace!("No frame {} at {:?}, publishing silence", index, position);
                analyzer.silence()
            }
        };

        if cancelled.load(Ordering::Acquire) {
            return LoopExit::Cancelled;
        }
        ctx.signals.publish(analysis);

        match wake.recv_timeout(ctx.delay) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                log::debug!("Polling loop cancelled");
                return LoopExit::Cancelled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frames::segment;
    use crate::config::ReaderConfig;
    use crate::playback::testing::ManualPlayer;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn context(player: Arc<ManualPlayer>, samples: Vec<f32>) -> (PollContext, FrameAnalyzer) {
        let config = ReaderConfig {
            frame_size: 256,
            fft_bins: 8,
            frame_delay_ms: 5,
            normalized: false,
            ..Default::default()
        };
        let analyzer = FrameAnalyzer::new(&config);
        let ctx = PollContext {
            frames: Arc::new(segment(samples, 256)),
            player,
            signals: Arc::new(Signals::new(analyzer.silence())),
            gauge: Arc::new(LoopGauge::default()),
            sample_rate: 1000,
            delay: config.frame_delay(),
        };
        (ctx, analyzer)
    }

    fn stepped(frames: usize) -> Vec<f32> {
        // Frame i holds the constant (i + 1) / 10.
        (0..frames * 256).map(|i| ((i / 256) + 1) as f32 / 10.0).collect()
    }

    #[test]
    fn publishes_frame_under_playback_position() {
        let player = Arc::new(ManualPlayer::default());
        player.start().unwrap();
        // 1000 Hz mapping rate: 600ms -> sample 600 -> frame 2
        player.set_position(Duration::from_millis(600));
        let (ctx, analyzer) = context(Arc::clone(&player), stepped(4));
        let signals = Arc::clone(&ctx.signals);

        let task = PollTask::spawn(ctx, analyzer, || {});
        let snap = signals
            .wait_for(Duration::from_secs(2), |a| a.frame.is_some())
            .unwrap();
        assert_eq!(snap.frame, Some(2));
        assert!((snap.amplitude - 0.3).abs() < 1e-6);
        assert_eq!(task.cancel(), Some(LoopExit::Cancelled));
    }

    #[test]
    fn out_of_range_position_replaces_stale_frame_with_silence() {
        let player = Arc::new(ManualPlayer::default());
        player.start().unwrap();
        player.set_position(Duration::ZERO);
        let (ctx, analyzer) = context(Arc::clone(&player), stepped(2));
        let signals = Arc::clone(&ctx.signals);

        let task = PollTask::spawn(ctx, analyzer, || {});
        signals
            .wait_for(Duration::from_secs(2), |a| a.frame == Some(0))
            .unwrap();

        player.set_position(Duration::from_secs(30));
        let snap = signals
            .wait_for(Duration::from_secs(2), |a| a.is_silence())
            .unwrap();
        assert_eq!(snap.amplitude, 0.0);
        assert_eq!(snap.spectrum, vec![0.0; 8]);
        // Still polling: seeking back picks frames up again.
        player.set_position(Duration::from_millis(300));
        signals
            .wait_for(Duration::from_secs(2), |a| a.frame == Some(1))
            .unwrap();
        task.cancel();
    }

    #[test]
    fn cancel_is_prompt_and_final() {
        let player = Arc::new(ManualPlayer::default());
        player.start().unwrap();
        let (mut ctx, analyzer) = context(Arc::clone(&player), stepped(2));
        ctx.delay = Duration::from_secs(10);
        let signals = Arc::clone(&ctx.signals);
        let gauge = Arc::clone(&ctx.gauge);

        let task = PollTask::spawn(ctx, analyzer, || {});
        signals.wait_newer(0, Duration::from_secs(2)).unwrap();
        assert_eq!(gauge.active(), 1);

        let started = Instant::now();
        task.cancel();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(gauge.active(), 0);

        let version = signals.version();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(signals.version(), version);
    }

    #[test]
    fn natural_end_clears_and_notifies() {
        let player = Arc::new(ManualPlayer::default());
        player.start().unwrap();
        let (ctx, analyzer) = context(Arc::clone(&player), stepped(2));
        let signals = Arc::clone(&ctx.signals);
        let ended = Arc::new(AtomicUsize::new(0));
        let ended_flag = Arc::clone(&ended);

        let task = PollTask::spawn(ctx, analyzer, move || {
            ended_flag.fetch_add(1, Ordering::SeqCst);
        });
        signals
            .wait_for(Duration::from_secs(2), |a| a.frame.is_some())
            .unwrap();

        player.finish();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !task.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(task.is_finished());
        assert_eq!(ended.load(Ordering::SeqCst), 1);
        assert!(signals.snapshot().is_silence());
        assert_eq!(task.cancel(), Some(LoopExit::PlaybackEnded));
    }
}
