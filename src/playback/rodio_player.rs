use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::player::Player;
use crate::audio::decode::asset_path;
use crate::error::PlayerError;

#[derive(Default)]
struct Transport {
    path: Option<PathBuf>,
    sink: Option<Sink>,
    /// Seek requested while no source is queued; applied on next start.
    pending_seek: Option<Duration>,
}

/// Plays assets on the default output device.
pub struct RodioPlayer {
    handle: OutputStreamHandle,
    /// Dropping this ends the thread that keeps the output stream alive.
    _keepalive: Sender<()>,
    transport: Mutex<Transport>,
}

impl RodioPlayer {
    pub fn new() -> Result<Self, PlayerError> {
        let (handle_tx, handle_rx) = mpsc::channel();
        let (keepalive_tx, keepalive_rx) = mpsc::channel::<()>();

        // The output stream is not Send, so a dedicated thread owns it for the
        // lifetime of the player.
        thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = handle_tx.send(Ok(handle));
                    while keepalive_rx.recv().is_ok() {}
                    drop(stream);
                }
                Err(err) => {
                    let _ = handle_tx.send(Err(err.to_string()));
                }
            })
            .map_err(|e| PlayerError::NoOutputDevice(e.to_string()))?;

        let handle = handle_rx
            .recv()
            .map_err(|e| PlayerError::NoOutputDevice(e.to_string()))?
            .map_err(PlayerError::NoOutputDevice)?;

        Ok(Self {
            handle,
            _keepalive: keepalive_tx,
            transport: Mutex::new(Transport::default()),
        })
    }

    fn transport(&self) -> std::sync::MutexGuard<'_, Transport> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue(&self, path: &PathBuf) -> Result<Sink, PlayerError> {
        let open_err = |reason: String| PlayerError::Open {
            path: path.clone(),
            reason,
        };
        let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| open_err(e.to_string()))?;
        let sink = Sink::try_new(&self.handle).map_err(|e| open_err(e.to_string()))?;
        sink.pause();
        sink.append(source);
        Ok(sink)
    }
}

impl Player for RodioPlayer {
    fn open(&self, uri: &str, _duration: Option<Duration>) -> Result<(), PlayerError> {
        let path = asset_path(uri);
        let sink = self.queue(&path)?;
        let mut transport = self.transport();
        if let Some(old) = transport.sink.replace(sink) {
            old.stop();
        }
        transport.path = Some(path);
        transport.pending_seek = None;
        Ok(())
    }

    fn start(&self) -> Result<(), PlayerError> {
        let mut transport = self.transport();
        let needs_source = transport.sink.as_ref().map_or(true, Sink::empty);
        if needs_source {
            let path = transport.path.clone().ok_or(PlayerError::NotOpened)?;
            transport.sink = Some(self.queue(&path)?);
        }
        let pending = transport.pending_seek.take();
        if let Some(sink) = &transport.sink {
            if let Some(position) = pending {
                sink.try_seek(position)
                    .map_err(|e| PlayerError::Seek(e.to_string()))?;
            }
            sink.play();
        }
        Ok(())
    }

    fn pause(&self) {
        if let Some(sink) = &self.transport().sink {
            sink.pause();
        }
    }

    fn stop(&self) {
        let mut transport = self.transport();
        if let Some(sink) = transport.sink.take() {
            sink.stop();
        }
        transport.pending_seek = None;
    }

    fn seek(&self, position: Duration) -> Result<(), PlayerError> {
        let mut transport = self.transport();
        if transport.path.is_none() {
            return Err(PlayerError::NotOpened);
        }
        match &transport.sink {
            Some(sink) if !sink.empty() => sink
                .try_seek(position)
                .map_err(|e| PlayerError::Seek(e.to_string())),
            _ => {
                transport.pending_seek = Some(position);
                Ok(())
            }
        }
    }

    fn current_position(&self) -> Duration {
        let transport = self.transport();
        match &transport.sink {
            Some(sink) if !sink.empty() => sink.get_pos(),
            _ => transport.pending_seek.unwrap_or(Duration::ZERO),
        }
    }

    fn is_running(&self) -> bool {
        self.transport()
            .sink
            .as_ref()
            .is_some_and(|sink| !sink.is_paused() && !sink.empty())
    }
}
