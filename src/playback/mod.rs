pub mod player;
pub(crate) mod poller;
pub mod reader;
pub mod rodio_player;
pub mod signals;
#[cfg(test)]
pub(crate) mod testing;

pub use player::{ClockPlayer, Player};
pub use reader::{Reader, ReaderState};
pub use rodio_player::RodioPlayer;
pub use signals::{LoopGauge, Signals};
