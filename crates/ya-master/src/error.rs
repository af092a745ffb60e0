use thiserror::Error;
use ya_audio::AudioError;
use ya_engine::{ConfigError, PlaybackError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("audio output: {0}")]
    Audio(#[from] AudioError),
    #[error("cannot start output thread: {0}")]
    Thread(#[from] std::io::Error),
}
