//! Audio output backends for yaudio.

mod cpal_backend;
mod error;

pub use cpal_backend::{CpalControl, CpalOutput, CpalSink};
pub use error::AudioError;
