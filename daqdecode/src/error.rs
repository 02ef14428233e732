use std::io;
use std::path::PathBuf;

use daqwire::MAX_SLOT;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("could not read data file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid light slot {0}: expected a slot between 1 and {max}", max = MAX_SLOT)]
    InvalidLightSlot(u16),

    #[error("event stream is exhausted")]
    EndOfStream,
}

impl DecodeError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, DecodeError::EndOfStream)
    }
}
