//! Decoder for pGRAMS-style DAQ binary event streams.
//!
//! A data file is a sequence of self-delimiting event records, each holding
//! per-FEM headers plus charge channel waveforms and light readout ROIs
//! (see `daqwire` for the word-level layout). [`EventStream`] is the
//! forward-only decoding session over one file: pull events one at a time
//! with [`EventStream::read_next`], in bounded batches with
//! [`EventStream::read_count`], or to exhaustion with
//! [`EventStream::events`].

mod config;
mod error;
mod event;
mod stream;
pub mod waveform;

pub use crate::config::DecoderConfig;
pub use crate::error::DecodeError;
pub use crate::event::{ChargeChannel, Event, FemReadout, LightRoi};
pub use crate::stream::{EventStream, Events};

pub use daqwire::{FemHeader, NUM_LIGHT_CHANNELS};
