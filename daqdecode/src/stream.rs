//! The decoding session.
//!
//! An [`EventStream`] owns one forward-only pass over a data file. The whole
//! file is buffered at open (data files are bounded by the DAQ run length
//! and the original readout buffered them the same way), so the OS file
//! handle is scoped to [`EventStream::open`] and released on every exit
//! path before the session exists.
//!
//! The scanning loop mirrors the readout ordering: an event-start marker
//! resets all per-event state, FEM header words feed a six-word header
//! state machine, and data halves are routed to the charge or the light
//! decoder depending on whether the current FEM sits in the configured
//! light slot. An event-end marker completes the event. Running out of
//! words mid-event means the file was truncated; everything decoded up to
//! the previous complete event is still valid, so that case is
//! end-of-stream rather than an error.

use std::fs;
use std::path::Path;

use log::{debug, info, trace};

use daqwire::words::{
    channel_number, is_charge_channel_end, is_charge_channel_start, is_event_end, is_event_start,
    is_fem_header_word, is_light_channel_end, is_light_channel_start, is_light_intermediate,
    is_light_roi_adc, is_light_roi_end, is_light_roi_header, payload12, split_halves,
};
use daqwire::{FemHeaderDecoder, LightRoiHeader};

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::event::{ChargeChannel, Event, FemReadout, LightRoi};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum StreamState {
    Open,
    Exhausted,
    Closed,
}

/// A forward-only decoding session over one data file.
#[derive(Debug)]
pub struct EventStream {
    words: Vec<u32>,
    word_idx: usize,
    /// End markers not yet consumed by the scanning loop. The loop
    /// completes an event at every end marker, so this is the number of
    /// events still decodable.
    end_markers_remaining: usize,
    events_decoded: u64,
    config: DecoderConfig,
    state: StreamState,
}

impl EventStream {
    /// Opens `path` and buffers its contents for decoding.
    ///
    /// Fails with [`DecodeError::InvalidLightSlot`] before touching the
    /// file system if the configuration is invalid, and with
    /// [`DecodeError::Io`] if the file cannot be read.
    pub fn open<P: AsRef<Path>>(path: P, config: DecoderConfig) -> Result<EventStream, DecodeError> {
        let path = path.as_ref();
        config.validate()?;

        info!("opening data file `{}`", path.display());
        let bytes = fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("read {} bytes from `{}`", bytes.len(), path.display());

        EventStream::from_bytes(bytes, config)
    }

    /// Builds a session over an in-memory stream, e.g. one produced by
    /// `daqwire::EventStreamBuilder`.
    pub fn from_bytes(bytes: Vec<u8>, config: DecoderConfig) -> Result<EventStream, DecodeError> {
        config.validate()?;

        // A trailing partial word is a truncated tail like any other.
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let end_markers_remaining = words.iter().filter(|&&w| is_event_end(w)).count();

        Ok(EventStream {
            words,
            word_idx: 0,
            end_markers_remaining,
            events_decoded: 0,
            config,
            state: StreamState::Open,
        })
    }

    pub fn config(&self) -> DecoderConfig {
        self.config
    }

    /// Total events decoded by this session so far.
    pub fn num_events_decoded(&self) -> u64 {
        self.events_decoded
    }

    /// Current read position in bytes. Never decreases.
    pub fn byte_offset(&self) -> u64 {
        (self.word_idx as u64) * 4
    }

    pub fn is_open(&self) -> bool {
        self.state == StreamState::Open
    }

    /// Decodes the next event and reports whether more events follow.
    ///
    /// `has_more` is `false` exactly on the last decodable event. Calling
    /// again after that, or on a closed session, fails with
    /// [`DecodeError::EndOfStream`].
    pub fn read_next(&mut self) -> Result<(Event, bool), DecodeError> {
        if self.state != StreamState::Open {
            return Err(DecodeError::EndOfStream);
        }

        match self.decode_event() {
            Some(event) => {
                let has_more = self.remaining_has_event();
                if !has_more {
                    self.exhaust();
                }
                Ok((event, has_more))
            }
            None => {
                self.exhaust();
                Err(DecodeError::EndOfStream)
            }
        }
    }

    /// Decodes up to `count` events in file order.
    ///
    /// Reaching end-of-stream early is not an error: the short sequence is
    /// returned and the session is closed. Only calling on an already
    /// exhausted or closed session fails with [`DecodeError::EndOfStream`].
    pub fn read_count(&mut self, count: usize) -> Result<Vec<Event>, DecodeError> {
        if self.state != StreamState::Open {
            return Err(DecodeError::EndOfStream);
        }

        let mut events = Vec::new();
        while events.len() < count {
            match self.decode_event() {
                Some(event) => events.push(event),
                None => {
                    debug!(
                        "stream exhausted after {} of {} requested events",
                        events.len(),
                        count
                    );
                    self.close();
                    break;
                }
            }
        }

        Ok(events)
    }

    /// Iterates over the remaining events until exhaustion.
    pub fn events(&mut self) -> Events<'_> {
        Events { stream: self }
    }

    /// Releases the session's buffer. Idempotent; safe to call in any
    /// state. Other sessions are unaffected.
    pub fn close(&mut self) {
        if self.state != StreamState::Closed {
            debug!("closing data file");
            self.words = Vec::new();
            self.end_markers_remaining = 0;
            self.state = StreamState::Closed;
        }
    }

    fn exhaust(&mut self) {
        debug!("end of stream after {} events", self.events_decoded);
        self.words = Vec::new();
        self.end_markers_remaining = 0;
        self.state = StreamState::Exhausted;
    }

    /// True if the remaining words still contain a complete event. The
    /// scanning loop completes an event at every end marker, so an
    /// unconsumed end marker is exactly one more decodable event. The
    /// marker count is taken once at open; rescanning the tail here would
    /// make a full `read_next` pass quadratic in the file size.
    fn remaining_has_event(&self) -> bool {
        self.end_markers_remaining > 0
    }

    /// Scans forward until an event-end marker completes an event, or until
    /// the words run out (`None`: truncated tail or true end of data).
    fn decode_event(&mut self) -> Option<Event> {
        let mut assembler = EventAssembler::new(self.config.light_slot);
        let mut start_word = self.word_idx;

        while self.word_idx < self.words.len() {
            let word = self.words[self.word_idx];
            self.word_idx += 1;

            if is_event_start(word) {
                // Reset the per-event decoder state machines.
                assembler = EventAssembler::new(self.config.light_slot);
                start_word = self.word_idx - 1;
                continue;
            }

            if is_event_end(word) {
                self.end_markers_remaining -= 1;
                let event_index = self.events_decoded;
                self.events_decoded += 1;
                if event_index % 100 == 0 {
                    debug!("+++ event [{}]", event_index);
                }

                return Some(Event {
                    event_index,
                    byte_offset: (start_word as u64) * 4,
                    byte_len: ((self.word_idx - start_word) as u64) * 4,
                    fems: assembler.finish(),
                });
            }

            assembler.feed(word);
        }

        None
    }
}

/// Iterator over the remaining events of a session, created with
/// [`EventStream::events`].
pub struct Events<'a> {
    stream: &'a mut EventStream,
}

impl<'a> Iterator for Events<'a> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if self.stream.state != StreamState::Open {
            return None;
        }

        match self.stream.decode_event() {
            Some(event) => Some(event),
            None => {
                self.stream.exhaust();
                None
            }
        }
    }
}

/// Accumulates the FEM sections of one event.
struct EventAssembler {
    light_slot: u16,
    header_decoder: FemHeaderDecoder,
    fems: Vec<FemReadout>,
    /// Charge channel currently being read, if any.
    charge: Option<ChargeChannel>,
    in_light_channel: bool,
    roi: RoiState,
}

enum RoiState {
    Idle,
    /// Collecting the three ROI header halves.
    Header { halves: [u16; 3], next: usize },
    /// Header complete, collecting ADC samples.
    Samples {
        header: LightRoiHeader,
        samples: Vec<u16>,
    },
}

impl EventAssembler {
    fn new(light_slot: u16) -> EventAssembler {
        EventAssembler {
            light_slot,
            header_decoder: FemHeaderDecoder::new(),
            fems: Vec::new(),
            charge: None,
            in_light_channel: false,
            roi: RoiState::Idle,
        }
    }

    fn feed(&mut self, word: u32) {
        if is_fem_header_word(word) {
            if let Some(header) = self.header_decoder.feed(word) {
                self.drop_open_channels();
                self.fems.push(FemReadout::new(header));
            }
            return;
        }

        // Data halves arrive low half first.
        let (lo, hi) = split_halves(word);
        self.feed_half(lo);
        self.feed_half(hi);
    }

    fn feed_half(&mut self, half: u16) {
        let is_light = match self.fems.last() {
            Some(fem) => fem.header.slot == self.light_slot,
            None => {
                if half != 0 {
                    trace!("skipping data half {:#06x} before any FEM header", half);
                }
                return;
            }
        };

        if is_light {
            self.feed_light_half(half);
        } else {
            self.feed_charge_half(half);
        }
    }

    fn feed_charge_half(&mut self, half: u16) {
        if self.charge.is_none() {
            if is_charge_channel_start(half) {
                self.charge = Some(ChargeChannel {
                    channel: channel_number(half),
                    samples: Vec::new(),
                });
            } else if half != 0 {
                trace!("skipping charge half {:#06x} outside a channel", half);
            }
            return;
        }

        if is_charge_channel_end(half) {
            let channel = self.charge.take().unwrap();
            // feed_half guarantees a current FEM.
            self.fems.last_mut().unwrap().charge.push(channel);
        } else if let Some(channel) = self.charge.as_mut() {
            channel.samples.push(payload12(half));
        }
    }

    fn feed_light_half(&mut self, half: u16) {
        if !self.in_light_channel {
            if is_light_channel_start(half) {
                self.in_light_channel = true;
            } else if half != 0 {
                trace!("skipping light half {:#06x} outside a channel", half);
            }
            return;
        }

        if is_light_channel_end(half) {
            if !matches!(self.roi, RoiState::Idle) {
                trace!("dropping incomplete ROI at light channel end");
            }
            self.in_light_channel = false;
            self.roi = RoiState::Idle;
            return;
        }

        if !is_light_intermediate(half) {
            trace!("unexpected word id {:#06x} in light channel", half);
            return;
        }

        self.roi = match std::mem::replace(&mut self.roi, RoiState::Idle) {
            RoiState::Idle => {
                if is_light_roi_header(half) {
                    RoiState::Header {
                        halves: [half, 0, 0],
                        next: 1,
                    }
                } else {
                    trace!("unexpected light half {:#06x} outside an ROI", half);
                    RoiState::Idle
                }
            }
            RoiState::Header { mut halves, next } => {
                halves[next] = half;
                if next == 2 {
                    RoiState::Samples {
                        header: LightRoiHeader::from_halves(halves),
                        samples: Vec::new(),
                    }
                } else {
                    RoiState::Header {
                        halves,
                        next: next + 1,
                    }
                }
            }
            RoiState::Samples {
                header,
                mut samples,
            } => {
                if is_light_roi_adc(half) {
                    samples.push(payload12(half));
                    RoiState::Samples { header, samples }
                } else if is_light_roi_end(half) {
                    let fem = self.fems.last_mut().unwrap();
                    let frame_number = fem.header.light_frame_number(header.frame_bits);
                    fem.light.push(LightRoi {
                        channel: header.channel,
                        frame_number,
                        sample_number: header.sample_number,
                        samples,
                    });
                    RoiState::Idle
                } else {
                    // A new header tag mid-ROI restarts the header sequence.
                    trace!("ROI restarted by header half {:#06x}", half);
                    RoiState::Header {
                        halves: [half, 0, 0],
                        next: 1,
                    }
                }
            }
        };
    }

    /// Unterminated channels do not outlive their FEM section.
    fn drop_open_channels(&mut self) {
        if let Some(channel) = self.charge.take() {
            trace!(
                "dropping unterminated charge channel {} ({} samples)",
                channel.channel,
                channel.samples.len()
            );
        }
        if self.in_light_channel {
            trace!("dropping unterminated light channel");
        }
        self.in_light_channel = false;
        self.roi = RoiState::Idle;
    }

    fn finish(mut self) -> Vec<FemReadout> {
        self.drop_open_channels();
        self.fems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqwire::{EventStreamBuilder, FemHeader};

    fn charge_header(slot: u16) -> FemHeader {
        FemHeader {
            slot,
            event_number: 7,
            event_frame_number: 0x20,
            ..FemHeader::default()
        }
    }

    #[test]
    fn decodes_charge_channels() {
        let mut builder = EventStreamBuilder::new();
        builder.event(|event| {
            event
                .fem(&charge_header(3))
                .charge_channel(0, &[100, 0, 4095])
                .charge_channel(5, &[2048]);
        });

        let mut stream =
            EventStream::from_bytes(builder.into_bytes(), DecoderConfig::new(16)).unwrap();
        let (event, has_more) = stream.read_next().unwrap();

        assert!(!has_more);
        assert_eq!(event.num_fems(), 1);
        let channels: Vec<_> = event.charge_channels().collect();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].channel, 0);
        // Zero samples survive alignment-padding handling.
        assert_eq!(channels[0].samples, vec![100, 0, 4095]);
        assert_eq!(channels[1].channel, 5);
        assert_eq!(channels[1].samples, vec![2048]);
    }

    #[test]
    fn decodes_light_rois() {
        let light_header = FemHeader {
            slot: 16,
            event_frame_number: 0x105,
            ..FemHeader::default()
        };

        let mut builder = EventStreamBuilder::new();
        builder.event(|event| {
            event
                .fem(&light_header)
                .begin_light_channel()
                .light_roi(
                    &LightRoiHeader {
                        channel: 2,
                        frame_bits: 0x5,
                        sample_number: 1000,
                    },
                    &[2000, 2100, 2000],
                )
                .light_roi(
                    &LightRoiHeader {
                        channel: 9,
                        frame_bits: 0x4,
                        sample_number: 0x1_0000,
                    },
                    &[1900],
                )
                .end_light_channel();
        });

        let mut stream =
            EventStream::from_bytes(builder.into_bytes(), DecoderConfig::new(16)).unwrap();
        let (event, _) = stream.read_next().unwrap();

        let rois: Vec<_> = event.light_rois().collect();
        assert_eq!(rois.len(), 2);

        assert_eq!(rois[0].channel, 2);
        // Frame bits 0b101 against event frame 0x105 (low bits 0b101).
        assert_eq!(rois[0].frame_number, 0x105);
        assert_eq!(rois[0].sample_number, 1000);
        assert_eq!(rois[0].samples, vec![2000, 2100, 2000]);

        assert_eq!(rois[1].channel, 9);
        assert_eq!(rois[1].frame_number, 0x104);
        assert_eq!(rois[1].sample_number, 0x1_0000);
    }

    #[test]
    fn routes_by_slot() {
        let mut builder = EventStreamBuilder::new();
        builder.event(|event| {
            event
                .fem(&charge_header(3))
                .charge_channel(1, &[10, 20])
                .fem(&FemHeader {
                    slot: 16,
                    ..FemHeader::default()
                })
                .begin_light_channel()
                .light_roi(
                    &LightRoiHeader {
                        channel: 1,
                        frame_bits: 0,
                        sample_number: 0,
                    },
                    &[30],
                )
                .end_light_channel();
        });
        let bytes = builder.into_bytes();

        let mut stream = EventStream::from_bytes(bytes.clone(), DecoderConfig::new(16)).unwrap();
        let (event, _) = stream.read_next().unwrap();

        assert_eq!(event.num_fems(), 2);
        assert_eq!(event.fems[0].charge.len(), 1);
        assert!(event.fems[0].light.is_empty());
        assert!(event.fems[1].charge.is_empty());
        assert_eq!(event.fems[1].light.len(), 1);

        // With a different light slot the second FEM decodes as charge,
        // and its light-tagged words are skipped.
        let mut stream = EventStream::from_bytes(bytes, DecoderConfig::new(8)).unwrap();
        let (event, _) = stream.read_next().unwrap();
        assert!(event.fems[1].light.is_empty());
    }

    #[test]
    fn event_byte_boundaries() {
        let mut builder = EventStreamBuilder::new();
        builder.event(|event| {
            event.fem(&charge_header(3)).charge_channel(0, &[1, 2]);
        });
        builder.event(|event| {
            event.fem(&charge_header(3));
        });

        let mut stream =
            EventStream::from_bytes(builder.into_bytes(), DecoderConfig::new(16)).unwrap();

        let (first, _) = stream.read_next().unwrap();
        // start + 6 header + 2 data + end = 10 words
        assert_eq!(first.byte_offset, 0);
        assert_eq!(first.byte_len, 40);

        let (second, _) = stream.read_next().unwrap();
        assert_eq!(second.byte_offset, 40);
        assert_eq!(second.byte_len, 32);
        assert_eq!(second.event_index, 1);
    }
}
