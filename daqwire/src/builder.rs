//! Programmatic construction of event streams.
//!
//! `EventStreamBuilder` produces byte-for-byte valid stream files without a
//! DAQ attached. It is the counterpart of the decoder used by tests and the
//! `daqgen` tool; it favors a convenient interface over throughput.

use std::fs;
use std::io;
use std::path::Path;

use crate::fem_header::FemHeader;
use crate::light::LightRoiHeader;
use crate::words::{
    pack_halves, EVENT_END_MARKER, EVENT_START_MARKER, CHARGE_CHANNEL_END_TAG,
    CHARGE_CHANNEL_START_TAG, LIGHT_CHANNEL_END_TAG, LIGHT_CHANNEL_START_TAG,
    LIGHT_CHANNEL_INTMED_TAG, LIGHT_ROI_ADC_TAG, LIGHT_ROI_END_TAG,
};

pub struct EventStreamBuilder {
    words: Vec<u32>,
}

impl EventStreamBuilder {
    pub fn new() -> EventStreamBuilder {
        EventStreamBuilder { words: Vec::new() }
    }

    /// Appends one event record. The closure fills in the FEM sections
    /// between the start and end markers.
    pub fn event<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut EventWriter<'_>),
    {
        self.words.push(EVENT_START_MARKER);

        let mut writer = EventWriter {
            words: &mut self.words,
            pending: None,
        };
        build(&mut writer);
        writer.align();

        self.words.push(EVENT_END_MARKER);
        self
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// The encoded stream as little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * 4);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.to_bytes()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::write(path, self.to_bytes())
    }
}

impl Default for EventStreamBuilder {
    fn default() -> Self {
        EventStreamBuilder::new()
    }
}

/// Writes the FEM sections of a single event.
///
/// Channel data is emitted as 16-bit halves; the writer packs them two per
/// stream word (low half first) and pads with a zero half wherever a
/// 32-bit-aligned structure follows.
pub struct EventWriter<'a> {
    words: &'a mut Vec<u32>,
    pending: Option<u16>,
}

impl<'a> EventWriter<'a> {
    /// Starts a FEM section by emitting its six header words.
    pub fn fem(&mut self, header: &FemHeader) -> &mut Self {
        self.align();
        self.words.extend_from_slice(&header.to_words());
        self
    }

    /// Emits a complete charge channel: start tag, 12-bit samples, end tag.
    pub fn charge_channel(&mut self, channel: u16, samples: &[u16]) -> &mut Self {
        self.push_half(CHARGE_CHANNEL_START_TAG | (channel & 0x3F));
        for &sample in samples {
            self.push_half(sample & 0x0FFF);
        }
        self.push_half(CHARGE_CHANNEL_END_TAG | (channel & 0x3F));
        self
    }

    pub fn begin_light_channel(&mut self) -> &mut Self {
        self.push_half(LIGHT_CHANNEL_START_TAG);
        self
    }

    /// Emits one ROI inside an open light channel.
    pub fn light_roi(&mut self, header: &LightRoiHeader, samples: &[u16]) -> &mut Self {
        for &half in &header.to_halves() {
            self.push_half(half);
        }
        for &sample in samples {
            self.push_half(LIGHT_CHANNEL_INTMED_TAG | LIGHT_ROI_ADC_TAG | (sample & 0x0FFF));
        }
        self.push_half(LIGHT_CHANNEL_INTMED_TAG | LIGHT_ROI_END_TAG);
        self
    }

    pub fn end_light_channel(&mut self) -> &mut Self {
        self.push_half(LIGHT_CHANNEL_END_TAG);
        self
    }

    fn push_half(&mut self, half: u16) {
        match self.pending.take() {
            Some(lo) => self.words.push(pack_halves(lo, half)),
            None => self.pending = Some(half),
        }
    }

    fn align(&mut self) {
        if let Some(lo) = self.pending.take() {
            // Zero halves carry no tag and are skipped by decoders.
            self.words.push(pack_halves(lo, 0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::words::split_halves;

    #[test]
    fn charge_event_word_layout() {
        let mut builder = EventStreamBuilder::new();
        builder.event(|event| {
            event
                .fem(&FemHeader {
                    slot: 3,
                    ..FemHeader::default()
                })
                .charge_channel(1, &[0x123]);
        });

        // start + 6 header words + 2 data words (3 halves padded to 4) + end
        assert_eq!(builder.num_words(), 10);

        let bytes = builder.into_bytes();
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        assert_eq!(words[0], EVENT_START_MARKER);
        assert_eq!(split_halves(words[7]), (0x4001, 0x0123));
        assert_eq!(split_halves(words[8]), (0x5001, 0x0000));
        assert_eq!(words[9], EVENT_END_MARKER);
    }

    #[test]
    fn fem_sections_are_word_aligned() {
        let mut builder = EventStreamBuilder::new();
        builder.event(|event| {
            // Two samples: start + 2 + end = 4 halves, already aligned.
            event
                .fem(&FemHeader::default())
                .charge_channel(0, &[1, 2])
                // One sample: 3 halves, forces a padding half before the
                // next FEM header.
                .charge_channel(1, &[3])
                .fem(&FemHeader {
                    slot: 1,
                    ..FemHeader::default()
                });
        });

        // start + 6 + 2 + 2 + 6 + end
        assert_eq!(builder.num_words(), 18);
    }
}
