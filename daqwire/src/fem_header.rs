//! The six-word FEM header.
//!
//! Every front-end module (FEM) contributing to an event emits six header
//! words before its data section. The same header layout is used by the
//! charge and the light readout. Header payloads are 12 bits per half; the
//! 24-bit counters are split upper-half-first (see [`crate::words`]).

use serde::Serialize;

use crate::light::correct_rollover;
use crate::words::{fem_payload, fem_payload_halves, pack_halves, split_halves, FEM_HEADER_TAG};

/// Number of 32-bit header words per FEM.
pub const FEM_HEADER_WORDS: usize = 6;

/// Largest addressable crate slot (the slot field is five bits wide).
pub const MAX_SLOT: u16 = 31;

/// The decoded per-FEM header.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct FemHeader {
    pub slot: u16,
    pub fem_id: u16,
    pub test: bool,
    pub overflow: bool,
    pub full: bool,
    pub num_adc_words: u32,
    pub event_number: u32,
    pub event_frame_number: u32,
    pub checksum: u32,
    /// 12-bit sample counter at the trigger.
    pub trigger_sample: u16,
    /// Low four bits of the trigger frame counter as stored on the wire.
    /// Use [`FemHeader::trigger_frame_number`] for the resolved value.
    pub trigger_frame_bits: u16,
}

impl FemHeader {
    /// The trigger frame counter, rebased on the event frame number with
    /// rollover correction of the four stored bits.
    pub fn trigger_frame_number(&self) -> u32 {
        let candidate =
            (self.event_frame_number & !0xF) | (self.trigger_frame_bits as u32 & 0xF);
        correct_rollover(candidate, self.event_frame_number, 16)
    }

    /// Resolves a light ROI's 3-bit frame counter against this header's
    /// event frame number.
    pub fn light_frame_number(&self, roi_frame_bits: u16) -> u32 {
        let candidate = (self.event_frame_number & !0x7) | (roi_frame_bits as u32 & 0x7);
        correct_rollover(candidate, self.event_frame_number, 8)
    }

    /// Encodes this header as its six stream words.
    pub fn to_words(&self) -> [u32; FEM_HEADER_WORDS] {
        let mut id_half = FEM_HEADER_TAG | (self.slot & 0x1F) | ((self.fem_id & 0xF) << 5);
        if self.test {
            id_half |= 1 << 9;
        }
        if self.overflow {
            id_half |= 1 << 10;
        }
        if self.full {
            id_half |= 1 << 11;
        }

        let (adc_lo, adc_hi) = fem_payload_halves(self.num_adc_words);
        let (evt_lo, evt_hi) = fem_payload_halves(self.event_number);
        let (frame_lo, frame_hi) = fem_payload_halves(self.event_frame_number);
        let (sum_lo, sum_hi) = fem_payload_halves(self.checksum);

        let trig_lo = FEM_HEADER_TAG
            | ((self.trigger_frame_bits & 0xF) << 4)
            | ((self.trigger_sample >> 8) & 0xF);
        let trig_hi = FEM_HEADER_TAG | (self.trigger_sample & 0xFF);

        [
            pack_halves(0xFFFF, id_half),
            pack_halves(adc_lo, adc_hi),
            pack_halves(evt_lo, evt_hi),
            pack_halves(frame_lo, frame_hi),
            pack_halves(sum_lo, sum_hi),
            pack_halves(trig_lo, trig_hi),
        ]
    }
}

/// Word-at-a-time decoder for the six-word header sequence.
///
/// Feed it every header-tagged word in arrival order; it yields the
/// completed [`FemHeader`] on the sixth word and resets itself for the next
/// FEM.
#[derive(Debug, Default)]
pub struct FemHeaderDecoder {
    next_word: usize,
    partial: FemHeader,
}

impl FemHeaderDecoder {
    pub fn new() -> FemHeaderDecoder {
        FemHeaderDecoder::default()
    }

    /// Resets the state machine back to the first header word, discarding
    /// any partially decoded header.
    pub fn reset(&mut self) {
        self.next_word = 0;
        self.partial = FemHeader::default();
    }

    pub fn feed(&mut self, word: u32) -> Option<FemHeader> {
        let (lo, hi) = split_halves(word);

        match self.next_word {
            0 => {
                self.partial.slot = hi & 0x1F;
                self.partial.fem_id = (hi >> 5) & 0xF;
                self.partial.test = hi & (1 << 9) != 0;
                self.partial.overflow = hi & (1 << 10) != 0;
                self.partial.full = hi & (1 << 11) != 0;
            }
            1 => self.partial.num_adc_words = fem_payload(lo, hi),
            2 => self.partial.event_number = fem_payload(lo, hi),
            3 => self.partial.event_frame_number = fem_payload(lo, hi),
            4 => self.partial.checksum = fem_payload(lo, hi),
            5 => {
                self.partial.trigger_frame_bits = (lo >> 4) & 0xF;
                self.partial.trigger_sample = ((lo & 0xF) << 8) | (hi & 0xFF);

                let header = self.partial;
                self.reset();
                return Some(header);
            }
            _ => unreachable!("header word index out of range"),
        }

        self.next_word += 1;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> FemHeader {
        FemHeader {
            slot: 12,
            fem_id: 3,
            test: false,
            overflow: true,
            full: false,
            num_adc_words: 0x123456,
            event_number: 42,
            event_frame_number: 0x000FF7,
            checksum: 0xABCDE,
            trigger_sample: 0x9A2,
            trigger_frame_bits: 0x7,
        }
    }

    #[test]
    fn encode_then_feed() {
        let header = sample_header();
        let mut decoder = FemHeaderDecoder::new();

        let words = header.to_words();
        for &word in &words[..FEM_HEADER_WORDS - 1] {
            assert_eq!(decoder.feed(word), None);
        }
        let decoded = decoder.feed(words[FEM_HEADER_WORDS - 1]);

        assert_eq!(decoded, Some(header));
    }

    #[test]
    fn all_header_words_are_tagged() {
        for &word in &sample_header().to_words() {
            assert!(crate::words::is_fem_header_word(word));
        }
    }

    #[test]
    fn reset_discards_partial_state() {
        let mut decoder = FemHeaderDecoder::new();
        decoder.feed(sample_header().to_words()[0]);
        decoder.reset();

        let words = FemHeader::default().to_words();
        let mut decoded = None;
        for &word in &words {
            decoded = decoder.feed(word);
        }
        assert_eq!(decoded, Some(FemHeader::default()));
    }

    #[test]
    fn trigger_frame_rollover() {
        let mut header = sample_header();

        // Stored bits just below the event frame number: no correction.
        header.event_frame_number = 0x105;
        header.trigger_frame_bits = 0x3;
        assert_eq!(header.trigger_frame_number(), 0x103);

        // Stored bits wrapped past the 4-bit boundary.
        header.event_frame_number = 0x10E;
        header.trigger_frame_bits = 0x1;
        assert_eq!(header.trigger_frame_number(), 0x111);
    }
}
