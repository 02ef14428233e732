//! Light readout ROI headers.
//!
//! Inside a light channel each region of interest (ROI) starts with three
//! intermediate header halves carrying the channel number, a 3-bit frame
//! counter and a 17-bit readout sample counter, followed by the ADC sample
//! halves and an ROI end half.

use serde::Serialize;

use crate::words::{LIGHT_CHANNEL_INTMED_TAG, LIGHT_ROI_HEADER_TAG};

/// Number of light readout channels per FEM.
pub const NUM_LIGHT_CHANNELS: usize = 32;

const ROI_HEADER_BASE: u16 = LIGHT_CHANNEL_INTMED_TAG | LIGHT_ROI_HEADER_TAG;

/// The decoded three-half ROI header.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LightRoiHeader {
    pub channel: u16,
    /// Low three bits of the frame counter as stored on the wire. Resolve
    /// with [`crate::FemHeader::light_frame_number`].
    pub frame_bits: u16,
    /// Readout sample counter within the frame window.
    pub sample_number: u32,
}

impl LightRoiHeader {
    pub fn to_halves(&self) -> [u16; 3] {
        [
            ROI_HEADER_BASE | (self.channel & 0x3F),
            ROI_HEADER_BASE | ((self.frame_bits & 0x7) << 5) | ((self.sample_number >> 12) as u16 & 0x1F),
            ROI_HEADER_BASE | (self.sample_number as u16 & 0xFFF),
        ]
    }

    pub fn from_halves(halves: [u16; 3]) -> LightRoiHeader {
        LightRoiHeader {
            channel: halves[0] & 0x3F,
            frame_bits: (halves[1] >> 5) & 0x7,
            sample_number: (((halves[1] & 0x1F) as u32) << 12) | ((halves[2] & 0xFFF) as u32),
        }
    }
}

/// Re-bases a truncated frame counter onto a full-width reference counter.
///
/// The wire only stores the low bits of per-ROI frame counters; a counter
/// read shortly before or after the reference may have wrapped within the
/// truncated range. Values more than half the modulus away from the
/// reference are folded back by one modulus.
pub fn correct_rollover(value: u32, reference: u32, modulus: u32) -> u32 {
    let diff = value as i64 - reference as i64;
    let half = (modulus / 2) as i64;

    let corrected = if diff > half {
        value as i64 - modulus as i64
    } else if diff < -half {
        value as i64 + modulus as i64
    } else {
        value as i64
    };

    // Frame counters start at zero; never fold below that.
    corrected.max(0) as u32
}
