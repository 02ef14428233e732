//! The word-level layout of a DAQ event stream.
//!
//! A stream is a sequence of little-endian 32-bit words. Most words are
//! really two packed 16-bit sub-words where the *low* half arrives first:
//!
//! ```ignore
//!     [16b_word0_R, 16b_word0_L, 16b_word1_R, 16b_word1_L, ...]
//! ```
//!
//! Word categories are distinguished by the top bits of each 16-bit half:
//!
//! - `0xFFFF_FFFF` marks the start of an event, `0xE000_0000` its end. Both
//!   are full 32-bit markers.
//! - FEM header halves carry `0xF` in the top nibble and a 12-bit payload.
//!   24-bit header quantities are split over two halves, *upper* 12 bits
//!   first.
//! - Charge readout: `0x4000 | channel` opens a channel, bare 12-bit ADC
//!   samples (top nibble zero) follow, `0x5000 | channel` closes it.
//! - Light readout: the top two bits select channel-start (`01`),
//!   intermediate (`10`) and channel-end (`11`) words. Intermediate words
//!   use bits 12-13 as a sub-tag: ROI header (`01`), ROI ADC sample (`10`),
//!   ROI end (`11`).
//!
//! Padding halves inserted to keep 32-bit alignment are all-zero and carry
//! no tag, so decoders skip them.

/// Marks the first 32-bit word of every event record.
pub const EVENT_START_MARKER: u32 = 0xFFFF_FFFF;

/// Marks the 32-bit word terminating an event record.
pub const EVENT_END_MARKER: u32 = 0xE000_0000;

pub const FEM_HEADER_TAG: u16 = 0xF000;
pub const CHARGE_CHANNEL_START_TAG: u16 = 0x4000;
pub const CHARGE_CHANNEL_END_TAG: u16 = 0x5000;

pub const LIGHT_CHANNEL_START_TAG: u16 = 0x4000;
pub const LIGHT_CHANNEL_INTMED_TAG: u16 = 0x8000;
pub const LIGHT_CHANNEL_END_TAG: u16 = 0xC000;
pub const LIGHT_ROI_HEADER_TAG: u16 = 0x1000;
pub const LIGHT_ROI_ADC_TAG: u16 = 0x2000;
pub const LIGHT_ROI_END_TAG: u16 = 0x3000;

/// Splits a 32-bit stream word into its two 16-bit halves, in arrival
/// order (low half first).
#[inline]
pub fn split_halves(word: u32) -> (u16, u16) {
    ((word & 0xFFFF) as u16, (word >> 16) as u16)
}

#[inline]
pub fn pack_halves(lo: u16, hi: u16) -> u32 {
    ((hi as u32) << 16) | (lo as u32)
}

#[inline]
pub fn is_event_start(word: u32) -> bool {
    word == EVENT_START_MARKER
}

#[inline]
pub fn is_event_end(word: u32) -> bool {
    word == EVENT_END_MARKER
}

/// FEM header words are recognized by the tag nibble of the half that
/// arrives first.
#[inline]
pub fn is_fem_header_word(word: u32) -> bool {
    (word as u16) & 0xF000 == FEM_HEADER_TAG
}

#[inline]
pub fn is_charge_channel_start(half: u16) -> bool {
    half & 0xF000 == CHARGE_CHANNEL_START_TAG
}

#[inline]
pub fn is_charge_channel_end(half: u16) -> bool {
    half & 0xF000 == CHARGE_CHANNEL_END_TAG
}

#[inline]
pub fn is_charge_adc_word(half: u16) -> bool {
    half & 0xF000 == 0
}

#[inline]
pub fn is_light_channel_start(half: u16) -> bool {
    half & 0xC000 == LIGHT_CHANNEL_START_TAG
}

#[inline]
pub fn is_light_channel_end(half: u16) -> bool {
    half & 0xC000 == LIGHT_CHANNEL_END_TAG
}

#[inline]
pub fn is_light_intermediate(half: u16) -> bool {
    half & 0xC000 == LIGHT_CHANNEL_INTMED_TAG
}

// The ROI sub-tag predicates are only meaningful on intermediate words.

#[inline]
pub fn is_light_roi_header(half: u16) -> bool {
    half & 0x3000 == LIGHT_ROI_HEADER_TAG
}

#[inline]
pub fn is_light_roi_adc(half: u16) -> bool {
    half & 0x3000 == LIGHT_ROI_ADC_TAG
}

#[inline]
pub fn is_light_roi_end(half: u16) -> bool {
    half & 0x3000 == LIGHT_ROI_END_TAG
}

/// The 6-bit channel number carried by channel start/end halves.
#[inline]
pub fn channel_number(half: u16) -> u16 {
    half & 0x3F
}

/// The 12-bit payload of a tagged half.
#[inline]
pub fn payload12(half: u16) -> u16 {
    half & 0x0FFF
}

/// Packs a 24-bit header quantity into two FEM-tagged halves, upper 12 bits
/// in the half that arrives first.
#[inline]
pub fn fem_payload_halves(value: u32) -> (u16, u16) {
    let upper = ((value >> 12) & 0xFFF) as u16;
    let lower = (value & 0xFFF) as u16;
    (FEM_HEADER_TAG | upper, FEM_HEADER_TAG | lower)
}

/// Reassembles a 24-bit header quantity from its two halves.
#[inline]
pub fn fem_payload(lo: u16, hi: u16) -> u32 {
    (((lo & 0xFFF) as u32) << 12) | ((hi & 0xFFF) as u32)
}
