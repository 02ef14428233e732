//! Reconstruction of full light waveforms from decoded ROIs.
//!
//! The light readout only ships regions of interest; samples outside every
//! ROI sit at the ADC baseline. To plot or analyze a channel over the full
//! frame window, the ROIs are placed back onto a baseline-filled waveform
//! using their frame and readout-sample counters, rebased on the earliest
//! frame seen in the event.

use rustc_hash::FxHashMap;

use daqwire::NUM_LIGHT_CHANNELS;

use crate::event::Event;

/// Samples per readout frame: time size 255 at the 32 MHz light clock.
pub const SAMPLES_PER_FRAME: usize = 255 * 32;

/// Light sampling interval in nanoseconds.
pub const LIGHT_SAMPLE_INTERVAL_NS: f64 = 15.625;

/// ADC pedestal used for samples outside every ROI.
pub const ADC_BASELINE: u16 = 2048;

fn min_frame(event: &Event) -> Option<u32> {
    event.light_rois().map(|roi| roi.frame_number).min()
}

/// Reconstructs one channel's waveform over `num_frames` frames.
///
/// ROIs on other channels are ignored; ROIs reaching past the window are
/// clipped at its end.
pub fn reconstruct_channel(event: &Event, channel: u16, num_frames: usize) -> Vec<u16> {
    let mut waveform = vec![ADC_BASELINE; num_frames * SAMPLES_PER_FRAME];

    let min_frame = match min_frame(event) {
        Some(frame) => frame,
        None => return waveform,
    };

    for roi in event.light_rois() {
        if roi.channel != channel {
            continue;
        }

        let frame_offset = (roi.frame_number - min_frame) as usize * SAMPLES_PER_FRAME;
        let start = roi.sample_number as usize + frame_offset;
        if start >= waveform.len() {
            continue;
        }

        let end = (start + roi.samples.len()).min(waveform.len());
        waveform[start..end].copy_from_slice(&roi.samples[..end - start]);
    }

    waveform
}

/// Reconstructs every populated channel of the event. Channel numbers
/// outside the light readout range are skipped.
pub fn reconstruct_all(event: &Event, num_frames: usize) -> FxHashMap<u16, Vec<u16>> {
    let mut waveforms = FxHashMap::default();

    for roi in event.light_rois() {
        if roi.channel as usize >= NUM_LIGHT_CHANNELS {
            continue;
        }
        if !waveforms.contains_key(&roi.channel) {
            waveforms.insert(roi.channel, reconstruct_channel(event, roi.channel, num_frames));
        }
    }

    waveforms
}

/// The trigger-relative time axis matching [`reconstruct_channel`], in
/// nanoseconds. `None` if the event has no FEM in the light slot.
pub fn time_axis(event: &Event, light_slot: u16, num_frames: usize) -> Option<Vec<f64>> {
    let header = event.light_fem(light_slot)?;
    let min_frame = min_frame(event).unwrap_or(0);

    let frame_offset = header.trigger_frame_number().saturating_sub(min_frame) as f64
        * LIGHT_SAMPLE_INTERVAL_NS;
    let trigger_index = frame_offset + (header.trigger_sample as f64) * 32.0;

    Some(
        (0..num_frames * SAMPLES_PER_FRAME)
            .map(|tick| (tick as f64 - trigger_index) * LIGHT_SAMPLE_INTERVAL_NS)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FemReadout, LightRoi};
    use daqwire::FemHeader;

    fn light_event(rois: Vec<LightRoi>) -> Event {
        Event {
            event_index: 0,
            byte_offset: 0,
            byte_len: 0,
            fems: vec![FemReadout {
                header: FemHeader {
                    slot: 16,
                    event_frame_number: 10,
                    trigger_frame_bits: 10 & 0xF,
                    trigger_sample: 0,
                    ..FemHeader::default()
                },
                charge: Vec::new(),
                light: rois,
            }],
        }
    }

    #[test]
    fn places_rois_on_baseline() {
        let event = light_event(vec![
            LightRoi {
                channel: 3,
                frame_number: 10,
                sample_number: 4,
                samples: vec![100, 200, 300],
            },
            LightRoi {
                channel: 3,
                frame_number: 11,
                sample_number: 0,
                samples: vec![50],
            },
            LightRoi {
                channel: 7,
                frame_number: 10,
                sample_number: 0,
                samples: vec![999],
            },
        ]);

        let waveform = reconstruct_channel(&event, 3, 2);
        assert_eq!(waveform.len(), 2 * SAMPLES_PER_FRAME);

        assert_eq!(waveform[3], ADC_BASELINE);
        assert_eq!(&waveform[4..7], &[100, 200, 300]);
        assert_eq!(waveform[7], ADC_BASELINE);
        // Second ROI lands at the start of the next frame.
        assert_eq!(waveform[SAMPLES_PER_FRAME], 50);
        // Channel 7's ROI does not leak into channel 3.
        assert_eq!(waveform[0], ADC_BASELINE);
    }

    #[test]
    fn clips_roi_at_window_end() {
        let last = SAMPLES_PER_FRAME - 1;
        let event = light_event(vec![LightRoi {
            channel: 0,
            frame_number: 10,
            sample_number: last as u32,
            samples: vec![1, 2, 3],
        }]);

        let waveform = reconstruct_channel(&event, 0, 1);
        assert_eq!(waveform[last], 1);
        // Samples 2 and 3 fell outside the window.
        assert_eq!(waveform.len(), SAMPLES_PER_FRAME);
    }

    #[test]
    fn reconstructs_populated_channels_only() {
        let event = light_event(vec![
            LightRoi {
                channel: 1,
                frame_number: 10,
                sample_number: 0,
                samples: vec![7],
            },
            LightRoi {
                channel: 40,
                frame_number: 10,
                sample_number: 0,
                samples: vec![8],
            },
        ]);

        let waveforms = reconstruct_all(&event, 1);
        assert_eq!(waveforms.len(), 1);
        assert!(waveforms.contains_key(&1));
    }

    #[test]
    fn time_axis_is_trigger_relative() {
        let event = light_event(Vec::new());

        let axis = time_axis(&event, 16, 1).unwrap();
        assert_eq!(axis.len(), SAMPLES_PER_FRAME);
        // Trigger at frame 10 rebased on min frame 0 (no ROIs), sample 0.
        let trigger_index = 10.0 * LIGHT_SAMPLE_INTERVAL_NS;
        assert!((axis[0] - (0.0 - trigger_index) * LIGHT_SAMPLE_INTERVAL_NS).abs() < 1e-9);
        assert!((axis[1] - axis[0] - LIGHT_SAMPLE_INTERVAL_NS).abs() < 1e-9);

        assert!(time_axis(&event, 5, 1).is_none());
    }
}
