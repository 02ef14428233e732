use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use daqwire::{EventStreamBuilder, FemHeader, LightRoiHeader};

#[derive(Parser, Debug)]
struct Opt {
    output: PathBuf,

    /// Number of events to write
    #[clap(long, default_value = "10")]
    events: u32,

    /// Crate slot used for the light readout FEM
    #[clap(long, default_value = "16")]
    light_slot: u16,

    /// Charge FEM slots to populate
    #[clap(long, default_value = "3", value_delimiter = ',')]
    charge_slots: Vec<u16>,
}

/// A deterministic fake waveform: a square pulse on a flat pedestal.
fn pulse(baseline: u16, amplitude: u16, len: usize) -> Vec<u16> {
    let mut samples = vec![baseline; len];
    for sample in samples.iter_mut().skip(len / 4).take(len / 2) {
        *sample = baseline + amplitude;
    }
    samples
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opt = Opt::parse();

    let mut builder = EventStreamBuilder::new();

    for i in 0..opt.events {
        let frame = 0x100 + i;
        builder.event(|event| {
            for (f, &slot) in opt.charge_slots.iter().enumerate() {
                event.fem(&FemHeader {
                    slot,
                    fem_id: f as u16,
                    event_number: i,
                    event_frame_number: frame,
                    ..FemHeader::default()
                });
                for channel in 0..4 {
                    event.charge_channel(channel, &pulse(800, 50 + 10 * channel, 64));
                }
            }

            event
                .fem(&FemHeader {
                    slot: opt.light_slot,
                    event_number: i,
                    event_frame_number: frame,
                    trigger_frame_bits: (frame & 0xF) as u16,
                    trigger_sample: 0x40,
                    ..FemHeader::default()
                })
                .begin_light_channel();
            for channel in 0..2 {
                event.light_roi(
                    &LightRoiHeader {
                        channel,
                        frame_bits: (frame & 0x7) as u16,
                        sample_number: 128 * (channel as u32 + 1),
                    },
                    &pulse(2048, 400, 32),
                );
            }
            event.end_light_channel();
        });
    }

    builder.save(&opt.output)?;
    println!(
        "wrote {} events ({} words) to `{}`",
        opt.events,
        builder.num_words(),
        opt.output.display()
    );

    Ok(())
}
