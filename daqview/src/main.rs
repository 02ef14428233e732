use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use daqdecode::{DecoderConfig, Event, EventStream};

#[derive(Parser, Debug)]
struct Opt {
    file: PathBuf,

    /// The crate slot carrying the light readout FEM
    #[clap(long, default_value = "16")]
    light_slot: u16,

    /// Read at most this many events
    #[clap(long)]
    count: Option<usize>,

    /// Print each event as JSON instead of a summary line
    #[clap(long)]
    json: bool,
}

fn print_event(event: &Event, json: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!(
            "event {:>6}: {} FEMs, {} charge channels, {} light ROIs, {} bytes at offset {}",
            event.event_index,
            event.num_fems(),
            event.charge_channels().count(),
            event.light_rois().count(),
            event.byte_len,
            event.byte_offset,
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::init();
    let opt = Opt::parse();

    let mut stream = EventStream::open(&opt.file, DecoderConfig::new(opt.light_slot))?;

    let num_events = match opt.count {
        Some(count) => {
            let events = stream.read_count(count)?;
            for event in &events {
                print_event(event, opt.json)?;
            }
            events.len() as u64
        }
        None => {
            for event in stream.events() {
                print_event(&event, opt.json)?;
            }
            stream.num_events_decoded()
        }
    };

    eprintln!("{} events decoded", num_events);

    Ok(())
}
