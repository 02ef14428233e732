mod builder;
mod fem_header;
mod light;
pub mod words;

pub use crate::builder::{EventStreamBuilder, EventWriter};
pub use crate::fem_header::{FemHeader, FemHeaderDecoder, FEM_HEADER_WORDS, MAX_SLOT};
pub use crate::light::{correct_rollover, LightRoiHeader, NUM_LIGHT_CHANNELS};
