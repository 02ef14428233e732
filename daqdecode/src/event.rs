use daqwire::FemHeader;
use serde::Serialize;

/// One decoded event record.
///
/// Events are constructed transiently per read call; the session keeps no
/// history beyond its cursor.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Event {
    /// Zero-based position of this event in the session's read order.
    pub event_index: u64,
    /// Byte offset of the event-start marker within the source file.
    pub byte_offset: u64,
    /// Length in bytes of the raw record, markers included.
    pub byte_len: u64,
    pub fems: Vec<FemReadout>,
}

impl Event {
    pub fn num_fems(&self) -> usize {
        self.fems.len()
    }

    /// All charge channels of the event, across FEMs, in stream order.
    pub fn charge_channels(&self) -> impl Iterator<Item = &ChargeChannel> {
        self.fems.iter().flat_map(|fem| fem.charge.iter())
    }

    /// All light ROIs of the event, across FEMs, in stream order.
    pub fn light_rois(&self) -> impl Iterator<Item = &LightRoi> {
        self.fems.iter().flat_map(|fem| fem.light.iter())
    }

    /// The header of the FEM carrying the light readout, if the event has
    /// one.
    pub fn light_fem(&self, light_slot: u16) -> Option<&FemHeader> {
        self.fems
            .iter()
            .map(|fem| &fem.header)
            .find(|header| header.slot == light_slot)
    }
}

/// The decoded contribution of a single FEM to an event.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FemReadout {
    pub header: FemHeader,
    /// Charge channels; empty for the light FEM.
    pub charge: Vec<ChargeChannel>,
    /// Light ROIs; empty for charge FEMs.
    pub light: Vec<LightRoi>,
}

impl FemReadout {
    pub(crate) fn new(header: FemHeader) -> FemReadout {
        FemReadout {
            header,
            charge: Vec::new(),
            light: Vec::new(),
        }
    }
}

/// One charge channel's waveform.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChargeChannel {
    pub channel: u16,
    pub samples: Vec<u16>,
}

/// One light region of interest.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LightRoi {
    pub channel: u16,
    /// Frame counter, rollover-corrected against the FEM's event frame.
    pub frame_number: u32,
    /// Readout sample counter within the frame.
    pub sample_number: u32,
    pub samples: Vec<u16>,
}
