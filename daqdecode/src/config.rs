use daqwire::MAX_SLOT;

use crate::error::DecodeError;

/// Per-session decoder configuration.
///
/// The light readout shares the wire format with the charge readout; the
/// only way to tell them apart is the crate slot the light FEM sits in,
/// which is fixed per detector setup and supplied when a session opens.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecoderConfig {
    pub light_slot: u16,
}

impl DecoderConfig {
    pub fn new(light_slot: u16) -> DecoderConfig {
        DecoderConfig { light_slot }
    }

    /// Checked at open time only; a session never fails on its
    /// configuration mid-stream.
    pub(crate) fn validate(&self) -> Result<(), DecodeError> {
        if self.light_slot == 0 || self.light_slot > MAX_SLOT {
            return Err(DecodeError::InvalidLightSlot(self.light_slot));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_range() {
        assert!(DecoderConfig::new(16).validate().is_ok());
        assert!(DecoderConfig::new(1).validate().is_ok());
        assert!(DecoderConfig::new(MAX_SLOT).validate().is_ok());
        assert!(matches!(
            DecoderConfig::new(0).validate(),
            Err(DecodeError::InvalidLightSlot(0))
        ));
        assert!(matches!(
            DecoderConfig::new(MAX_SLOT + 1).validate(),
            Err(DecodeError::InvalidLightSlot(_))
        ));
    }
}
