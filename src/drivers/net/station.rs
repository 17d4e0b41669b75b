//! Station (MAC) address lookup.
//!
//! The GXP boards keep one address per UMAC instance in a board EEPROM,
//! 6 bytes per instance starting at offset 0x84. The EEPROM itself sits
//! behind an I2C driver this crate does not provide; it is reached through
//! the read callback of [`EepromAddressSource`].

use crate::drivers::net::netdev::NetworkError;
use crate::net::ethernet::MacAddress;

/// Offset of instance 0's address in the board EEPROM
pub const EEPROM_MAC_OFFSET: usize = 0x84;

/// Provides the factory address of a MAC instance.
pub trait StationAddressSource {
    fn station_address(&mut self, index: u8) -> Option<MacAddress>;
}

/// A board with no address storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAddressSource;

impl StationAddressSource for NoAddressSource {
    fn station_address(&mut self, _index: u8) -> Option<MacAddress> {
        None
    }
}

/// Addresses read out of a byte-addressed EEPROM.
///
/// `read(offset, buf)` fills `buf` from the EEPROM and returns `false` if the
/// device did not answer.
pub struct EepromAddressSource<F> {
    read: F,
}

impl<F> EepromAddressSource<F>
where
    F: FnMut(usize, &mut [u8]) -> bool,
{
    pub fn new(read: F) -> Self {
        Self { read }
    }
}

impl<F> StationAddressSource for EepromAddressSource<F>
where
    F: FnMut(usize, &mut [u8]) -> bool,
{
    fn station_address(&mut self, index: u8) -> Option<MacAddress> {
        let mut bytes = [0u8; 6];
        let offset = EEPROM_MAC_OFFSET + 6 * usize::from(index);
        if !(self.read)(offset, &mut bytes) {
            log::warn!("eeprom: read of MAC {} at {:#x} failed", index, offset);
            return None;
        }
        Some(MacAddress::new(bytes))
    }
}

/// What to do when no stored address is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomFallback {
    /// Fail with `NoStationAddress`
    #[default]
    Disallowed,
    /// Generate a locally-administered address from this seed
    Seed(u64),
}

/// Pick the station address for MAC `index`.
///
/// Order: `preconfigured` if valid, then the source's address if valid,
/// then a random locally-administered address if `fallback` allows it.
pub fn resolve_station_address(
    preconfigured: Option<MacAddress>,
    source: &mut dyn StationAddressSource,
    index: u8,
    fallback: RandomFallback,
) -> Result<MacAddress, NetworkError> {
    if let Some(mac) = preconfigured
        && mac.is_valid()
    {
        return Ok(mac);
    }

    if let Some(mac) = source.station_address(index) {
        if mac.is_valid() {
            return Ok(mac);
        }
        log::warn!("umac{}: stored address {} is not usable", index, mac);
    }

    match fallback {
        RandomFallback::Seed(seed) => {
            let mac = MacAddress::random_local(seed);
            log::warn!("umac{}: using random address {}", index, mac);
            Ok(mac)
        }
        RandomFallback::Disallowed => {
            log::error!("umac{}: no valid station address", index);
            Err(NetworkError::NoStationAddress)
        }
    }
}
