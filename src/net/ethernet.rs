//! Ethernet link-layer basics
//!
//! MAC address representation and the frame size limits the driver enforces.

use core::fmt;
use core::str::FromStr;

/// Minimum frame size (excluding CRC): 14 byte header + 46 byte min payload
pub const MIN_FRAME_SIZE: usize = 60;

/// Maximum frame size (excluding CRC): 14 byte header + 1500 byte max payload
pub const MAX_FRAME_SIZE: usize = 1514;

/// 48-bit MAC (Media Access Control) address
///
/// Represents a unique hardware address for Ethernet network interfaces.
/// Format: 6 bytes, typically displayed as XX:XX:XX:XX:XX:XX in hexadecimal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Create a new MAC address from 6 bytes
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (FF:FF:FF:FF:FF:FF)
    pub const fn broadcast() -> Self {
        Self([0xFF; 6])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00; 6])
    }

    /// Random locally-administered unicast address.
    ///
    /// The generator is a xorshift64 seeded with `seed`; a zero seed is
    /// replaced by a fixed non-zero constant.
    pub fn random_local(seed: u64) -> Self {
        let mut state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;

        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&state.to_le_bytes()[..6]);
        bytes[0] &= 0xFE; // unicast
        bytes[0] |= 0x02; // locally administered
        Self(bytes)
    }

    /// Check if this is a broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Check if this is a multicast address (bit 0 of first byte is 1)
    pub fn is_multicast(&self) -> bool {
        (self.0[0] & 0x01) != 0
    }

    /// Check if this is a unicast address (not multicast)
    pub fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }

    /// Check if the locally-administered bit is set
    pub fn is_local(&self) -> bool {
        (self.0[0] & 0x02) != 0
    }

    /// Usable as a station address: unicast and not all zeros
    pub fn is_valid(&self) -> bool {
        self.is_unicast() && self.0 != [0x00; 6]
    }

    /// Get the bytes of this MAC address
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

/// Parse a MAC address from a colon-separated hex string
///
/// Example: "1C:98:EC:12:34:56"
impl FromStr for MacAddress {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');

        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or(())?;
            if part.is_empty() || part.len() > 2 {
                return Err(());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| ())?;
        }

        if parts.next().is_some() {
            return Err(());
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}
