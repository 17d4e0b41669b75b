//! PHY management.
//!
//! Two pieces:
//!
//! - [`bringup`]: the vendor-specific part. Puts a transceiver into a known
//!   interface mode, resets it and waits for the reset to finish.
//! - [`LinkNegotiator`]: the generic part. Programs advertisement, waits for
//!   auto-negotiation and reports the resulting [`LinkState`].
//!   [`MiiNegotiator`] implements it with the IEEE 802.3 clause 22 registers.

pub mod bringup;

pub use bringup::{ModeSelect, PhyBringup, PhyInterface, PhyProfile, PhyState, ResetTarget};

use core::fmt;
use core::ops::BitOr;

use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::mdio::{MdioBus, MdioError};
use crate::drivers::poll::{Backoff, Poller};
use crate::drivers::timer::spin_delay_us;

// ============================================================================
// Standard MII registers
// ============================================================================

pub const MII_BMCR: u8 = 0x00;
pub const MII_BMSR: u8 = 0x01;
pub const MII_PHYSID1: u8 = 0x02;
pub const MII_PHYSID2: u8 = 0x03;
pub const MII_ADVERTISE: u8 = 0x04;
pub const MII_LPA: u8 = 0x05;
pub const MII_CTRL1000: u8 = 0x09;
pub const MII_STAT1000: u8 = 0x0A;

// BMCR bits
pub const BMCR_RESET: u16 = 1 << 15;
pub const BMCR_LOOPBACK: u16 = 1 << 14;
pub const BMCR_SPEED100: u16 = 1 << 13;
pub const BMCR_ANENABLE: u16 = 1 << 12;
pub const BMCR_ISOLATE: u16 = 1 << 10;
pub const BMCR_ANRESTART: u16 = 1 << 9;
pub const BMCR_FULLDPLX: u16 = 1 << 8;
pub const BMCR_SPEED1000: u16 = 1 << 6;

// BMSR bits
pub const BMSR_LSTATUS: u16 = 1 << 2;
pub const BMSR_ANEGCOMPLETE: u16 = 1 << 5;

// ADVERTISE / LPA bits
pub const ADVERTISE_CSMA: u16 = 0x0001;
pub const ADVERTISE_10HALF: u16 = 1 << 5;
pub const ADVERTISE_10FULL: u16 = 1 << 6;
pub const ADVERTISE_100HALF: u16 = 1 << 7;
pub const ADVERTISE_100FULL: u16 = 1 << 8;
pub const ADVERTISE_ALL: u16 =
    ADVERTISE_10HALF | ADVERTISE_10FULL | ADVERTISE_100HALF | ADVERTISE_100FULL;

// 1000BASE-T control / status bits
pub const ADVERTISE_1000HALF: u16 = 1 << 8;
pub const ADVERTISE_1000FULL: u16 = 1 << 9;
pub const LPA_1000HALF: u16 = 1 << 10;
pub const LPA_1000FULL: u16 = 1 << 11;

/// Auto-negotiation budget: 4000 polls, 1 ms apart.
const ANEG_POLLS: u32 = 4000;
const ANEG_POLL_INTERVAL_US: u32 = 1000;

// ============================================================================
// Link parameters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSpeed {
    Speed10,
    Speed100,
    Speed1000,
}

impl LinkSpeed {
    pub const fn mbps(self) -> u32 {
        match self {
            LinkSpeed::Speed10 => 10,
            LinkSpeed::Speed100 => 100,
            LinkSpeed::Speed1000 => 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    Half,
    Full,
}

/// Negotiated link, as seen by the MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    pub link: bool,
    pub speed: LinkSpeed,
    pub duplex: Duplex,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            link: false,
            speed: LinkSpeed::Speed10,
            duplex: Duplex::Half,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.link {
            return write!(f, "down");
        }
        write!(
            f,
            "{} Mbps, {} duplex",
            self.speed.mbps(),
            match self.duplex {
                Duplex::Full => "full",
                Duplex::Half => "half",
            }
        )
    }
}

/// Link modes a PHY may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const BASE10_HALF: Self = Self(1 << 0);
    pub const BASE10_FULL: Self = Self(1 << 1);
    pub const BASE100_HALF: Self = Self(1 << 2);
    pub const BASE100_FULL: Self = Self(1 << 3);
    pub const BASE1000_HALF: Self = Self(1 << 4);
    pub const BASE1000_FULL: Self = Self(1 << 5);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Fastest mode in the set, full duplex preferred.
    pub fn best(self) -> Option<(LinkSpeed, Duplex)> {
        [
            (Self::BASE1000_FULL, LinkSpeed::Speed1000, Duplex::Full),
            (Self::BASE1000_HALF, LinkSpeed::Speed1000, Duplex::Half),
            (Self::BASE100_FULL, LinkSpeed::Speed100, Duplex::Full),
            (Self::BASE100_HALF, LinkSpeed::Speed100, Duplex::Half),
            (Self::BASE10_FULL, LinkSpeed::Speed10, Duplex::Full),
            (Self::BASE10_HALF, LinkSpeed::Speed10, Duplex::Half),
        ]
        .into_iter()
        .find(|(cap, _, _)| self.contains(*cap))
        .map(|(_, speed, duplex)| (speed, duplex))
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
// Generic negotiation
// ============================================================================

/// Generic link negotiation, run after the vendor bring-up.
pub trait LinkNegotiator<R: RegisterBus> {
    /// Program what the PHY advertises, or force the link mode when
    /// auto-negotiation is off.
    fn configure(&mut self, bus: &MdioBus<R>, addr: u8, profile: &PhyProfile)
    -> Result<(), MdioError>;

    /// Wait for the link to settle and report it.
    fn startup(
        &mut self,
        bus: &MdioBus<R>,
        addr: u8,
        profile: &PhyProfile,
    ) -> Result<LinkState, MdioError>;

    /// Quiesce the PHY when the interface is halted.
    fn shutdown(&mut self, _bus: &MdioBus<R>, _addr: u8) -> Result<(), MdioError> {
        Ok(())
    }
}

/// Clause 22 auto-negotiation.
#[derive(Debug, Clone, Copy)]
pub struct MiiNegotiator {
    aneg_poll: Poller,
}

impl Default for MiiNegotiator {
    fn default() -> Self {
        Self::new(Poller::bounded(ANEG_POLLS).with_backoff(Backoff::Delay {
            us: ANEG_POLL_INTERVAL_US,
            delay: spin_delay_us,
        }))
    }
}

impl MiiNegotiator {
    pub const fn new(aneg_poll: Poller) -> Self {
        Self { aneg_poll }
    }

    /// Read the 32-bit PHY identifier (PHYSID1 high, PHYSID2 low).
    pub fn phy_id<R: RegisterBus>(bus: &MdioBus<R>, addr: u8) -> Result<u32, MdioError> {
        let id1 = u32::from(bus.read(addr, MII_PHYSID1)?);
        let id2 = u32::from(bus.read(addr, MII_PHYSID2)?);
        Ok((id1 << 16) | id2)
    }

    /// Resolve speed/duplex from what both ends advertised.
    fn resolve<R: RegisterBus>(
        bus: &MdioBus<R>,
        addr: u8,
        supported: Capabilities,
    ) -> Result<(LinkSpeed, Duplex), MdioError> {
        if supported.contains(Capabilities::BASE1000_HALF)
            || supported.contains(Capabilities::BASE1000_FULL)
        {
            let ctrl1000 = bus.read(addr, MII_CTRL1000)?;
            let stat1000 = bus.read(addr, MII_STAT1000)?;
            // Partner bits sit two above our advertisement bits.
            let common = (ctrl1000 << 2) & stat1000;
            if common & LPA_1000FULL != 0 {
                return Ok((LinkSpeed::Speed1000, Duplex::Full));
            }
            if common & LPA_1000HALF != 0 {
                return Ok((LinkSpeed::Speed1000, Duplex::Half));
            }
        }

        let common = bus.read(addr, MII_ADVERTISE)? & bus.read(addr, MII_LPA)?;
        Ok(if common & ADVERTISE_100FULL != 0 {
            (LinkSpeed::Speed100, Duplex::Full)
        } else if common & ADVERTISE_100HALF != 0 {
            (LinkSpeed::Speed100, Duplex::Half)
        } else if common & ADVERTISE_10FULL != 0 {
            (LinkSpeed::Speed10, Duplex::Full)
        } else {
            (LinkSpeed::Speed10, Duplex::Half)
        })
    }
}

impl<R: RegisterBus> LinkNegotiator<R> for MiiNegotiator {
    fn configure(
        &mut self,
        bus: &MdioBus<R>,
        addr: u8,
        profile: &PhyProfile,
    ) -> Result<(), MdioError> {
        let supported = profile.supported;

        if !profile.autoneg {
            let (speed, duplex) = supported
                .best()
                .unwrap_or((LinkSpeed::Speed10, Duplex::Half));
            let mut bmcr = bus.read(addr, MII_BMCR)?;
            bmcr &= !(BMCR_SPEED100 | BMCR_SPEED1000 | BMCR_FULLDPLX | BMCR_ANENABLE);
            bmcr |= match speed {
                LinkSpeed::Speed1000 => BMCR_SPEED1000,
                LinkSpeed::Speed100 => BMCR_SPEED100,
                LinkSpeed::Speed10 => 0,
            };
            if duplex == Duplex::Full {
                bmcr |= BMCR_FULLDPLX;
            }
            return bus.write(addr, MII_BMCR, bmcr);
        }

        let mut adv = bus.read(addr, MII_ADVERTISE)?;
        adv &= !ADVERTISE_ALL;
        adv |= ADVERTISE_CSMA;
        for (cap, bit) in [
            (Capabilities::BASE10_HALF, ADVERTISE_10HALF),
            (Capabilities::BASE10_FULL, ADVERTISE_10FULL),
            (Capabilities::BASE100_HALF, ADVERTISE_100HALF),
            (Capabilities::BASE100_FULL, ADVERTISE_100FULL),
        ] {
            if supported.contains(cap) {
                adv |= bit;
            }
        }
        bus.write(addr, MII_ADVERTISE, adv)?;

        let mut ctrl1000 = bus.read(addr, MII_CTRL1000)?;
        ctrl1000 &= !(ADVERTISE_1000HALF | ADVERTISE_1000FULL);
        if supported.contains(Capabilities::BASE1000_HALF) {
            ctrl1000 |= ADVERTISE_1000HALF;
        }
        if supported.contains(Capabilities::BASE1000_FULL) {
            ctrl1000 |= ADVERTISE_1000FULL;
        }
        bus.write(addr, MII_CTRL1000, ctrl1000)?;

        let mut bmcr = bus.read(addr, MII_BMCR)?;
        bmcr |= BMCR_ANENABLE | BMCR_ANRESTART;
        bmcr &= !BMCR_ISOLATE;
        bus.write(addr, MII_BMCR, bmcr)
    }

    fn startup(
        &mut self,
        bus: &MdioBus<R>,
        addr: u8,
        profile: &PhyProfile,
    ) -> Result<LinkState, MdioError> {
        let mut negotiated = true;
        if profile.autoneg {
            let mut failure = None;
            let waited = self.aneg_poll.poll_until(|| match bus.read(addr, MII_BMSR) {
                Ok(bmsr) => bmsr & BMSR_ANEGCOMPLETE != 0,
                Err(err) => {
                    failure = Some(err);
                    true
                }
            });
            if let Some(err) = failure {
                return Err(err);
            }
            if waited.is_err() {
                log::warn!("{}: PHY{} auto-negotiation timed out", bus.name(), addr);
                negotiated = false;
            }
        }

        // Link status is latched low; the second read is current.
        bus.read(addr, MII_BMSR)?;
        let bmsr = bus.read(addr, MII_BMSR)?;
        let link = negotiated && bmsr & BMSR_LSTATUS != 0;

        let (speed, duplex) = if profile.autoneg {
            Self::resolve(bus, addr, profile.supported)?
        } else {
            profile
                .supported
                .best()
                .unwrap_or((LinkSpeed::Speed10, Duplex::Half))
        };

        Ok(LinkState {
            link,
            speed,
            duplex,
        })
    }
}
