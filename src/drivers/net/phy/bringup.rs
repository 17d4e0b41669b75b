//! Vendor PHY bring-up.
//!
//! A [`PhyBringup`] walks one transceiver through
//!
//! ```text
//! Unconfigured -> ModeSelected -> SoftResetIssued -> ResetComplete -> Configured
//! ```
//!
//! driven by a [`PhyProfile`] that says which register selects the interface
//! mode, which register carries the reset, and whether generic
//! auto-negotiation follows. Three profiles cover the GXP boards:
//!
//! - [`PhyProfile::sgmii_to_copper`]: external Marvell-style PHY, paged, mode
//!   register 20 on page 18
//! - [`PhyProfile::internal`]: on-die PHY of the standard board, reset
//!   through BMCR with auto-negotiation enabled
//! - [`PhyProfile::internal_fixed_gmii`]: on-die PHY on Gen10+, GMII fixed
//!   at 1000/full, reset already in flight at hand-over

use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::mdio::MdioBus;
use crate::drivers::net::netdev::NetworkError;
use crate::drivers::poll::Poller;

use super::{BMCR_ANENABLE, BMCR_LOOPBACK, BMCR_RESET, Capabilities, LinkNegotiator, MII_BMCR};

/// Page-select register on paged PHYs
pub const PAGE_SELECT: u8 = 22;

/// Bring-up progress of one PHY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyState {
    Unconfigured,
    ModeSelected,
    SoftResetIssued,
    ResetComplete,
    Configured,
}

/// MAC-side interface of the PHY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyInterface {
    Sgmii,
    Gmii,
}

/// Read-modify-write of a paged mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSelect {
    pub page: u16,
    pub register: u8,
    pub mask: u16,
    pub value: u16,
}

/// Where the soft reset is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    /// Bit 15 of the mode register, OR'd into the value just selected
    ModeRegister,
    /// Bit 15 of BMCR, optionally with auto-negotiation enabled
    Control { enable_autoneg: bool },
    /// Reset was started before hand-over; only wait for it
    AlreadyPending,
}

/// Everything that differs between the PHYs on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhyProfile {
    pub interface: PhyInterface,
    pub supported: Capabilities,
    pub autoneg: bool,
    pub mode_select: Option<ModeSelect>,
    pub reset: ResetTarget,
    /// Reset the copper side through BMCR after the mode reset
    pub core_reset: bool,
    /// Run generic configuration once reset is done
    pub negotiate: bool,
}

impl PhyProfile {
    /// External PHY in SGMII-to-copper mode.
    pub const fn sgmii_to_copper() -> Self {
        Self {
            interface: PhyInterface::Sgmii,
            supported: Capabilities(
                Capabilities::BASE10_HALF.0
                    | Capabilities::BASE10_FULL.0
                    | Capabilities::BASE100_HALF.0
                    | Capabilities::BASE100_FULL.0
                    | Capabilities::BASE1000_FULL.0,
            ),
            autoneg: true,
            mode_select: Some(ModeSelect {
                page: 18,
                register: 20,
                mask: 0x0007,
                value: 0x0001,
            }),
            reset: ResetTarget::ModeRegister,
            core_reset: true,
            negotiate: true,
        }
    }

    /// On-die PHY feeding the external one (standard board).
    pub const fn internal() -> Self {
        Self {
            interface: PhyInterface::Gmii,
            supported: Capabilities(
                Capabilities::BASE10_HALF.0
                    | Capabilities::BASE10_FULL.0
                    | Capabilities::BASE100_HALF.0
                    | Capabilities::BASE100_FULL.0
                    | Capabilities::BASE1000_FULL.0,
            ),
            autoneg: true,
            mode_select: None,
            reset: ResetTarget::Control {
                enable_autoneg: true,
            },
            core_reset: false,
            negotiate: false,
        }
    }

    /// On-die PHY as the only PHY (Gen10+), fixed 1000/full.
    pub const fn internal_fixed_gmii() -> Self {
        Self {
            interface: PhyInterface::Gmii,
            supported: Capabilities::BASE1000_FULL,
            autoneg: false,
            mode_select: None,
            reset: ResetTarget::AlreadyPending,
            core_reset: false,
            negotiate: true,
        }
    }
}

/// Bring-up of one PHY on one bus.
pub struct PhyBringup<'a, R> {
    bus: &'a MdioBus<R>,
    addr: u8,
    profile: PhyProfile,
    poll: Poller,
    state: PhyState,
    mode_value: u16,
}

impl<'a, R: RegisterBus> PhyBringup<'a, R> {
    pub fn new(bus: &'a MdioBus<R>, addr: u8, profile: PhyProfile, poll: Poller) -> Self {
        Self {
            bus,
            addr,
            profile,
            poll,
            state: PhyState::Unconfigured,
            mode_value: 0,
        }
    }

    pub fn state(&self) -> PhyState {
        self.state
    }

    pub fn profile(&self) -> &PhyProfile {
        &self.profile
    }

    /// Perform one transition. `Configured` is terminal.
    pub fn step<N: LinkNegotiator<R>>(
        &mut self,
        negotiator: &mut N,
    ) -> Result<PhyState, NetworkError> {
        let next = match self.state {
            PhyState::Unconfigured => {
                self.clear_loopback()?;
                if let Some(sel) = self.profile.mode_select {
                    self.bus.write(self.addr, PAGE_SELECT, sel.page)?;
                    self.mode_value =
                        self.bus
                            .modify(self.addr, sel.register, sel.mask, sel.value)?;
                }
                PhyState::ModeSelected
            }
            PhyState::ModeSelected => {
                match self.profile.reset {
                    ResetTarget::ModeRegister => {
                        if let Some(sel) = self.profile.mode_select {
                            self.bus
                                .write(self.addr, sel.register, self.mode_value | BMCR_RESET)?;
                        }
                    }
                    ResetTarget::Control { enable_autoneg } => {
                        let mut bmcr = self.bus.read(self.addr, MII_BMCR)?;
                        if enable_autoneg {
                            bmcr |= BMCR_ANENABLE;
                        }
                        self.bus.write(self.addr, MII_BMCR, bmcr | BMCR_RESET)?;
                    }
                    ResetTarget::AlreadyPending => {}
                }
                PhyState::SoftResetIssued
            }
            PhyState::SoftResetIssued => {
                let reg = match (self.profile.reset, self.profile.mode_select) {
                    (ResetTarget::ModeRegister, Some(sel)) => sel.register,
                    _ => MII_BMCR,
                };
                self.wait_reset(reg)?;
                PhyState::ResetComplete
            }
            PhyState::ResetComplete => {
                if self.profile.core_reset {
                    if self.profile.mode_select.is_some() {
                        self.bus.write(self.addr, PAGE_SELECT, 0)?;
                    }
                    let bmcr = self.bus.read(self.addr, MII_BMCR)?;
                    self.bus.write(self.addr, MII_BMCR, bmcr | BMCR_RESET)?;
                    self.wait_reset(MII_BMCR)?;
                }
                if self.profile.negotiate {
                    negotiator.configure(self.bus, self.addr, &self.profile)?;
                }
                PhyState::Configured
            }
            PhyState::Configured => PhyState::Configured,
        };

        if next != self.state {
            log::debug!(
                "{}: PHY{} {:?} -> {:?}",
                self.bus.name(),
                self.addr,
                self.state,
                next
            );
        }
        self.state = next;
        Ok(next)
    }

    /// Step until `Configured`.
    pub fn run<N: LinkNegotiator<R>>(&mut self, negotiator: &mut N) -> Result<(), NetworkError> {
        while self.state != PhyState::Configured {
            self.step(negotiator)?;
        }
        Ok(())
    }

    fn clear_loopback(&self) -> Result<(), NetworkError> {
        if self.profile.mode_select.is_some() {
            self.bus.write(self.addr, PAGE_SELECT, 0)?;
        }
        let bmcr = self.bus.read(self.addr, MII_BMCR)?;
        if bmcr & BMCR_LOOPBACK != 0 {
            log::warn!(
                "{}: PHY{} loopback is enabled - clearing",
                self.bus.name(),
                self.addr
            );
            self.bus
                .write(self.addr, MII_BMCR, bmcr & !(BMCR_LOOPBACK | BMCR_RESET))?;
        }
        Ok(())
    }

    fn wait_reset(&self, reg: u8) -> Result<(), NetworkError> {
        let mut failure = None;
        let waited = self.poll.poll_until(|| match self.bus.read(self.addr, reg) {
            Ok(value) => value & BMCR_RESET == 0,
            Err(err) => {
                failure = Some(err);
                true
            }
        });
        if let Some(err) = failure {
            return Err(err.into());
        }
        waited.map_err(|timeout| {
            log::error!(
                "{}: PHY{} reset did not complete ({})",
                self.bus.name(),
                self.addr,
                timeout
            );
            NetworkError::from(timeout)
        })
    }
}
