//! Per-instance driver configuration.

use crate::drivers::net::mdio::MAX_PHY_ADDR;
use crate::drivers::net::netdev::NetworkError;
use crate::drivers::net::station::RandomFallback;
use crate::drivers::poll::Poller;
use crate::drivers::timer::{DelayFn, spin_delay_us};

use super::regs::UMAC_INSTANCES;
use super::ring::RingSize;

/// Behaviour of `send` when the next TX slot is still owned by hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxFullPolicy {
    /// Log once and wait for the slot under `tx_poll`
    #[default]
    Spin,
    /// Fail immediately with `TxRingFull`
    Backpressure,
}

/// PHY arrangement of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhyVariant {
    /// On-die PHY set up first, external SGMII PHY carries the link
    #[default]
    Standard,
    /// On-die PHY only, GMII fixed at 1000/full (Gen10+)
    ///
    /// The board must have enabled the PHY sideband (bit 1 of the byte at
    /// 0xD100_0040) before the driver is created; the PHY reset the driver
    /// waits for only completes once it is.
    Gen10Plus,
}

#[derive(Debug, Clone, Copy)]
pub struct UmacConfig {
    /// UMAC instance, 0 or 1
    pub instance: u8,
    pub ring_size: RingSize,
    pub phy_variant: PhyVariant,
    /// Address of the external PHY on the external MDIO bus
    pub external_phy_addr: u8,
    /// Address of the on-die PHY on the internal MDIO bus
    pub internal_phy_addr: u8,
    /// MDIO owner-bit wait
    pub mdio_poll: Poller,
    /// PHY reset-complete wait
    pub phy_reset_poll: Poller,
    /// TX completion and ring-slot wait
    pub tx_poll: Poller,
    pub tx_full_policy: TxFullPolicy,
    /// Used when neither a pre-configured nor a stored address is valid
    pub random_mac: RandomFallback,
    pub delay: DelayFn,
}

impl Default for UmacConfig {
    fn default() -> Self {
        Self::for_instance(0)
    }
}

impl UmacConfig {
    /// Board defaults for `instance`.
    pub fn for_instance(instance: u8) -> Self {
        Self {
            instance,
            ring_size: RingSize::default(),
            phy_variant: PhyVariant::default(),
            external_phy_addr: 0,
            internal_phy_addr: instance,
            mdio_poll: Poller::unbounded(),
            phy_reset_poll: Poller::unbounded(),
            tx_poll: Poller::unbounded(),
            tx_full_policy: TxFullPolicy::default(),
            random_mac: RandomFallback::Disallowed,
            delay: spin_delay_us,
        }
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.instance >= UMAC_INSTANCES {
            log::error!("umac: no instance {}", self.instance);
            return Err(NetworkError::InvalidConfiguration);
        }
        if self.external_phy_addr > MAX_PHY_ADDR || self.internal_phy_addr > MAX_PHY_ADDR {
            log::error!(
                "umac{}: PHY address out of range ({} / {})",
                self.instance,
                self.external_phy_addr,
                self.internal_phy_addr
            );
            return Err(NetworkError::InvalidConfiguration);
        }
        Ok(())
    }

    /// Device name used as the log prefix
    pub fn name(&self) -> &'static str {
        match self.instance {
            0 => "umac0",
            1 => "umac1",
            _ => "umac?",
        }
    }
}
