//! HPE GXP UMAC Ethernet Controller Driver
//!
//! The GXP BMC SoC carries two UMAC instances, each a simple DMA MAC with
//! one TX and one RX descriptor ring. This driver runs them in polling mode
//! on a single thread.
//!
//! # Layout
//!
//! - [`regs`]: register map and MAC control sequences
//! - [`desc`]: descriptor layout and ownership decoding
//! - [`ring`]: descriptor rings, packet pools, the ownership protocol
//! - [`config`]: per-instance knobs
//!
//! # PHYs
//!
//! On the standard board each UMAC talks SGMII to an external PHY reached
//! over the external MDIO bus (UMAC0's MMI window), after an on-die PHY on
//! the internal MDIO bus (UMAC1's MMI window) has been reset with
//! auto-negotiation enabled. On Gen10+ boards the on-die PHY is the only
//! one and runs GMII at a fixed 1000/full.
//!
//! # Lifecycle
//!
//! ```text
//! GxpUmac::new    allocate rings, disable MAC, bring up PHYs
//! init            re-arm rings, program MAC, negotiate, match MAC to link
//! send / receive  steady state
//! halt            disable MAC, shut PHY down (init may follow again)
//! ```

pub mod config;
pub mod desc;
pub mod dma;
pub mod regs;
pub mod ring;

#[cfg(test)]
pub(crate) mod sim;

use alloc::vec;
use alloc::vec::Vec;

use crate::drivers::cache::{Armv7DataCache, CacheMaintenance};
use crate::drivers::mmio::{MmioRegion, RegisterBus};
use crate::drivers::net::mdio::{MDIO_WINDOW_OFFSET, MdioBus};
use crate::drivers::net::netdev::{NetworkDevice, NetworkError};
use crate::drivers::net::phy::{
    LinkNegotiator, LinkState, MiiNegotiator, PhyBringup, PhyProfile,
};
use crate::drivers::net::station::{StationAddressSource, resolve_station_address};
use crate::net::ethernet::MacAddress;

pub use config::{PhyVariant, TxFullPolicy, UmacConfig};
pub use ring::{PACKET_BUFFER_SIZE, RingEngine, RingSize};

use regs::{UMAC0_BASE, UmacRegisters, umac_base};

/// Register windows used by one UMAC instance.
pub struct UmacResources<R> {
    /// The instance's own register block
    pub mac: R,
    /// MMI window of the external MDIO bus
    pub external_mdio: R,
    /// MMI window of the internal MDIO bus
    pub internal_mdio: R,
}

impl UmacResources<MmioRegion> {
    /// The fixed GXP windows for `instance`.
    ///
    /// # Safety
    ///
    /// The UMAC register blocks must be mapped, and no other driver may
    /// program this instance or either MDIO bus while the windows are alive.
    pub unsafe fn gxp(instance: u8) -> Self {
        // SAFETY: Forwarded to the caller.
        unsafe {
            Self {
                mac: MmioRegion::new(umac_base(instance)),
                external_mdio: MmioRegion::new(UMAC0_BASE + MDIO_WINDOW_OFFSET),
                internal_mdio: MmioRegion::new(umac_base(1) + MDIO_WINDOW_OFFSET),
            }
        }
    }
}

/// One UMAC instance.
pub struct GxpUmac<R, C = Armv7DataCache, N = MiiNegotiator> {
    name: &'static str,
    config: UmacConfig,
    regs: UmacRegisters<R>,
    external_mdio: MdioBus<R>,
    internal_mdio: MdioBus<R>,
    rings: RingEngine<C>,
    negotiator: N,
    link: LinkState,
    address: MacAddress,
    initialized: bool,
    rx_frame: Vec<u8>,
}

impl<R, C, N> GxpUmac<R, C, N>
where
    R: RegisterBus,
    C: CacheMaintenance,
    N: LinkNegotiator<R>,
{
    /// Allocate rings, quiesce the MAC and bring the PHYs to a configured
    /// state.
    pub fn new(
        resources: UmacResources<R>,
        config: UmacConfig,
        cache: C,
        mut negotiator: N,
        address: MacAddress,
    ) -> Result<Self, NetworkError> {
        config.validate()?;
        let name = config.name();

        log::info!(
            "{}: {:?} PHYs, {} ring entries",
            name,
            config.phy_variant,
            config.ring_size.entries()
        );

        let rings = RingEngine::new(
            config.ring_size,
            cache,
            config.tx_poll,
            config.tx_full_policy,
            name,
        )?;
        let regs = UmacRegisters::new(resources.mac, config.delay);
        let external_mdio = MdioBus::new(resources.external_mdio, "mdio-ext", config.mdio_poll);
        let internal_mdio = MdioBus::new(resources.internal_mdio, "mdio-int", config.mdio_poll);

        regs.set_channel_enable(false);

        match config.phy_variant {
            PhyVariant::Standard => {
                PhyBringup::new(
                    &internal_mdio,
                    config.internal_phy_addr,
                    PhyProfile::internal(),
                    config.phy_reset_poll,
                )
                .run(&mut negotiator)?;
                PhyBringup::new(
                    &external_mdio,
                    config.external_phy_addr,
                    PhyProfile::sgmii_to_copper(),
                    config.phy_reset_poll,
                )
                .run(&mut negotiator)?;
            }
            PhyVariant::Gen10Plus => {
                PhyBringup::new(
                    &internal_mdio,
                    config.internal_phy_addr,
                    PhyProfile::internal_fixed_gmii(),
                    config.phy_reset_poll,
                )
                .run(&mut negotiator)?;
            }
        }

        regs.write_hwaddr(&address);
        log::info!("{}: station address {}", name, address);

        Ok(Self {
            name,
            config,
            regs,
            external_mdio,
            internal_mdio,
            rings,
            negotiator,
            link: LinkState::default(),
            address,
            initialized: false,
            rx_frame: vec![0; PACKET_BUFFER_SIZE],
        })
    }

    /// Like [`new`](Self::new), with the station address looked up through
    /// `source` unless `preconfigured` is valid.
    pub fn probe(
        resources: UmacResources<R>,
        config: UmacConfig,
        cache: C,
        negotiator: N,
        preconfigured: Option<MacAddress>,
        source: &mut dyn StationAddressSource,
    ) -> Result<Self, NetworkError> {
        let address =
            resolve_station_address(preconfigured, source, config.instance, config.random_mac)?;
        Self::new(resources, config, cache, negotiator, address)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &UmacConfig {
        &self.config
    }

    /// Link as last negotiated
    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn rings(&self) -> &RingEngine<C> {
        &self.rings
    }

    pub fn registers(&self) -> &UmacRegisters<R> {
        &self.regs
    }
}

/// Bus, address and profile of the PHY that carries the link.
fn link_phy<'a, R>(
    config: &UmacConfig,
    external: &'a MdioBus<R>,
    internal: &'a MdioBus<R>,
) -> (&'a MdioBus<R>, u8, PhyProfile) {
    match config.phy_variant {
        PhyVariant::Standard => (
            external,
            config.external_phy_addr,
            PhyProfile::sgmii_to_copper(),
        ),
        PhyVariant::Gen10Plus => (
            internal,
            config.internal_phy_addr,
            PhyProfile::internal_fixed_gmii(),
        ),
    }
}

impl<R, C, N> NetworkDevice for GxpUmac<R, C, N>
where
    R: RegisterBus,
    C: CacheMaintenance,
    N: LinkNegotiator<R>,
{
    fn init(&mut self) -> Result<(), NetworkError> {
        self.initialized = false;

        self.rings.reinitialize();
        self.regs.initialize_hardware(
            self.rings.tx_ring().bus_addr(),
            self.rings.rx_ring().bus_addr(),
            self.config.ring_size,
            &self.link,
        );

        let (bus, addr, profile) =
            link_phy(&self.config, &self.external_mdio, &self.internal_mdio);
        self.link = self.negotiator.startup(bus, addr, &profile).map_err(|err| {
            log::error!("{}: could not start PHY{}: {}", self.name, addr, err);
            NetworkError::from(err)
        })?;

        if !self.link.link {
            log::warn!("{}: no link", self.name);
            return Err(NetworkError::LinkDown);
        }

        self.regs.link_configure(&self.link);
        self.initialized = true;
        log::info!("{}: link up, {}", self.name, self.link);
        Ok(())
    }

    fn send(&mut self, frame: &[u8]) -> Result<usize, NetworkError> {
        if !self.initialized {
            return Err(NetworkError::NotInitialized);
        }
        self.rings.enqueue_transmit(&self.regs, frame)
    }

    fn receive(&mut self) -> Option<&[u8]> {
        if !self.initialized {
            return None;
        }
        let buffer = &mut self.rx_frame;
        let len = self.rings.dequeue_receive_with(&self.regs, |frame| {
            buffer[..frame.len()].copy_from_slice(frame);
            frame.len()
        })?;
        Some(&self.rx_frame[..len])
    }

    fn halt(&mut self) {
        self.regs.set_channel_enable(false);

        let (bus, addr, _) = link_phy(&self.config, &self.external_mdio, &self.internal_mdio);
        if let Err(err) = self.negotiator.shutdown(bus, addr) {
            log::warn!("{}: PHY{} shutdown failed: {}", self.name, addr, err);
        }

        self.link = LinkState::default();
        self.initialized = false;
        log::info!("{}: halted", self.name);
    }

    fn set_hardware_address(&mut self, address: MacAddress) {
        self.address = address;
        self.regs.write_hwaddr(&address);
    }

    fn hardware_address(&self) -> MacAddress {
        self.address
    }

    fn link_up(&self) -> bool {
        self.initialized && self.link.link
    }
}
