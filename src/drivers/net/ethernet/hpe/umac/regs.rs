//! UMAC register map and MAC control sequences.
//!
//! Everything here is stateless register sequencing: the ring engine and the
//! device front end decide *when*, this module knows *how*.

use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::phy::{Duplex, LinkSpeed, LinkState};
use crate::drivers::timer::DelayFn;
use crate::net::ethernet::MacAddress;

use super::ring::RingSize;

// ============================================================================
// Instance Addresses
// ============================================================================

/// UMAC0 register block
pub const UMAC0_BASE: usize = 0xC000_4000;

/// Distance between consecutive UMAC instances
pub const UMAC_STRIDE: usize = 0x1000;

/// Number of UMAC instances on the SoC
pub const UMAC_INSTANCES: u8 = 2;

pub const fn umac_base(instance: u8) -> usize {
    UMAC0_BASE + UMAC_STRIDE * instance as usize
}

// ============================================================================
// Register Offsets
// ============================================================================

pub const UMAC_CONFIG_STATUS: usize = 0x00;
pub const UMAC_RING_PTR: usize = 0x04;
pub const UMAC_RING_PROMPT: usize = 0x08;
pub const UMAC_CLEAR_STATUS: usize = 0x0C;
pub const UMAC_CKSUM_CONFIG: usize = 0x10;
pub const UMAC_RING_SIZE: usize = 0x14;
pub const UMAC_MAC_ADDR_HI: usize = 0x18;
pub const UMAC_MAC_ADDR_MID: usize = 0x1C;
pub const UMAC_MAC_ADDR_LO: usize = 0x20;
pub const UMAC_MC_ADDR_FILT_HI: usize = 0x24;
pub const UMAC_MC_ADDR_FILT_LO: usize = 0x28;
pub const UMAC_CONFIG_STATUS2: usize = 0x2C;
pub const UMAC_INTERRUPT: usize = 0x30;
pub const UMAC_OVERRUN_COUNT: usize = 0x34;
pub const UMAC_RX_INT_CONFIG: usize = 0x38;
pub const UMAC_TX_INT_CONFIG: usize = 0x3C;
pub const UMAC_PACKET_LENGTH: usize = 0x40;
pub const UMAC_BCAST_FILTER: usize = 0x44;
pub const UMAC_BCAST_PROMPT: usize = 0x48;
pub const UMAC_RX_RING_ADDR: usize = 0x4C;
pub const UMAC_TX_RING_ADDR: usize = 0x50;
pub const UMAC_DMA_CONFIG: usize = 0x54;
pub const UMAC_BURST_CONFIG: usize = 0x58;
pub const UMAC_PAUSE_CONFIG: usize = 0x5C;
pub const UMAC_PAUSE_CONTROL: usize = 0x60;
pub const UMAC_CONGESTION_CONFIG: usize = 0x64;
pub const UMAC_FRAME_FILTER_CONFIG: usize = 0x68;
pub const UMAC_RX_FIFO_CONFIG_STATUS: usize = 0x6C;
pub const UMAC_RX_RING1_BASE: usize = 0x70;
pub const UMAC_CONFIG_STATUS3: usize = 0x74;
pub const UMAC_MMI: usize = 0x80;
pub const UMAC_MMI_DATA: usize = 0x84;
pub const UMAC_LINK: usize = 0x88;
pub const UMAC_MMI_CONFIG: usize = 0x8C;

// CONFIG_STATUS bits
pub const CFG_TXEN: u32 = 1 << 12;
pub const CFG_RXEN: u32 = 1 << 11;
pub const CFG_MISSED: u32 = 1 << 7;
const CFG_CLOCKS_OFF: u32 = 0xFFFF_F9FF; // clears bits 9-10
const CFG_LINK_CLEAR: u32 = 0xFFFF_F9FA; // clears bits 0, 2, 9, 10
const CFG_GIGABIT: u32 = (1 << 10) | (1 << 2);
const CFG_FAST: u32 = 1 << 9;
const CFG_FULL_DUPLEX: u32 = 1 << 0;

// INTERRUPT bits
pub const INT_TX_DONE: u32 = 1 << 0;
pub const INT_RX_OVERRUN: u32 = 1 << 4;

// RING_SIZE fields
const RING_SIZE_TX_SHIFT: u32 = 24;
const RING_SIZE_RX_SHIFT: u32 = 16;

/// DMA_CONFIG burst setting
const DMA_BURST: u32 = 0x22;

/// Clock settle time around speed changes
const CLOCK_SETTLE_US: u32 = 2;

/// The register block of one UMAC instance.
pub struct UmacRegisters<R> {
    regs: R,
    delay: DelayFn,
}

impl<R: RegisterBus> UmacRegisters<R> {
    pub fn new(regs: R, delay: DelayFn) -> Self {
        Self { regs, delay }
    }

    /// Program rings, burst size and checksum mode, then the link.
    pub fn initialize_hardware(
        &self,
        tx_ring: u32,
        rx_ring: u32,
        size: RingSize,
        link: &LinkState,
    ) {
        self.regs.write32(UMAC_RING_PTR, 0);
        // clear the missed bit
        self.regs.write32(UMAC_CLEAR_STATUS, 0);
        // no checksum generation
        self.regs.write32(UMAC_CKSUM_CONFIG, 0);

        let code = size.size_code();
        self.regs.write32(
            UMAC_RING_SIZE,
            (code << RING_SIZE_TX_SHIFT) | (code << RING_SIZE_RX_SHIFT),
        );

        self.regs.write32(UMAC_RX_RING_ADDR, rx_ring);
        self.regs.write32(UMAC_TX_RING_ADDR, tx_ring);
        self.regs.write32(UMAC_DMA_CONFIG, DMA_BURST);

        // clocks and gigabit mode off
        self.regs.write32(UMAC_CONFIG_STATUS, 0);

        self.link_configure(link);
    }

    /// Enable or disable TX and RX together.
    pub fn set_channel_enable(&self, enable: bool) {
        if enable {
            let channels = CFG_TXEN | CFG_RXEN;
            self.regs.modify32(UMAC_CONFIG_STATUS, channels, channels);
            self.ring_doorbell();
        } else {
            self.regs.write32(UMAC_CONFIG_STATUS, 0);
        }
    }

    /// Match MAC clocks and duplex to the PHY, then re-enable the channels.
    pub fn link_configure(&self, link: &LinkState) {
        self.set_channel_enable(false);

        let mut cfg = self.regs.read32(UMAC_CONFIG_STATUS);
        cfg &= CFG_CLOCKS_OFF;
        self.regs.write32(UMAC_CONFIG_STATUS, cfg);
        (self.delay)(CLOCK_SETTLE_US);

        cfg &= CFG_LINK_CLEAR;
        cfg |= match link.speed {
            LinkSpeed::Speed1000 => CFG_GIGABIT,
            LinkSpeed::Speed100 | LinkSpeed::Speed10 => CFG_FAST,
        };
        if link.duplex == Duplex::Full {
            cfg |= CFG_FULL_DUPLEX;
        }
        self.regs.write32(UMAC_CONFIG_STATUS, cfg);
        (self.delay)(CLOCK_SETTLE_US);

        self.set_channel_enable(true);
    }

    pub fn write_hwaddr(&self, mac: &MacAddress) {
        let b = mac.as_bytes();
        self.regs
            .write32(UMAC_MAC_ADDR_HI, (u32::from(b[0]) << 8) | u32::from(b[1]));
        self.regs
            .write32(UMAC_MAC_ADDR_MID, (u32::from(b[2]) << 8) | u32::from(b[3]));
        self.regs
            .write32(UMAC_MAC_ADDR_LO, (u32::from(b[4]) << 8) | u32::from(b[5]));
    }

    pub fn read_hwaddr(&self) -> MacAddress {
        let hi = self.regs.read32(UMAC_MAC_ADDR_HI);
        let mid = self.regs.read32(UMAC_MAC_ADDR_MID);
        let lo = self.regs.read32(UMAC_MAC_ADDR_LO);
        MacAddress::new([
            (hi >> 8) as u8,
            hi as u8,
            (mid >> 8) as u8,
            mid as u8,
            (lo >> 8) as u8,
            lo as u8,
        ])
    }

    /// Tell the DMA engine to rescan both rings.
    pub fn ring_doorbell(&self) {
        self.regs.write32(UMAC_RING_PROMPT, 0);
    }

    pub fn interrupt(&self) -> u32 {
        self.regs.read32(UMAC_INTERRUPT)
    }

    /// Write-one-to-clear the given interrupt bits.
    pub fn ack_interrupt(&self, bits: u32) {
        self.regs.write32(UMAC_INTERRUPT, bits);
    }

    pub fn config_status(&self) -> u32 {
        self.regs.read32(UMAC_CONFIG_STATUS)
    }

    /// Clear the sticky missed-frame status.
    pub fn clear_status(&self) {
        self.regs.write32(UMAC_CLEAR_STATUS, 0);
    }

    pub fn overrun_count(&self) -> u32 {
        self.regs.read32(UMAC_OVERRUN_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SimBus, no_delay};

    fn regs() -> (UmacRegisters<SimBus>, SimBus) {
        let bus = SimBus::new();
        (UmacRegisters::new(bus.clone(), no_delay), bus)
    }

    fn link(speed: LinkSpeed, duplex: Duplex) -> LinkState {
        LinkState {
            link: true,
            speed,
            duplex,
        }
    }

    #[test]
    fn instance_bases() {
        assert_eq!(umac_base(0), 0xC000_4000);
        assert_eq!(umac_base(1), 0xC000_5000);
    }

    #[test]
    fn initialize_hardware_programs_rings() {
        let (umac, bus) = regs();

        umac.initialize_hardware(
            0x1000,
            0x2000,
            RingSize::Entries16,
            &LinkState::default(),
        );

        assert_eq!(bus.writes_to(UMAC_RING_SIZE), vec![(3 << 24) | (3 << 16)]);
        assert_eq!(bus.writes_to(UMAC_TX_RING_ADDR), vec![0x1000]);
        assert_eq!(bus.writes_to(UMAC_RX_RING_ADDR), vec![0x2000]);
        assert_eq!(bus.writes_to(UMAC_DMA_CONFIG), vec![0x22]);
        assert_eq!(bus.writes_to(UMAC_CKSUM_CONFIG), vec![0]);
        assert_eq!(bus.writes_to(UMAC_RING_PTR), vec![0]);
        // link_configure leaves the channels running
        assert_ne!(bus.peek(UMAC_CONFIG_STATUS) & (CFG_TXEN | CFG_RXEN), 0);
    }

    #[test]
    fn link_configure_gigabit_full() {
        let (umac, bus) = regs();
        bus.poke(UMAC_CONFIG_STATUS, 0xFFFF_FFFF);

        umac.link_configure(&link(LinkSpeed::Speed1000, Duplex::Full));

        let writes = bus.writes_to(UMAC_CONFIG_STATUS);
        // disable, clocks off, speed, enable
        assert_eq!(writes[0], 0);
        assert_eq!(writes[1], 0);
        assert_eq!(writes[2], (1 << 10) | (1 << 2) | 1);
        assert_eq!(writes[3], (1 << 10) | (1 << 2) | 1 | CFG_TXEN | CFG_RXEN);
        assert_eq!(bus.writes_to(UMAC_RING_PROMPT), vec![0]);
    }

    #[test]
    fn link_configure_fast_half() {
        let (umac, bus) = regs();

        umac.link_configure(&link(LinkSpeed::Speed100, Duplex::Half));

        assert_eq!(bus.peek(UMAC_CONFIG_STATUS), (1 << 9) | CFG_TXEN | CFG_RXEN);
    }

    #[test]
    fn link_configure_waits_for_clocks() {
        use core::sync::atomic::{AtomicU32, Ordering};
        static WAITED: AtomicU32 = AtomicU32::new(0);
        fn count(us: u32) {
            WAITED.fetch_add(us, Ordering::Relaxed);
        }

        let bus = SimBus::new();
        let umac = UmacRegisters::new(bus, count);

        umac.link_configure(&LinkState::default());

        assert_eq!(WAITED.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn channels_switch_together() {
        let (umac, bus) = regs();
        bus.poke(UMAC_CONFIG_STATUS, 1 << 9);

        umac.set_channel_enable(true);
        assert_eq!(bus.peek(UMAC_CONFIG_STATUS), (1 << 9) | CFG_TXEN | CFG_RXEN);

        umac.set_channel_enable(false);
        assert_eq!(bus.peek(UMAC_CONFIG_STATUS), 0);
    }

    #[test]
    fn hwaddr_packs_big_endian_pairs() {
        let (umac, bus) = regs();
        let mac = MacAddress::new([0x1C, 0x98, 0xEC, 0x12, 0x34, 0x56]);

        umac.write_hwaddr(&mac);

        assert_eq!(bus.peek(UMAC_MAC_ADDR_HI), 0x1C98);
        assert_eq!(bus.peek(UMAC_MAC_ADDR_MID), 0xEC12);
        assert_eq!(bus.peek(UMAC_MAC_ADDR_LO), 0x3456);
        assert_eq!(umac.read_hwaddr(), mac);
    }
}
