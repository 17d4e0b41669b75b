//! MDIO bus transport over the UMAC MMI registers.
//!
//! Each UMAC register block carries a management interface at offset 0x80:
//!
//! | Offset | Register | Purpose |
//! |--------|----------|---------|
//! | +0x00  | MMI      | Command: PHY address, register, direction, owner |
//! | +0x04  | MMI_DATA | 16-bit data in (write) or out (read) |
//!
//! A transaction composes the command, writes it, then sets `MOWNER` to hand
//! the bus to hardware. Hardware clears `MOWNER` when the transaction has
//! finished. There is no error bit: a transaction either completes or never
//! does, so under the default (unbounded) poll policy a dead bus hangs the
//! caller.

use core::fmt;

use crate::drivers::mmio::RegisterBus;
use crate::drivers::poll::Poller;

/// Offset of the MMI register pair inside a UMAC register block
pub const MDIO_WINDOW_OFFSET: usize = 0x80;

const MMI: usize = 0x00;
const MMI_DATA: usize = 0x04;

// MMI bits
#[allow(dead_code)] // Management reset, left untouched
const MMI_NMRST: u32 = 0x0000_8000;
const MMI_PHY_ADDR_MASK: u32 = 0x001F_0000;
const MMI_PHY_ADDR_SHIFT: u32 = 16;
const MMI_MOWNER: u32 = 0x0000_0200;
const MMI_MRNW: u32 = 0x0000_0100;
const MMI_REG_ADDR: u32 = 0x0000_001F;

const MMI_DATA_MASK: u32 = 0x0000_FFFF;

/// Highest PHY address the 5-bit field can carry
pub const MAX_PHY_ADDR: u8 = 31;

/// MDIO transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdioError {
    /// PHY address does not fit the 5-bit field
    InvalidPhyAddress(u8),
    /// Owner bit never cleared (bounded poll policy only)
    Timeout { phy: u8, reg: u8 },
}

impl fmt::Display for MdioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MdioError::InvalidPhyAddress(addr) => write!(f, "invalid PHY address {}", addr),
            MdioError::Timeout { phy, reg } => {
                write!(f, "transaction to PHY {} register {} timed out", phy, reg)
            }
        }
    }
}

/// One management bus.
pub struct MdioBus<R> {
    regs: R,
    name: &'static str,
    poll: Poller,
}

impl<R: RegisterBus> MdioBus<R> {
    /// Wrap an MMI register window.
    pub fn new(regs: R, name: &'static str, poll: Poller) -> Self {
        Self { regs, name, poll }
    }

    /// Bus name used in diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read a 16-bit PHY register.
    pub fn read(&self, phy: u8, reg: u8) -> Result<u16, MdioError> {
        let cmd = self.command(phy, reg)? | MMI_MRNW;
        self.regs.write32(MMI, cmd);
        self.run(cmd, phy, reg)?;

        Ok((self.regs.read32(MMI_DATA) & MMI_DATA_MASK) as u16)
    }

    /// Write a 16-bit PHY register.
    pub fn write(&self, phy: u8, reg: u8, value: u16) -> Result<(), MdioError> {
        let cmd = self.command(phy, reg)? & !MMI_MRNW;
        // Data must be in place before the command goes out.
        self.regs.write32(MMI_DATA, u32::from(value) & MMI_DATA_MASK);
        self.regs.write32(MMI, cmd);
        self.run(cmd, phy, reg)
    }

    /// Read-modify-write: clear `mask`, then OR in `value & mask`.
    pub fn modify(&self, phy: u8, reg: u8, mask: u16, value: u16) -> Result<u16, MdioError> {
        let current = self.read(phy, reg)?;
        let updated = (current & !mask) | (value & mask);
        self.write(phy, reg, updated)?;
        Ok(updated)
    }

    /// Current MMI contents with the address fields replaced.
    fn command(&self, phy: u8, reg: u8) -> Result<u32, MdioError> {
        if phy > MAX_PHY_ADDR {
            return Err(MdioError::InvalidPhyAddress(phy));
        }

        let mut cmd = self.regs.read32(MMI);
        cmd &= !(MMI_PHY_ADDR_MASK | MMI_REG_ADDR);
        cmd |= (u32::from(phy) << MMI_PHY_ADDR_SHIFT) & MMI_PHY_ADDR_MASK;
        cmd |= u32::from(reg) & MMI_REG_ADDR;
        Ok(cmd)
    }

    /// Hand the composed command to hardware and wait for it to finish.
    fn run(&self, cmd: u32, phy: u8, reg: u8) -> Result<(), MdioError> {
        self.regs.write32(MMI, cmd | MMI_MOWNER);
        self.poll
            .poll_until(|| self.regs.read32(MMI) & MMI_MOWNER == 0)
            .map_err(|_| {
                log::error!("{}: PHY {} register {} never completed", self.name, phy, reg);
                MdioError::Timeout { phy, reg }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SimBus, SimPhy};

    fn bus_with_phy(addr: u8) -> (MdioBus<SimBus>, SimBus, SimPhy) {
        let regs = SimBus::new();
        let phy = SimPhy::new();
        phy.attach(&regs, addr);
        (
            MdioBus::new(regs.clone(), "test-mdio", Poller::bounded(16)),
            regs,
            phy,
        )
    }

    #[test]
    fn read_returns_phy_register() {
        let (bus, _, phy) = bus_with_phy(1);
        phy.set(0, 3, 0x0DC0);

        assert_eq!(bus.read(1, 3), Ok(0x0DC0));
    }

    #[test]
    fn write_reaches_phy_register() {
        let (bus, _, phy) = bus_with_phy(0);

        bus.write(0, 4, 0x01E1).unwrap();

        assert_eq!(phy.get(0, 4), 0x01E1);
    }

    #[test]
    fn command_encodes_address_fields_and_direction() {
        let (bus, regs, _) = bus_with_phy(5);

        bus.read(5, 0x11).unwrap();
        let read_cmds: Vec<u32> = regs.writes_to(MMI);
        assert_eq!(read_cmds[0], (5 << 16) | 0x11 | MMI_MRNW);
        assert_eq!(read_cmds[1], (5 << 16) | 0x11 | MMI_MRNW | MMI_MOWNER);

        regs.clear_log();
        bus.write(5, 0x02, 0xBEEF).unwrap();
        let write_cmds: Vec<u32> = regs.writes_to(MMI);
        assert_eq!(write_cmds[0], (5 << 16) | 0x02);
        assert_eq!(write_cmds[1], (5 << 16) | 0x02 | MMI_MOWNER);
        assert_eq!(regs.writes_to(MMI_DATA), vec![0xBEEF]);
    }

    #[test]
    fn unrelated_command_bits_preserved() {
        let (bus, regs, _) = bus_with_phy(2);
        regs.poke(MMI, MMI_NMRST | (7 << 16) | 0x1F);

        bus.read(2, 1).unwrap();

        assert_eq!(regs.writes_to(MMI)[0], MMI_NMRST | (2 << 16) | 1 | MMI_MRNW);
    }

    #[test]
    fn modify_only_touches_masked_bits() {
        let (bus, _, phy) = bus_with_phy(0);
        phy.set(18, 20, 0xABC6);
        bus.write(0, 22, 18).unwrap();

        let value = bus.modify(0, 20, 0x0007, 0x0001).unwrap();

        assert_eq!(value, 0xABC1);
        assert_eq!(phy.get(18, 20), 0xABC1);
    }

    #[test]
    fn stuck_owner_bit_times_out_when_bounded() {
        // No PHY attached: nothing ever clears MOWNER.
        let regs = SimBus::new();
        let bus = MdioBus::new(regs, "dead-mdio", Poller::bounded(8));

        assert_eq!(bus.read(0, 1), Err(MdioError::Timeout { phy: 0, reg: 1 }));
    }

    #[test]
    fn phy_address_out_of_range_rejected() {
        let (bus, regs, _) = bus_with_phy(0);

        assert_eq!(bus.read(32, 0), Err(MdioError::InvalidPhyAddress(32)));
        assert!(regs.writes_to(MMI).is_empty());
    }
}
