//! UMAC DMA descriptors.
//!
//! Both rings use the same 16-byte entry. The first eight bytes are shared:
//!
//! ```text
//! 0x0  dma_address  u32   buffer bus address
//! 0x4  status       u16   bit 15 = owned by hardware
//! 0x6  count        u16   buffer length (TX) / frame length (RX)
//! ```
//!
//! The trailer differs: TX carries a checksum offset, RX a checksum and a
//! control word. Entries live in DMA memory and are only touched through
//! volatile accesses by [`DescriptorRing`](super::ring::DescriptorRing).

use core::mem::{offset_of, size_of};

/// Ownership bit: set while the entry belongs to hardware
pub const DESC_OWN: u16 = 0x8000;

/// RX error flags reported alongside the ownership bit
pub const RX_ERROR_MASK: u16 = 0x38E0;

/// Size of one ring entry in bytes
pub const DESC_SIZE: usize = 16;

/// Byte offset of the status half-word in every entry
pub const STATUS_OFFSET: usize = 4;

/// Byte offset of the count half-word in every entry
pub const COUNT_OFFSET: usize = 6;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxDescriptor {
    pub dma_address: u32,
    pub status: u16,
    pub count: u16,
    pub cksum_offset: u32,
    pub reserved: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxDescriptor {
    pub dma_address: u32,
    pub status: u16,
    pub count: u16,
    pub checksum: u16,
    pub control: u16,
    pub reserved: u32,
}

const _: () = {
    assert!(size_of::<TxDescriptor>() == DESC_SIZE);
    assert!(offset_of!(TxDescriptor, dma_address) == 0);
    assert!(offset_of!(TxDescriptor, status) == STATUS_OFFSET);
    assert!(offset_of!(TxDescriptor, count) == COUNT_OFFSET);
    assert!(offset_of!(TxDescriptor, cksum_offset) == 8);
    assert!(offset_of!(TxDescriptor, reserved) == 12);

    assert!(size_of::<RxDescriptor>() == DESC_SIZE);
    assert!(offset_of!(RxDescriptor, dma_address) == 0);
    assert!(offset_of!(RxDescriptor, status) == STATUS_OFFSET);
    assert!(offset_of!(RxDescriptor, count) == COUNT_OFFSET);
    assert!(offset_of!(RxDescriptor, checksum) == 8);
    assert!(offset_of!(RxDescriptor, control) == 10);
    assert!(offset_of!(RxDescriptor, reserved) == 12);
};

/// Who may touch a descriptor, decoded from its status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Software may read and rewrite the entry
    Software,
    /// Hardware owns the entry
    Hardware,
    /// Hardware owns the entry and flagged these error bits
    HardwareError(u16),
}

impl Ownership {
    pub fn is_hardware(self) -> bool {
        !matches!(self, Ownership::Software)
    }
}

/// Common view of TX and RX entries.
pub trait Descriptor: Copy + Default {
    /// Status bits that report an error while hardware owns the entry
    const ERROR_MASK: u16;

    fn status(&self) -> u16;
    fn set_status(&mut self, status: u16);

    fn ownership(&self) -> Ownership {
        let status = self.status();
        if status & DESC_OWN == 0 {
            Ownership::Software
        } else if status & Self::ERROR_MASK != 0 {
            Ownership::HardwareError(status & Self::ERROR_MASK)
        } else {
            Ownership::Hardware
        }
    }
}

impl Descriptor for TxDescriptor {
    const ERROR_MASK: u16 = 0;

    fn status(&self) -> u16 {
        self.status
    }

    fn set_status(&mut self, status: u16) {
        self.status = status;
    }
}

impl Descriptor for RxDescriptor {
    const ERROR_MASK: u16 = RX_ERROR_MASK;

    fn status(&self) -> u16 {
        self.status
    }

    fn set_status(&mut self, status: u16) {
        self.status = status;
    }
}
