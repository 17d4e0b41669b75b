//! Memory-mapped register windows.
//!
//! Every register the driver touches is a 32-bit word at a byte offset from
//! the base of a window (the UMAC register block, or the MMI pair inside it).
//! Drivers are written against [`RegisterBus`] so the same code runs against
//! real hardware ([`MmioRegion`]) and the simulated register files used in
//! the unit tests.

use volatile::Volatile;

/// 32-bit register access relative to a window base.
pub trait RegisterBus {
    /// Read the register at `offset` bytes from the window base.
    fn read32(&self, offset: usize) -> u32;

    /// Write the register at `offset` bytes from the window base.
    fn write32(&self, offset: usize, value: u32);

    /// Read-modify-write: clear `mask`, then OR in `value & mask`.
    fn modify32(&self, offset: usize, mask: u32, value: u32) {
        let current = self.read32(offset);
        self.write32(offset, (current & !mask) | (value & mask));
    }
}

/// A physical register window.
#[derive(Debug)]
pub struct MmioRegion {
    base: usize,
}

impl MmioRegion {
    /// Create a window at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the start of a device register block that is mapped,
    /// 4-byte aligned, and not aliased by another `MmioRegion` that expects
    /// exclusive control of the same registers.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Window base address
    pub const fn base(&self) -> usize {
        self.base
    }

    /// A sub-window starting `offset` bytes into this one.
    ///
    /// # Safety
    ///
    /// Same contract as [`MmioRegion::new`] for the resulting base.
    pub const unsafe fn subregion(&self, offset: usize) -> Self {
        Self {
            base: self.base + offset,
        }
    }
}

impl RegisterBus for MmioRegion {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        let reg = (self.base + offset) as *const Volatile<u32>;
        // SAFETY: The window was created from a valid register block (see
        // `MmioRegion::new`), and offsets come from the register maps in this
        // crate, which are all 4-byte aligned and inside the block.
        unsafe { (*reg).read() }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        // Descriptor and buffer stores must reach memory before the device is
        // told to look at them.
        barrier();
        let reg = (self.base + offset) as *mut Volatile<u32>;
        // SAFETY: See `read32`.
        unsafe { (*reg).write(value) }
    }
}

/// Data memory barrier ahead of a device register write.
#[inline]
fn barrier() {
    #[cfg(target_arch = "arm")]
    // SAFETY: `dmb` only orders memory accesses; it has no other side effects.
    unsafe {
        core::arch::asm!("dmb sy", options(nostack, preserves_flags));
    }

    #[cfg(not(target_arch = "arm"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
