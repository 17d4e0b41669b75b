//! Data-cache maintenance for DMA-visible memory.
//!
//! The UMAC reads and writes descriptors and packet buffers directly in DRAM
//! while the CPU sees them through its data cache. Both directions need a
//! maintenance operation:
//!
//! - after the CPU writes something the device will read, the dirty lines
//!   must be written back
//! - before the CPU reads something the device may have written, the stale
//!   lines must be discarded
//!
//! The GXP's Cortex-A9 does both with one "clean and invalidate by MVA"
//! operation per 32-byte line, so the driver only needs
//! [`CacheMaintenance::clean_invalidate`].

/// Cortex-A9 L1 data-cache line size
pub const CACHE_LINE_SIZE: usize = 32;

/// Cache maintenance over an address range.
pub trait CacheMaintenance {
    /// Clean and invalidate every cache line overlapping `[addr, addr + len)`.
    fn clean_invalidate(&self, addr: usize, len: usize);
}

/// Expand `[addr, addr + len)` to whole cache lines.
///
/// Returns `(start, end)` with `start` rounded down and `end` rounded up to
/// [`CACHE_LINE_SIZE`]. A zero-length range still covers the line holding
/// `addr`.
pub const fn line_span(addr: usize, len: usize) -> (usize, usize) {
    let start = addr & !(CACHE_LINE_SIZE - 1);
    let last = if len == 0 { addr } else { addr + len - 1 };
    let end = (last | (CACHE_LINE_SIZE - 1)) + 1;
    (start, end)
}

/// ARMv7 L1 data cache, maintained with `DCCIMVAC`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Armv7DataCache;

impl CacheMaintenance for Armv7DataCache {
    #[inline]
    fn clean_invalidate(&self, addr: usize, len: usize) {
        let (start, end) = line_span(addr, len);

        #[cfg(target_arch = "arm")]
        // SAFETY: DCCIMVAC writes back and discards lines; it never changes
        // the architectural contents of memory, and `[start, end)` covers
        // memory the caller owns.
        unsafe {
            let mut line = start;
            while line < end {
                core::arch::asm!(
                    "mcr p15, 0, {line}, c7, c14, 1",
                    line = in(reg) line,
                    options(nostack, preserves_flags)
                );
                line += CACHE_LINE_SIZE;
            }
            core::arch::asm!("dsb sy", options(nostack, preserves_flags));
        }

        #[cfg(not(target_arch = "arm"))]
        {
            // Coherent host: only ordering is needed.
            let _ = (start, end);
            core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        }
    }
}
