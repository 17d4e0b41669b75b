//! DMA-visible memory.
//!
//! Rings and packet pools are plain heap allocations. The UMAC needs 16-byte
//! aligned bases; regions are aligned and padded to whole cache lines so that
//! maintenance on one never touches a neighbour. The GXP runs with a flat
//! 32-bit physical mapping, so the bus address the UMAC sees is the CPU
//! address truncated to 32 bits.

use alloc::alloc::{Layout, alloc_zeroed, dealloc};
use core::ptr::NonNull;

use crate::drivers::cache::CACHE_LINE_SIZE;
use crate::drivers::net::netdev::NetworkError;

/// Alignment the UMAC requires of ring and buffer bases
pub const DMA_ALIGN: usize = 16;

const REGION_ALIGN: usize = if CACHE_LINE_SIZE > DMA_ALIGN {
    CACHE_LINE_SIZE
} else {
    DMA_ALIGN
};

/// An owned, zero-initialized, cache-line aligned block of memory.
pub struct DmaRegion {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

impl DmaRegion {
    pub fn new(len: usize) -> Result<Self, NetworkError> {
        let padded = len.max(1).next_multiple_of(REGION_ALIGN);
        let layout = Layout::from_size_align(padded, REGION_ALIGN)
            .map_err(|_| NetworkError::InvalidConfiguration)?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            log::error!("dma: allocation of {} bytes failed", layout.size());
            NetworkError::OutOfMemory
        })?;
        Ok(Self { ptr, len, layout })
    }

    /// CPU address of the first byte
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Address as programmed into UMAC registers and descriptors
    pub fn bus_addr(&self) -> u32 {
        self.addr() as u32
    }

    /// Bus address `offset` bytes into the region
    pub fn bus_addr_at(&self, offset: usize) -> u32 {
        (self.addr() + offset) as u32
    }

    /// Requested length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: The allocation holds at least `len()` initialized bytes
        // owned by self.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: As above, and `&mut self` guarantees exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }

    pub fn zero(&mut self) {
        self.as_mut_slice().fill(0);
    }
}

impl Drop for DmaRegion {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc_zeroed` with this layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}
