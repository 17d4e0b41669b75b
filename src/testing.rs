//! Simulated hardware for the unit tests.
//!
//! - [`SimBus`]: a register file with a write log and write hooks
//! - [`SimPhy`]: an MII register model that answers MMI transactions
//! - [`SimCache`]: a data-cache model where device writes only become
//!   visible to the CPU after the covering lines are invalidated
//!
//! All three are cheap handles over shared state, so a test can keep a clone
//! to inspect or poke while the driver owns another.

use std::boxed::Box;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::vec::Vec;

use crate::drivers::cache::{CacheMaintenance, line_span};
use crate::drivers::mmio::RegisterBus;

pub use crate::drivers::timer::no_delay;

/// Register values keyed by byte offset
pub type RegisterFile = BTreeMap<usize, u32>;

/// Called after every write with `(registers, offset, written, previous)`.
pub type WriteHook = Box<dyn FnMut(&mut RegisterFile, usize, u32, u32)>;

#[derive(Default)]
struct SimBusState {
    regs: RegisterFile,
    log: Vec<(usize, u32)>,
    hooks: Vec<WriteHook>,
}

/// A simulated register window.
#[derive(Clone, Default)]
pub struct SimBus {
    inner: Rc<RefCell<SimBusState>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a register without logging or running hooks.
    pub fn poke(&self, offset: usize, value: u32) {
        self.inner.borrow_mut().regs.insert(offset, value);
    }

    /// Current register value.
    pub fn peek(&self, offset: usize) -> u32 {
        self.inner.borrow().regs.get(&offset).copied().unwrap_or(0)
    }

    pub fn add_hook(&self, hook: WriteHook) {
        self.inner.borrow_mut().hooks.push(hook);
    }

    /// Every `(offset, value)` written so far, in order.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.inner.borrow().log.clone()
    }

    /// Values written to one register, in order.
    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.inner
            .borrow()
            .log
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn clear_log(&self) {
        self.inner.borrow_mut().log.clear();
    }
}

impl RegisterBus for SimBus {
    fn read32(&self, offset: usize) -> u32 {
        self.peek(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        let mut state = self.inner.borrow_mut();
        let SimBusState { regs, log, hooks } = &mut *state;

        log.push((offset, value));
        let previous = regs.insert(offset, value).unwrap_or(0);
        for hook in hooks.iter_mut() {
            hook(regs, offset, value, previous);
        }
    }
}

// MMI layout, mirrored from the transport so the model stays independent.
const MMI: usize = 0x00;
const MMI_DATA: usize = 0x04;
const MMI_MOWNER: u32 = 0x200;
const MMI_MRNW: u32 = 0x100;

const PAGE_SELECT: u8 = 22;
const RESET_BIT: u16 = 0x8000;

#[derive(Default)]
struct SimPhyState {
    page: u16,
    regs: BTreeMap<(u16, u8), u16>,
    /// Reads left before a pending reset bit self-clears
    resets: BTreeMap<(u16, u8), u32>,
    reset_latency: u32,
    writes: Vec<(u16, u8, u16)>,
}

/// A paged MII register model.
///
/// Register 22 selects the page for every other register. Setting bit 15 of
/// any register starts a reset that stays visible for `reset_latency` reads
/// and then clears itself.
#[derive(Clone, Default)]
pub struct SimPhy {
    inner: Rc<RefCell<SimPhyState>>,
}

impl SimPhy {
    pub fn new() -> Self {
        let phy = Self::default();
        phy.inner.borrow_mut().reset_latency = 3;
        phy
    }

    /// Answer MMI transactions for `addr` on `bus`.
    pub fn attach(&self, bus: &SimBus, addr: u8) {
        let phy = self.clone();
        bus.add_hook(Box::new(move |regs, offset, value, _| {
            if offset != MMI || value & MMI_MOWNER == 0 {
                return;
            }

            let target = ((value >> 16) & 0x1F) as u8;
            let reg = (value & 0x1F) as u8;
            if target == addr {
                if value & MMI_MRNW != 0 {
                    let data = phy.mdio_read(reg);
                    regs.insert(MMI_DATA, u32::from(data));
                } else {
                    let data = regs.get(&MMI_DATA).copied().unwrap_or(0) as u16;
                    phy.mdio_write(reg, data);
                }
            } else if value & MMI_MRNW != 0 {
                // Nobody home: the bus floats high.
                regs.insert(MMI_DATA, 0xFFFF);
            }
            regs.insert(MMI, value & !MMI_MOWNER);
        }));
    }

    pub fn set_reset_latency(&self, reads: u32) {
        self.inner.borrow_mut().reset_latency = reads;
    }

    /// Set a register directly (no reset side effects).
    pub fn set(&self, page: u16, reg: u8, value: u16) {
        self.inner.borrow_mut().regs.insert((page, reg), value);
    }

    /// Stored register value, ignoring any pending reset.
    pub fn get(&self, page: u16, reg: u8) -> u16 {
        let state = self.inner.borrow();
        let value = state.regs.get(&(page, reg)).copied().unwrap_or(0);
        if state.resets.get(&(page, reg)).copied().unwrap_or(0) > 0 {
            value | RESET_BIT
        } else {
            value
        }
    }

    /// Mark a reset as already in flight on `(page, reg)`.
    pub fn hold_reset(&self, page: u16, reg: u8) {
        let mut state = self.inner.borrow_mut();
        let latency = state.reset_latency;
        state.resets.insert((page, reg), latency);
    }

    pub fn page(&self) -> u16 {
        self.inner.borrow().page
    }

    /// Every `(page, reg, value)` written over MDIO, in order.
    pub fn writes(&self) -> Vec<(u16, u8, u16)> {
        self.inner.borrow().writes.clone()
    }

    fn mdio_read(&self, reg: u8) -> u16 {
        let mut state = self.inner.borrow_mut();
        if reg == PAGE_SELECT {
            return state.page;
        }

        let key = (state.page, reg);
        let value = state.regs.get(&key).copied().unwrap_or(0);
        match state.resets.get_mut(&key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                value | RESET_BIT
            }
            _ => value,
        }
    }

    fn mdio_write(&self, reg: u8, value: u16) {
        let mut state = self.inner.borrow_mut();
        let page = state.page;
        state.writes.push((page, reg, value));

        if reg == PAGE_SELECT {
            state.page = value;
            return;
        }

        let key = (page, reg);
        if value & RESET_BIT != 0 {
            let latency = state.reset_latency;
            state.resets.insert(key, latency);
        }
        state.regs.insert(key, value & !RESET_BIT);
    }
}

#[derive(Default)]
struct CacheModel {
    /// Device writes not yet visible to the CPU
    pending: Vec<(usize, Vec<u8>)>,
    /// Every maintenance range, as requested
    log: Vec<(usize, usize)>,
}

/// Non-coherent cache model.
///
/// Device ("DMA") writes are queued and only land in memory once the CPU
/// invalidates a line covering their first byte. A driver that reads a
/// descriptor without invalidating it first keeps seeing the old contents.
#[derive(Clone, Default)]
pub struct SimCache {
    inner: Rc<RefCell<CacheModel>>,
}

impl SimCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a device write of `bytes` at `addr`.
    pub fn dma_write(&self, addr: usize, bytes: &[u8]) {
        self.inner.borrow_mut().pending.push((addr, bytes.to_vec()));
    }

    pub fn dma_write_u16(&self, addr: usize, value: u16) {
        self.dma_write(addr, &value.to_le_bytes());
    }

    /// Device writes still invisible to the CPU
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Every maintenance request as `(addr, len)`.
    pub fn maintenance_log(&self) -> Vec<(usize, usize)> {
        self.inner.borrow().log.clone()
    }

    /// Whether any maintenance request covered `[addr, addr + len)`.
    pub fn covered(&self, addr: usize, len: usize) -> bool {
        self.inner.borrow().log.iter().any(|&(a, l)| {
            let (start, end) = line_span(a, l);
            start <= addr && addr + len <= end
        })
    }

    pub fn clear_log(&self) {
        self.inner.borrow_mut().log.clear();
    }
}

impl CacheMaintenance for SimCache {
    fn clean_invalidate(&self, addr: usize, len: usize) {
        let (start, end) = line_span(addr, len);
        let mut model = self.inner.borrow_mut();
        model.log.push((addr, len));

        let (visible, pending): (Vec<_>, Vec<_>) = model
            .pending
            .drain(..)
            .partition(|(a, _)| (start..end).contains(a));
        model.pending = pending;

        for (a, bytes) in visible {
            // SAFETY: Tests only queue writes into DMA regions owned by the
            // driver under test, which outlive the cache model's use.
            unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), a as *mut u8, bytes.len()) };
        }
    }
}

