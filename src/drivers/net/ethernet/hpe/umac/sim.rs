//! Device side of the UMAC for the unit tests.
//!
//! [`SimUmac`] hooks a [`SimBus`] so that:
//!
//! - writes to INTERRUPT clear the written bits
//! - a write to RING_PTR rewinds the device's TX cursor
//! - a doorbell completes every hardware-owned TX entry at the device's
//!   cursor: the entry is logged, its status is cleared through the cache
//!   model (visible only after the driver invalidates it) and the TX-done
//!   interrupt bit is raised

use std::boxed::Box;
use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::testing::{SimBus, SimCache, no_delay};

use super::desc::{DESC_OWN, DESC_SIZE, STATUS_OFFSET, TxDescriptor};
use super::regs::{INT_TX_DONE, UMAC_INTERRUPT, UMAC_RING_PROMPT, UMAC_RING_PTR, UmacRegisters};
use super::ring::RingSize;

struct TxModel {
    ring: usize,
    entries: usize,
    cursor: usize,
    stalled: bool,
    sent: Vec<(usize, u16)>,
}

pub struct SimUmac {
    pub bus: SimBus,
    pub regs: UmacRegisters<SimBus>,
    tx: Rc<RefCell<TxModel>>,
}

impl SimUmac {
    pub fn new(cache: SimCache, tx_ring: usize, size: RingSize) -> Self {
        Self::attach(SimBus::new(), cache, tx_ring, size)
    }

    /// Act as the UMAC behind `bus`, whose TX ring starts at `tx_ring`.
    pub fn attach(bus: SimBus, cache: SimCache, tx_ring: usize, size: RingSize) -> Self {
        bus.add_hook(Box::new(|regs, offset, written, previous| {
            if offset == UMAC_INTERRUPT {
                regs.insert(offset, previous & !written);
            }
        }));

        let tx = Rc::new(RefCell::new(TxModel {
            ring: tx_ring,
            entries: size.entries(),
            cursor: 0,
            stalled: false,
            sent: Vec::new(),
        }));

        let model = tx.clone();
        bus.add_hook(Box::new(move |regs, offset, _, _| {
            let mut tx = model.borrow_mut();
            if offset == UMAC_RING_PTR {
                tx.cursor = 0;
                return;
            }
            if offset != UMAC_RING_PROMPT {
                return;
            }
            if tx.stalled {
                return;
            }
            for _ in 0..tx.entries {
                let addr = tx.ring + tx.cursor * DESC_SIZE;
                // SAFETY: `ring` is the base of a live TX ring of `entries`
                // descriptors owned by the engine under test.
                let desc = unsafe { (addr as *const TxDescriptor).read_volatile() };
                if desc.status & DESC_OWN == 0 {
                    break;
                }
                let cursor = tx.cursor;
                tx.sent.push((cursor, desc.count));
                cache.dma_write_u16(addr + STATUS_OFFSET, 0);
                tx.cursor = (cursor + 1) % tx.entries;

                let pending = regs.get(&UMAC_INTERRUPT).copied().unwrap_or(0);
                regs.insert(UMAC_INTERRUPT, pending | INT_TX_DONE);
            }
        }));

        Self {
            regs: UmacRegisters::new(bus.clone(), no_delay),
            bus,
            tx,
        }
    }

    /// `(slot, count)` of every frame the device picked up
    pub fn transmitted(&self) -> Vec<(usize, u16)> {
        self.tx.borrow().sent.clone()
    }

    /// Stop completing transmissions.
    pub fn stall_tx(&self) {
        self.tx.borrow_mut().stalled = true;
    }

    /// Complete transmissions again from the next doorbell on.
    pub fn resume_tx(&self) {
        self.tx.borrow_mut().stalled = false;
    }
}
