//! Descriptor rings and the DMA ownership protocol.
//!
//! The UMAC and the CPU share one TX ring and one RX ring. Bit 15 of each
//! entry's status word says who may touch it, and it is the only signal the
//! two sides exchange about a slot. The CPU's data cache is not coherent
//! with the UMAC, so every access to shared memory is bracketed:
//!
//! - **acquire**: clean+invalidate the entry, then read it
//! - **release**: write the entry, then clean+invalidate it
//!
//! Packet data gets the same treatment: TX frames are copied into a per-slot
//! bounce buffer and flushed before hand-over, RX buffers are invalidated
//! before they are read.
//!
//! Slots are addressed by index; the producer cursor is the next slot
//! software arms (TX) or inspects (RX), and only ever moves by
//! `(index + 1) % N`.

use core::marker::PhantomData;

use crate::drivers::cache::CacheMaintenance;
use crate::drivers::mmio::RegisterBus;
use crate::drivers::net::netdev::NetworkError;
use crate::drivers::poll::Poller;
use crate::net::ethernet::{MAX_FRAME_SIZE, MIN_FRAME_SIZE};

use super::config::TxFullPolicy;
use super::desc::{
    DESC_OWN, DESC_SIZE, Descriptor, Ownership, RxDescriptor, STATUS_OFFSET, TxDescriptor,
};
use super::dma::DmaRegion;
use super::regs::{CFG_MISSED, INT_RX_OVERRUN, INT_TX_DONE, UmacRegisters};

/// Bytes per packet buffer: the largest frame rounded up to 0x600
pub const PACKET_BUFFER_SIZE: usize = 0x600;

/// Entries per ring. Only these counts have a hardware size code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RingSize {
    #[default]
    Entries4,
    Entries8,
    Entries16,
    Entries32,
    Entries64,
    Entries128,
    Entries256,
}

impl RingSize {
    pub const ALL: [RingSize; 7] = [
        RingSize::Entries4,
        RingSize::Entries8,
        RingSize::Entries16,
        RingSize::Entries32,
        RingSize::Entries64,
        RingSize::Entries128,
        RingSize::Entries256,
    ];

    pub const fn entries(self) -> usize {
        match self {
            RingSize::Entries4 => 4,
            RingSize::Entries8 => 8,
            RingSize::Entries16 => 16,
            RingSize::Entries32 => 32,
            RingSize::Entries64 => 64,
            RingSize::Entries128 => 128,
            RingSize::Entries256 => 256,
        }
    }

    /// Value for the RING_SIZE register fields
    pub const fn size_code(self) -> u32 {
        match self {
            RingSize::Entries4 => 0x00,
            RingSize::Entries8 => 0x01,
            RingSize::Entries16 => 0x03,
            RingSize::Entries32 => 0x07,
            RingSize::Entries64 => 0x0F,
            RingSize::Entries128 => 0x1F,
            RingSize::Entries256 => 0x3F,
        }
    }

    pub fn from_entries(entries: usize) -> Result<Self, NetworkError> {
        Self::ALL
            .into_iter()
            .find(|size| size.entries() == entries)
            .ok_or_else(|| {
                log::error!("umac: unsupported ring size {}", entries);
                NetworkError::InvalidConfiguration
            })
    }
}

/// One ring of descriptors in DMA memory.
pub struct DescriptorRing<D> {
    region: DmaRegion,
    size: RingSize,
    producer: usize,
    completion: usize,
    _marker: PhantomData<D>,
}

impl<D: Descriptor> DescriptorRing<D> {
    pub fn new(size: RingSize) -> Result<Self, NetworkError> {
        Ok(Self {
            region: DmaRegion::new(size.entries() * DESC_SIZE)?,
            size,
            producer: 0,
            completion: 0,
            _marker: PhantomData,
        })
    }

    pub fn capacity(&self) -> usize {
        self.size.entries()
    }

    pub fn size(&self) -> RingSize {
        self.size
    }

    /// CPU address of entry 0
    pub fn base(&self) -> usize {
        self.region.addr()
    }

    pub fn bus_addr(&self) -> u32 {
        self.region.bus_addr()
    }

    pub fn len_bytes(&self) -> usize {
        self.region.len()
    }

    pub fn producer(&self) -> usize {
        self.producer
    }

    pub fn completion(&self) -> usize {
        self.completion
    }

    pub fn desc_addr(&self, index: usize) -> usize {
        self.base() + (index % self.capacity()) * DESC_SIZE
    }

    fn desc_ptr(&self, index: usize) -> *mut D {
        self.desc_addr(index) as *mut D
    }

    /// Invalidate entry `index`, then read it.
    pub fn acquire<C: CacheMaintenance>(&self, cache: &C, index: usize) -> D {
        cache.clean_invalidate(self.desc_addr(index), DESC_SIZE);
        // SAFETY: `desc_ptr` stays inside the ring allocation and is 16-byte
        // aligned; entries are plain-old-data.
        unsafe { self.desc_ptr(index).read_volatile() }
    }

    /// Write entry `index` (status last), then flush it to memory.
    pub fn release<C: CacheMaintenance>(&mut self, cache: &C, index: usize, desc: D) {
        let mut body = desc;
        body.set_status(desc.status() & !DESC_OWN);
        // SAFETY: See `acquire`.
        unsafe { self.desc_ptr(index).write_volatile(body) };
        self.release_status(cache, index, desc.status());
    }

    /// Rewrite only the status half-word of entry `index`, then flush it.
    ///
    /// The only store allowed on an entry hardware still owns.
    pub fn release_status<C: CacheMaintenance>(&mut self, cache: &C, index: usize, status: u16) {
        // SAFETY: See `acquire`; the status half-word is at a fixed, 2-byte
        // aligned offset inside the entry.
        unsafe {
            self.desc_ptr(index)
                .cast::<u8>()
                .add(STATUS_OFFSET)
                .cast::<u16>()
                .write_volatile(status);
        }
        cache.clean_invalidate(self.desc_addr(index), DESC_SIZE);
    }

    pub fn ownership<C: CacheMaintenance>(&self, cache: &C, index: usize) -> Ownership {
        self.acquire(cache, index).ownership()
    }

    /// Whether the producer slot is still held by hardware.
    pub fn is_full<C: CacheMaintenance>(&self, cache: &C) -> bool {
        self.ownership(cache, self.producer).is_hardware()
    }

    fn advance(&mut self) {
        self.producer = (self.producer + 1) % self.capacity();
    }

    fn reset(&mut self) {
        self.region.zero();
        self.producer = 0;
        self.completion = 0;
    }
}

/// TX and RX rings of one UMAC plus their packet buffers.
pub struct RingEngine<C> {
    tx: DescriptorRing<TxDescriptor>,
    rx: DescriptorRing<RxDescriptor>,
    tx_pool: DmaRegion,
    rx_pool: DmaRegion,
    cache: C,
    tx_poll: Poller,
    tx_full_policy: TxFullPolicy,
    name: &'static str,
}

impl<C: CacheMaintenance> RingEngine<C> {
    /// Allocate rings and pools and arm them.
    pub fn new(
        size: RingSize,
        cache: C,
        tx_poll: Poller,
        tx_full_policy: TxFullPolicy,
        name: &'static str,
    ) -> Result<Self, NetworkError> {
        let pool_bytes = size.entries() * PACKET_BUFFER_SIZE;
        let mut engine = Self {
            tx: DescriptorRing::new(size)?,
            rx: DescriptorRing::new(size)?,
            tx_pool: DmaRegion::new(pool_bytes)?,
            rx_pool: DmaRegion::new(pool_bytes)?,
            cache,
            tx_poll,
            tx_full_policy,
            name,
        };
        engine.reinitialize();
        Ok(engine)
    }

    pub fn tx_ring(&self) -> &DescriptorRing<TxDescriptor> {
        &self.tx
    }

    pub fn rx_ring(&self) -> &DescriptorRing<RxDescriptor> {
        &self.rx
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// CPU address of RX packet buffer `index`
    pub fn rx_slot_addr(&self, index: usize) -> usize {
        self.rx_pool.addr() + index * PACKET_BUFFER_SIZE
    }

    /// CPU address of TX bounce buffer `index`
    pub fn tx_slot_addr(&self, index: usize) -> usize {
        self.tx_pool.addr() + index * PACKET_BUFFER_SIZE
    }

    /// Zero everything, rewind both cursors and hand every RX slot to
    /// hardware.
    pub fn reinitialize(&mut self) {
        self.tx.reset();
        self.rx.reset();
        self.tx_pool.zero();
        self.rx_pool.zero();

        for index in 0..self.rx.capacity() {
            let desc = RxDescriptor {
                dma_address: self.rx_pool.bus_addr_at(index * PACKET_BUFFER_SIZE),
                status: DESC_OWN,
                count: MAX_FRAME_SIZE as u16,
                ..Default::default()
            };
            // SAFETY: `index` is inside the freshly zeroed ring.
            unsafe { self.rx.desc_ptr(index).write_volatile(desc) };
        }

        self.cache.clean_invalidate(self.tx.base(), self.tx.len_bytes());
        self.cache.clean_invalidate(self.rx.base(), self.rx.len_bytes());
        self.cache
            .clean_invalidate(self.tx_pool.addr(), self.tx_pool.len());
        self.cache
            .clean_invalidate(self.rx_pool.addr(), self.rx_pool.len());
    }

    /// Send one frame and wait for the UMAC to hand the slot back.
    ///
    /// Returns the length put on the wire (at least 60 bytes).
    pub fn enqueue_transmit<R: RegisterBus>(
        &mut self,
        mac: &UmacRegisters<R>,
        frame: &[u8],
    ) -> Result<usize, NetworkError> {
        if frame.len() > MAX_FRAME_SIZE {
            return Err(NetworkError::FrameTooLarge);
        }

        if self.tx.is_full(&self.cache) {
            self.wait_for_tx_slot()?;
        }

        let index = self.tx.producer();
        let wire_len = frame.len().max(MIN_FRAME_SIZE);

        let offset = index * PACKET_BUFFER_SIZE;
        let slot = &mut self.tx_pool.as_mut_slice()[offset..offset + wire_len];
        slot[..frame.len()].copy_from_slice(frame);
        slot[frame.len()..].fill(0);
        self.cache
            .clean_invalidate(self.tx_pool.addr() + offset, wire_len);

        let desc = TxDescriptor {
            dma_address: self.tx_pool.bus_addr_at(offset),
            status: DESC_OWN,
            count: wire_len as u16,
            cksum_offset: 0,
            reserved: 0,
        };
        self.tx.release(&self.cache, index, desc);
        mac.ring_doorbell();
        self.tx.advance();

        let tx = &self.tx;
        let cache = &self.cache;
        self.tx_poll
            .poll_until(|| {
                tx.acquire(cache, index);
                mac.interrupt() & INT_TX_DONE != 0
            })
            .map_err(|_| {
                log::error!("{}: no TX completion for slot {}", self.name, index);
                NetworkError::TransmitTimeout
            })?;
        mac.ack_interrupt(INT_TX_DONE);

        self.tx_poll
            .poll_until(|| !tx.ownership(cache, index).is_hardware())
            .map_err(|_| {
                log::error!("{}: TX slot {} never returned", self.name, index);
                NetworkError::TransmitTimeout
            })?;

        Ok(wire_len)
    }

    fn wait_for_tx_slot(&self) -> Result<(), NetworkError> {
        match self.tx_full_policy {
            TxFullPolicy::Backpressure => Err(NetworkError::TxRingFull),
            TxFullPolicy::Spin => {
                log::error!(
                    "{}: TX ring full at slot {}, waiting",
                    self.name,
                    self.tx.producer()
                );
                self.tx_poll
                    .poll_until(|| !self.tx.is_full(&self.cache))
                    .map_err(|_| NetworkError::TxRingFull)
            }
        }
    }

    /// Hand the next received frame to `consume` and re-arm its slot.
    ///
    /// Returns `None` if the producer slot is still owned by hardware.
    pub fn dequeue_receive_with<R, F, T>(&mut self, mac: &UmacRegisters<R>, consume: F) -> Option<T>
    where
        R: RegisterBus,
        F: FnOnce(&[u8]) -> T,
    {
        let status = mac.interrupt();
        if status & INT_RX_OVERRUN != 0 {
            log::warn!(
                "{}: RX overrun ({} total)",
                self.name,
                mac.overrun_count()
            );
        }
        mac.ack_interrupt(status);

        if mac.config_status() & CFG_MISSED != 0 {
            log::warn!("{}: RX missed frame", self.name);
            mac.clear_status();
        }

        let index = self.rx.producer();
        let mut desc = self.rx.acquire(&self.cache, index);
        match desc.ownership() {
            Ownership::Hardware => None,
            Ownership::HardwareError(bits) => {
                log::warn!(
                    "{}: RX slot {} error status {:#06x} - clearing",
                    self.name,
                    index,
                    bits
                );
                self.rx
                    .release_status(&self.cache, index, desc.status & !bits);
                None
            }
            Ownership::Software => {
                let len = usize::from(desc.count).min(PACKET_BUFFER_SIZE);
                let offset = index * PACKET_BUFFER_SIZE;
                self.cache
                    .clean_invalidate(self.rx_pool.addr() + offset, len);
                let delivered = consume(&self.rx_pool.as_slice()[offset..offset + len]);

                desc.dma_address = self.rx_pool.bus_addr_at(offset);
                desc.count = MAX_FRAME_SIZE as u16;
                desc.status = DESC_OWN;
                self.rx.release(&self.cache, index, desc);
                mac.ring_doorbell();
                self.rx.advance();

                Some(delivered)
            }
        }
    }
}
