//! Polled-mode driver for the HPE GXP UMAC Ethernet controller.
//!
//! The driver runs on a single thread with no interrupts: every wait is a
//! polling loop on a hardware status bit. It is built from four layers:
//!
//! - [`drivers::net::mdio`]: MMI register transactions to PHYs
//! - [`drivers::net::phy`]: PHY mode selection, reset and negotiation
//! - [`drivers::net::ethernet::hpe::umac::ring`]: DMA descriptor rings
//! - [`drivers::net::ethernet::hpe::umac`]: MAC registers and the device front end
//!
//! Outside of `cfg(test)` the crate is `no_std` and only needs `alloc` for the
//! DMA regions.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod drivers;
pub mod net;

#[cfg(test)]
pub(crate) mod testing;
