//! Device drivers subsystem
//!
//! Organized by concern:
//! - `mmio`: register window access
//! - `cache`: data-cache maintenance around DMA memory
//! - `timer`: microsecond delays
//! - `poll`: bounded/unbounded polling loops
//! - `net`: network device drivers

pub mod cache;
pub mod mmio;
pub mod net;
pub mod poll;
pub mod timer;
