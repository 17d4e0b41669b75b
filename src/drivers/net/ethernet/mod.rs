//! Ethernet controller drivers, grouped by vendor

pub mod hpe;
