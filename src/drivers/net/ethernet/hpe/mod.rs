//! HPE BMC SoC Ethernet controllers

pub mod umac;

pub use umac::GxpUmac;
