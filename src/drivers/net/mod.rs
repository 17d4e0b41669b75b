//! Network device drivers and abstractions

pub mod ethernet;
pub mod mdio;
pub mod netdev;
pub mod phy;
pub mod station;

// Re-export NetworkDevice trait for convenience
pub use netdev::*;
