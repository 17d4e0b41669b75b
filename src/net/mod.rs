//! Network stack glue
//!
//! Link-layer types shared by the drivers, and the adaptor that lets a
//! [`NetworkDevice`](crate::drivers::net::NetworkDevice) back a smoltcp
//! interface.

pub mod device;
pub mod ethernet;

// Re-export commonly used types
pub use device::SmoltcpDevice;
pub use ethernet::MacAddress;
