//! Network Device Abstraction
//!
//! This module provides the trait a device-management layer uses to drive an
//! Ethernet controller, and the error type every driver operation reports.
//!
//! ## Design Philosophy
//!
//! The `NetworkDevice` trait is the whole surface a host environment sees:
//! bring-up, frame transmission, frame reception, shutdown and the station
//! address. Everything else (rings, PHY management, cache maintenance) stays
//! behind it.
//!
//! ## Current Implementations
//!
//! - `GxpUmac` - HPE GXP UMAC Ethernet controller
//!
//! ## Example Usage
//!
//! ```ignore
//! use gxp_umac::drivers::net::NetworkDevice;
//!
//! // Bring the interface up (rings armed, PHY negotiated)
//! netdev.init()?;
//!
//! // Transmit frame (blocks until the MAC has sent it)
//! let frame = [0xFF; 64];
//! netdev.send(&frame)?;
//!
//! // Receive frame (non-blocking)
//! if let Some(frame) = netdev.receive() {
//!     // Process received frame (frame.len() bytes)
//! }
//!
//! netdev.halt();
//! ```

use crate::drivers::net::mdio::MdioError;
use crate::drivers::poll::PollTimeout;
use crate::net::ethernet::MacAddress;
use core::fmt;

/// Errors that can occur during network device operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// Device is not initialized
    NotInitialized,

    /// Every transmit descriptor is still owned by hardware
    TxRingFull,

    /// Frame is too large for device
    FrameTooLarge,

    /// PHY reported no link after negotiation
    LinkDown,

    /// A bounded polling loop gave up
    Timeout,

    /// Timeout waiting for transmission to complete
    TransmitTimeout,

    /// PHY management transaction failed
    Mdio(MdioError),

    /// No valid station address could be found
    NoStationAddress,

    /// DMA memory could not be allocated
    OutOfMemory,

    /// Invalid configuration or parameter
    InvalidConfiguration,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::NotInitialized => write!(f, "Device not initialized"),
            NetworkError::TxRingFull => write!(f, "Transmit ring full"),
            NetworkError::FrameTooLarge => write!(f, "Frame too large"),
            NetworkError::LinkDown => write!(f, "No link"),
            NetworkError::Timeout => write!(f, "Operation timeout"),
            NetworkError::TransmitTimeout => write!(f, "Transmit timeout"),
            NetworkError::Mdio(err) => write!(f, "MDIO error: {}", err),
            NetworkError::NoStationAddress => write!(f, "No valid station address"),
            NetworkError::OutOfMemory => write!(f, "DMA allocation failed"),
            NetworkError::InvalidConfiguration => write!(f, "Invalid configuration"),
        }
    }
}

impl From<MdioError> for NetworkError {
    fn from(err: MdioError) -> Self {
        NetworkError::Mdio(err)
    }
}

impl From<PollTimeout> for NetworkError {
    fn from(_: PollTimeout) -> Self {
        NetworkError::Timeout
    }
}

/// Network device abstraction trait
///
/// This trait defines the minimal interface for a polled Ethernet device.
///
/// # Design Decisions
///
/// - **Blocking transmit**: `send` returns once the hardware hands the
///   descriptor back
/// - **Non-blocking receive**: Check for frames without waiting
/// - **Single-frame API**: No queue management in the trait
///
/// # Thread Safety
///
/// Implementations are not required to be thread-safe. Synchronization, if
/// the host needs any, is the caller's job.
pub trait NetworkDevice {
    /// Bring the device up
    ///
    /// Re-arms the descriptor rings, programs the MAC, starts the PHY and
    /// configures the MAC for the negotiated speed/duplex. Safe to call again
    /// after [`halt`](Self::halt).
    ///
    /// # Errors
    ///
    /// - `LinkDown` - PHY negotiated no link; the caller may retry later
    /// - `Mdio` / `Timeout` - PHY management failed under a bounded poll policy
    #[must_use = "init() failure must be handled - device may not be operational"]
    fn init(&mut self) -> Result<(), NetworkError>;

    /// Transmit an Ethernet frame
    ///
    /// Sends a complete Ethernet frame (header + payload, no FCS). Frames
    /// shorter than the 60-byte minimum are zero-padded.
    ///
    /// Returns the number of bytes put on the wire.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` - Must call `init()` first
    /// - `FrameTooLarge` - Frame > 1514 bytes
    /// - `TxRingFull` - Ring exhausted (only with a backpressure policy)
    /// - `TransmitTimeout` - Completion not seen (only with a bounded poll policy)
    #[must_use = "send() failure must be handled - frame may not have been sent"]
    fn send(&mut self, frame: &[u8]) -> Result<usize, NetworkError>;

    /// Receive an Ethernet frame (non-blocking)
    ///
    /// Returns the next frame, or `None` if the hardware has not delivered
    /// one. The returned slice is valid until the next call.
    fn receive(&mut self) -> Option<&[u8]>;

    /// Stop the device
    ///
    /// Disables the MAC transmit and receive channels and shuts the PHY down.
    fn halt(&mut self);

    /// Program a new station address into the MAC
    fn set_hardware_address(&mut self, address: MacAddress);

    /// Get the device's MAC address
    fn hardware_address(&self) -> MacAddress;

    /// Get link status (optional, returns false by default)
    fn link_up(&self) -> bool {
        false
    }
}
