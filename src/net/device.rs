//! smoltcp glue
//!
//! [`SmoltcpDevice`] wraps any [`NetworkDevice`] so it can back a
//! `smoltcp::iface::Interface`. Frames are staged in two owned buffers: the
//! RX token hands smoltcp a copy of the frame the driver returned, and the TX
//! token lets smoltcp fill a buffer that is passed to `send` when the token
//! is consumed.

use alloc::vec::Vec;

use smoltcp::phy::{self, DeviceCapabilities, Medium};
use smoltcp::time::Instant;
use smoltcp::wire::EthernetAddress;

use crate::drivers::net::NetworkDevice;
use crate::net::ethernet::MAX_FRAME_SIZE;

pub struct SmoltcpDevice<D> {
    dev: D,
    rx_buf: Vec<u8>,
    tx_buf: Vec<u8>,
}

impl<D: NetworkDevice> SmoltcpDevice<D> {
    pub fn new(dev: D) -> Self {
        Self {
            dev,
            rx_buf: Vec::with_capacity(MAX_FRAME_SIZE),
            tx_buf: Vec::with_capacity(MAX_FRAME_SIZE),
        }
    }

    pub fn inner(&self) -> &D {
        &self.dev
    }

    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.dev
    }

    pub fn into_inner(self) -> D {
        self.dev
    }

    /// Station address in smoltcp's representation, for `iface::Config`
    pub fn ethernet_address(&self) -> EthernetAddress {
        EthernetAddress(*self.dev.hardware_address().as_bytes())
    }
}

pub struct DeviceRxToken<'a> {
    buffer: &'a mut [u8],
}

impl phy::RxToken for DeviceRxToken<'_> {
    fn consume<R, F>(self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        f(self.buffer)
    }
}

pub struct DeviceTxToken<'a, D> {
    dev: &'a mut D,
    buffer: &'a mut Vec<u8>,
}

impl<D: NetworkDevice> phy::TxToken for DeviceTxToken<'_, D> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        self.buffer.clear();
        self.buffer.resize(len, 0);
        let result = f(&mut self.buffer[..]);

        // smoltcp has no way to learn about a failed send; it retransmits
        // at its own layer.
        if let Err(err) = self.dev.send(&self.buffer[..]) {
            log::warn!("smoltcp: dropped {} byte frame: {}", len, err);
        }
        result
    }
}

impl<D: NetworkDevice> phy::Device for SmoltcpDevice<D> {
    type RxToken<'a>
        = DeviceRxToken<'a>
    where
        Self: 'a;
    type TxToken<'a>
        = DeviceTxToken<'a, D>
    where
        Self: 'a;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let frame = self.dev.receive()?;
        self.rx_buf.clear();
        self.rx_buf.extend_from_slice(frame);

        Some((
            DeviceRxToken {
                buffer: &mut self.rx_buf[..],
            },
            DeviceTxToken {
                dev: &mut self.dev,
                buffer: &mut self.tx_buf,
            },
        ))
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        Some(DeviceTxToken {
            dev: &mut self.dev,
            buffer: &mut self.tx_buf,
        })
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = MAX_FRAME_SIZE;
        // One frame in flight: send blocks until the MAC hands it back.
        caps.max_burst_size = Some(1);
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::net::NetworkError;
    use crate::net::ethernet::MacAddress;
    use smoltcp::phy::{Device, RxToken, TxToken};
    use std::collections::VecDeque;
    use std::vec;

    #[derive(Default)]
    struct LoopDevice {
        inbox: VecDeque<Vec<u8>>,
        current: Vec<u8>,
        sent: Vec<Vec<u8>>,
        fail_send: bool,
    }

    impl NetworkDevice for LoopDevice {
        fn init(&mut self) -> Result<(), NetworkError> {
            Ok(())
        }

        fn send(&mut self, frame: &[u8]) -> Result<usize, NetworkError> {
            if self.fail_send {
                return Err(NetworkError::TransmitTimeout);
            }
            self.sent.push(frame.to_vec());
            Ok(frame.len())
        }

        fn receive(&mut self) -> Option<&[u8]> {
            self.current = self.inbox.pop_front()?;
            Some(&self.current)
        }

        fn halt(&mut self) {}

        fn set_hardware_address(&mut self, _address: MacAddress) {}

        fn hardware_address(&self) -> MacAddress {
            MacAddress::new([0x02, 0, 0, 0, 0, 0x01])
        }
    }

    #[test]
    fn nothing_pending_yields_no_tokens() {
        let mut device = SmoltcpDevice::new(LoopDevice::default());
        assert!(device.receive(Instant::ZERO).is_none());
    }

    #[test]
    fn received_frame_reaches_consumer() {
        let mut dev = LoopDevice::default();
        dev.inbox.push_back(vec![0xAB; 64]);
        let mut device = SmoltcpDevice::new(dev);

        let (rx, _tx) = device.receive(Instant::ZERO).unwrap();
        let seen = rx.consume(|frame| frame.to_vec());

        assert_eq!(seen, vec![0xAB; 64]);
        assert!(device.receive(Instant::ZERO).is_none());
    }

    #[test]
    fn transmit_token_sends_filled_buffer() {
        let mut device = SmoltcpDevice::new(LoopDevice::default());

        let tx = device.transmit(Instant::ZERO).unwrap();
        tx.consume(42, |buf| buf.fill(0x5A));

        assert_eq!(device.inner().sent, vec![vec![0x5A; 42]]);
    }

    #[test]
    fn failed_send_is_swallowed() {
        let mut device = SmoltcpDevice::new(LoopDevice {
            fail_send: true,
            ..LoopDevice::default()
        });

        let tx = device.transmit(Instant::ZERO).unwrap();
        let value = tx.consume(60, |_| 7);

        assert_eq!(value, 7);
        assert!(device.into_inner().sent.is_empty());
    }

    #[test]
    fn capabilities_describe_ethernet() {
        let device = SmoltcpDevice::new(LoopDevice::default());
        let caps = device.capabilities();

        assert_eq!(caps.medium, Medium::Ethernet);
        assert_eq!(caps.max_transmission_unit, MAX_FRAME_SIZE);
        assert_eq!(caps.max_burst_size, Some(1));
        assert_eq!(
            device.ethernet_address(),
            EthernetAddress([0x02, 0, 0, 0, 0, 0x01])
        );
    }
}
