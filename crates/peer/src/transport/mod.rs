//! Line transport adapters.
//!
//! This module provides two implementations of [`LineTransport`]:
//! - [`MemoryLink`]: a pair of in-process endpoints with an optional loss model
//! - [`UdpLineTransport`]: one datagram per line over a non-blocking UDP socket
//!
//! [`LineTransport`]: crate::ports::LineTransport

pub mod memory;
pub mod udp;

pub use memory::{LinkStats, MemoryEndpoint, MemoryLink};
pub use udp::UdpLineTransport;
