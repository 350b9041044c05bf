//! DMX output system
//!
//! This module provides DMX512 output via Art-Net.
//!
//! ## Art-Net
//!
//! Art-Net is a UDP broadcast protocol for DMX transmission over Ethernet.
//! - Uses UDP broadcast (typically 255.255.255.255:6454)
//! - Port addresses are 0-based, engine universe ids are 1-based
//! - Sequencing is disabled (sequence byte 0)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lumen_control::dmx::{encode_dmx, ArtNetSender, DmxTransport};
//!
//! # fn main() -> lumen_control::Result<()> {
//! let sender = ArtNetSender::new("255.255.255.255", 6454)?;
//!
//! let mut channels = [0u8; 512];
//! channels[0] = 255;
//! sender.send(1, &channels)?;
//!
//! // Or inspect the raw packet
//! let packet = encode_dmx(1, &channels);
//! assert_eq!(packet.len(), 530);
//! # Ok(())
//! # }
//! ```

pub mod artnet;
pub mod transport;

pub use artnet::{encode_dmx, ArtNetSender, ARTDMX_PACKET_LEN};
pub use transport::DmxTransport;
