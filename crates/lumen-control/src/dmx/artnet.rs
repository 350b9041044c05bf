//! Art-Net protocol implementation (ArtDmx)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over Ethernet.
//! Only the OpDmx packet is produced here; the layout is fixed at 530 bytes:
//!
//! | Offset | Size | Field    | Value                         |
//! |--------|------|----------|-------------------------------|
//! | 0      | 8    | ID       | `"Art-Net\0"`                 |
//! | 8      | 2    | OpCode   | `0x5000`, little-endian       |
//! | 10     | 2    | ProtVer  | `14`, big-endian              |
//! | 12     | 1    | Sequence | `0` (sequencing disabled)     |
//! | 13     | 1    | Physical | `0`                           |
//! | 14     | 2    | Universe | `universe - 1`, little-endian |
//! | 16     | 2    | Length   | `512`, big-endian             |
//! | 18     | 512  | Data     | channel 1 first               |

use std::net::{IpAddr, SocketAddr, UdpSocket};

use lumen_core::DMX_CHANNELS;

use super::transport::DmxTransport;
use crate::{error::ControlError, Result};

/// Packet identifier, including the trailing NUL
pub const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
/// OpDmx opcode
pub const OP_DMX: u16 = 0x5000;
/// Protocol revision
pub const PROTOCOL_VERSION: u16 = 14;
/// Total size of an OpDmx packet with a full universe
pub const ARTDMX_PACKET_LEN: usize = HEADER_LEN + DMX_CHANNELS;

/// Field offsets within an OpDmx packet
pub mod offset {
    /// ID (8 bytes)
    pub const ID: usize = 0;
    /// OpCode (2 bytes, LE)
    pub const OPCODE: usize = 8;
    /// ProtVer (2 bytes, BE)
    pub const PROT_VER: usize = 10;
    /// Sequence (1 byte)
    pub const SEQUENCE: usize = 12;
    /// Physical input port (1 byte)
    pub const PHYSICAL: usize = 13;
    /// Port-Address (2 bytes, LE)
    pub const UNIVERSE: usize = 14;
    /// Data length (2 bytes, BE)
    pub const LENGTH: usize = 16;
    /// DMX data
    pub const DATA: usize = 18;
}

const HEADER_LEN: usize = offset::DATA;

/// Encode one universe as an OpDmx packet.
///
/// `universe` is the 1-based id used throughout the engine; Art-Net port
/// addresses are 0-based so `universe - 1` goes on the wire.
pub fn encode_dmx(universe: u16, channels: &[u8; DMX_CHANNELS]) -> [u8; ARTDMX_PACKET_LEN] {
    let mut packet = [0u8; ARTDMX_PACKET_LEN];

    packet[offset::ID..offset::OPCODE].copy_from_slice(ARTNET_ID);
    packet[offset::OPCODE..offset::PROT_VER].copy_from_slice(&OP_DMX.to_le_bytes());
    packet[offset::PROT_VER..offset::SEQUENCE].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet[offset::SEQUENCE] = 0;
    packet[offset::PHYSICAL] = 0;

    let port_address = universe.saturating_sub(1);
    packet[offset::UNIVERSE..offset::LENGTH].copy_from_slice(&port_address.to_le_bytes());
    packet[offset::LENGTH..offset::DATA].copy_from_slice(&(DMX_CHANNELS as u16).to_be_bytes());

    packet[offset::DATA..].copy_from_slice(channels);

    packet
}

/// Art-Net sender for outputting DMX data over UDP broadcast
#[derive(Debug)]
pub struct ArtNetSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl ArtNetSender {
    /// Create a new Art-Net sender
    ///
    /// # Arguments
    /// * `address` - Destination IP, typically a broadcast address
    /// * `port` - Destination UDP port (6454 for Art-Net)
    pub fn new(address: &str, port: u16) -> Result<Self> {
        let ip: IpAddr = address.trim().parse().map_err(|e: std::net::AddrParseError| {
            ControlError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;
        let target = SocketAddr::new(ip, port);

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;
        // Sends happen on the scheduler task and must never block it
        socket.set_nonblocking(true)?;

        tracing::info!("Art-Net sender created -> {}", target);

        Ok(Self { socket, target })
    }

    /// Destination address
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl DmxTransport for ArtNetSender {
    fn send(&self, universe: u16, channels: &[u8; DMX_CHANNELS]) -> Result<()> {
        let packet = encode_dmx(universe, channels);
        let sent = self.socket.send_to(&packet, self.target)?;
        if sent != packet.len() {
            return Err(ControlError::DmxError(format!(
                "short write for universe {}: {} of {} bytes",
                universe,
                sent,
                packet.len()
            )));
        }
        tracing::trace!("Sent Art-Net DMX packet for universe {}", universe);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("artnet://{}", self.target)
    }
}
