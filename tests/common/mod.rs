//! Shared helpers for the integration tests.

use rand::rngs::StdRng;
use rand::SeedableRng;

use rohcpress::{CidType, Compressor, RohcProfile};

/// Builder for IPv4/UDP test packets with stable static fields.
#[derive(Debug, Clone)]
pub struct UdpFlow {
    pub src: [u8; 4],
    pub dst: [u8; 4],
    pub src_port: u16,
    pub dst_port: u16,
    pub checksum: u16,
    pub payload: Vec<u8>,
}

impl Default for UdpFlow {
    fn default() -> Self {
        Self {
            src: [192, 168, 1, 10],
            dst: [192, 168, 1, 20],
            src_port: 10000,
            dst_port: 20000,
            checksum: 0x1234,
            payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
        }
    }
}

impl UdpFlow {
    pub fn with_ports(src_port: u16, dst_port: u16) -> Self {
        Self {
            src_port,
            dst_port,
            ..Self::default()
        }
    }

    /// Builds the packet bytes for one IP-ID value.
    pub fn packet(&self, ip_id: u16) -> Vec<u8> {
        let udp_len = 8 + self.payload.len() as u16;
        let total_len = 20 + udp_len;
        let mut packet = Vec::with_capacity(total_len as usize);
        packet.extend_from_slice(&[0x45, 0x00]);
        packet.extend_from_slice(&total_len.to_be_bytes());
        packet.extend_from_slice(&ip_id.to_be_bytes());
        packet.extend_from_slice(&[0x40, 0x00, 0x40, 0x11, 0x00, 0x00]);
        packet.extend_from_slice(&self.src);
        packet.extend_from_slice(&self.dst);
        packet.extend_from_slice(&self.src_port.to_be_bytes());
        packet.extend_from_slice(&self.dst_port.to_be_bytes());
        packet.extend_from_slice(&udp_len.to_be_bytes());
        packet.extend_from_slice(&self.checksum.to_be_bytes());
        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// A small-CID compressor with the three implemented profiles enabled and a
/// seeded random source.
pub fn ready_compressor(seed: u64) -> Compressor {
    let mut comp = Compressor::new(CidType::Small, 15).expect("valid max_cid");
    comp.activate_profile(RohcProfile::UdpIp).unwrap();
    comp.activate_profile(RohcProfile::IpOnly).unwrap();
    comp.activate_profile(RohcProfile::Uncompressed).unwrap();
    comp.set_random_source(Box::new(StdRng::seed_from_u64(seed)));
    comp
}
