//! `rohcpress`: an RFC 3095 ROHC (Robust Header Compression) compressor core.
//!
//! This library implements the compressor side of ROHC for the Uncompressed,
//! IP-only and UDP/IP profiles: the per-flow IR/FO/SO state machine, W-LSB
//! encoding of sequence numbers and IP-ID offsets, packet format selection
//! (IR, IR-DYN, UO-0, UO-1, UOR-2 with extensions), CRC protection and
//! feedback ingestion, all inside a multi-CID [`Compressor`].
//!
//! ## Core concepts
//!
//! - **[`Compressor`]**: owns the context table, the activated profiles and
//!   the global configuration. One instance per link, single-threaded.
//! - **Profiles**: pluggable [`ProfileHandler`] implementations; the
//!   classifier picks the most specific enabled profile per packet and the
//!   Uncompressed profile is the universal fallback.
//! - **Contexts**: per-flow state keyed by CID, created on the first packet
//!   of a flow and recycled least-recently-used when the CID space fills up.
//!
//! ## Quick start
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use rohcpress::{CidType, Compressor, RohcProfile};
//!
//! fn main() -> Result<(), rohcpress::RohcError> {
//!     let mut compressor = Compressor::new(CidType::Small, 15)?;
//!     compressor.activate_profile(RohcProfile::UdpIp)?;
//!     compressor.activate_profile(RohcProfile::Uncompressed)?;
//!     // A seeded RNG makes the output stream reproducible.
//!     compressor.set_random_source(Box::new(StdRng::seed_from_u64(42)));
//!
//!     // A minimal IPv4/UDP packet with a 4-byte payload.
//!     let packet: Vec<u8> = vec![
//!         0x45, 0x00, 0x00, 0x20, 0x00, 0x2A, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 192, 168, 0,
//!         1, 192, 168, 0, 2, 0x27, 0x10, 0x4E, 0x20, 0x00, 0x0C, 0x12, 0x34, 1, 2, 3, 4,
//!     ];
//!
//!     let mut out = [0u8; 256];
//!     let written = compressor.compress(&packet, &mut out)?;
//!     let info = compressor.last_packet_info().expect("one packet compressed");
//!     println!("{} -> {} bytes as {}", packet.len(), written, info.packet_type);
//!     Ok(())
//! }
//! ```

pub mod compressor;
pub mod constants;
pub mod crc;
pub mod encodings;
pub mod error;
pub mod feedback;
pub mod headers;
pub mod packet_defs;
pub mod profiles;
pub mod traits;
pub mod types;

pub use compressor::{Compressor, LastPacketInfo};
pub use error::{CompressionError, FeedbackError, RohcError, RohcParsingError};
pub use packet_defs::{
    CidType, ContextState, ExtensionType, RohcMode, RohcPacketType, RohcProfile,
};
pub use traits::{CompressedPacket, ContextConfig, ProfileHandler, RohcCompressorContext};
pub use types::{ContextId, IpId, SequenceNumber};
