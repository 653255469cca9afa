//! Generic ROHC (Robust Header Compression) protocol constants and bitmasks.
//!
//! Defines constants applicable across the compressor framework: packet type
//! discriminators, CID encoding masks, protocol numbers and the default
//! operational parameters of the RFC 3095 U-mode state machine.
//! Profile-specific constants live in their respective profile modules.

// --- Operational defaults ---

/// Default number of repetitions required by the optimistic approach before a
/// change is assumed received by the decompressor (RFC 3095, Section 4.5.1).
pub const DEFAULT_OA_REPETITIONS: u32 = 3;
/// Default W-LSB window width (number of tracked references).
pub const DEFAULT_WLSB_WINDOW_WIDTH: usize = 4;
/// Default periodic IR refresh timeout, in packets (U-mode).
pub const DEFAULT_IR_TIMEOUT: u32 = 1700;
/// Default periodic FO refresh timeout, in packets (U-mode).
pub const DEFAULT_FO_TIMEOUT: u32 = 700;

// --- CID encoding (RFC 3095, Sections 5.2.3 and 4.5.6) ---

/// Mask for the prefix of an Add-CID octet.
pub const ADD_CID_PREFIX_MASK: u8 = 0b1111_0000;
/// Prefix value of an Add-CID octet (`1110 CCCC`).
pub const ADD_CID_PREFIX_VALUE: u8 = 0b1110_0000;
/// Mask extracting the small CID (0-15) from an Add-CID octet.
pub const SMALL_CID_MASK: u8 = 0x0F;
/// Maximum CID value in small CID mode.
pub const SMALL_CID_MAX: u16 = 15;
/// Maximum CID value in large CID mode (SDVL, 2 octets).
pub const LARGE_CID_MAX: u16 = (1 << 14) - 1;

// --- Packet type discriminators (RFC 3095, Section 5.7) ---

/// IR packet type octet with the D bit set (`1111110 D=1`).
pub const IR_PACKET_TYPE_WITH_DYN: u8 = 0xFD;
/// IR packet type octet without dynamic chain (`1111110 D=0`).
pub const IR_PACKET_TYPE_NO_DYN: u8 = 0xFC;
/// Mask for the D bit of an IR packet type octet.
pub const IR_D_BIT_MASK: u8 = 0x01;
/// IR-DYN packet type octet (`11111000`).
pub const IR_DYN_PACKET_TYPE: u8 = 0xF8;
/// UO-1 discriminator bits (`10` in the two MSBs).
pub const UO1_DISCRIMINATOR_BITS: u8 = 0b1000_0000;
/// UOR-2 discriminator bits (`110` in the three MSBs).
pub const UOR2_DISCRIMINATOR_BITS: u8 = 0b1100_0000;

// --- W-LSB field widths ---

/// SN bits carried by a UO-0 packet.
pub const UO0_SN_BITS: u8 = 4;
/// SN bits carried by UO-1 and the UOR-2 base octet.
pub const UO1_SN_BITS: u8 = 5;
/// IP-ID offset bits carried by a UO-1 packet.
pub const UO1_IP_ID_BITS: u8 = 6;
/// SN bits available with UOR-2 + EXT-0/1/2 (5 in the base, 3 in the
/// extension).
pub const UOR2_EXT_SN_BITS: u8 = 8;
/// SN bits available with UOR-2 + EXT-3 and the S flag set.
pub const UOR2_EXT3_SN_BITS: u8 = 13;
/// IP-ID offset bits carried by EXT-0.
pub const EXT0_IP_ID_BITS: u8 = 3;
/// IP-ID offset bits carried by EXT-1 (3 in the first octet, 8 appended).
pub const EXT1_IP_ID_BITS: u8 = 11;
/// Inner IP-ID offset bits carried by EXT-2.
pub const EXT2_INNER_IP_ID_BITS: u8 = 8;
/// Outer IP-ID offset bits carried by EXT-2.
pub const EXT2_OUTER_IP_ID_BITS: u8 = 11;

// --- Standard Internet protocol numbers (IANA assigned) ---

/// IP protocol number for IPv4-in-IPv4 encapsulation.
pub const IP_PROTOCOL_IPIP: u8 = 4;
/// IP protocol number for TCP.
pub const IP_PROTOCOL_TCP: u8 = 6;
/// IP protocol number for UDP.
pub const IP_PROTOCOL_UDP: u8 = 17;
/// IP protocol number for ESP.
pub const IP_PROTOCOL_ESP: u8 = 50;

// --- Header field constants ---

/// Minimum IPv4 header length in bytes (IHL of 5 words).
pub const IPV4_MIN_HEADER_LENGTH_BYTES: usize = 20;
/// Standard IPv4 IHL in 32-bit words (no options).
pub const IPV4_STANDARD_IHL: u8 = 5;
/// Fixed IPv6 header length in bytes.
pub const IPV6_HEADER_LENGTH_BYTES: usize = 40;
/// Fixed UDP header length in bytes.
pub const UDP_HEADER_LENGTH_BYTES: usize = 8;

/// Largest IPv4 Identification increment still treated as sequential when
/// detecting NBO/RND behaviour. Jumps beyond this make the IP-ID random and
/// it travels verbatim in the packet tail instead of as a W-LSB offset.
pub const IP_ID_SEQUENTIAL_MAX_DELTA: u16 = 1024;

/// Upper bound of a compressed header emitted by this compressor: CID bytes,
/// type octets, two IP static + dynamic chains, next-header parts, SN
/// remainder and extensions all fit well below this.
pub const MAX_COMPRESSED_HEADER_LEN: usize = 128;
