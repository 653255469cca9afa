//! ROHC profile identifiers and compressed packet classifications.

use std::fmt;

/// ROHC profile identifiers (RFC 3095, RFC 3843, RFC 4019; IANA assigned).
///
/// Handlers exist for `Uncompressed`, `UdpIp` and `IpOnly`; the remaining
/// variants are recognized so foreign identifiers survive round-trips through
/// feedback and diagnostics, but cannot be activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RohcProfile {
    /// Profile 0x0000: passthrough with periodic refresh.
    Uncompressed,
    /// Profile 0x0001: RTP/UDP/IP.
    RtpUdpIp,
    /// Profile 0x0002: UDP/IP.
    UdpIp,
    /// Profile 0x0003: ESP/IP.
    EspIp,
    /// Profile 0x0004: IP-only.
    IpOnly,
    /// Profile 0x0008: UDP-Lite/IP.
    UdpLite,
    /// Any profile identifier not assigned above.
    Unknown(u8),
}

impl From<u8> for RohcProfile {
    fn from(value: u8) -> Self {
        match value {
            0x00 => RohcProfile::Uncompressed,
            0x01 => RohcProfile::RtpUdpIp,
            0x02 => RohcProfile::UdpIp,
            0x03 => RohcProfile::EspIp,
            0x04 => RohcProfile::IpOnly,
            0x08 => RohcProfile::UdpLite,
            other => RohcProfile::Unknown(other),
        }
    }
}

impl From<RohcProfile> for u8 {
    fn from(value: RohcProfile) -> Self {
        match value {
            RohcProfile::Uncompressed => 0x00,
            RohcProfile::RtpUdpIp => 0x01,
            RohcProfile::UdpIp => 0x02,
            RohcProfile::EspIp => 0x03,
            RohcProfile::IpOnly => 0x04,
            RohcProfile::UdpLite => 0x08,
            RohcProfile::Unknown(other) => other,
        }
    }
}

impl fmt::Display for RohcProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RohcProfile::Uncompressed => write!(f, "Uncompressed"),
            RohcProfile::RtpUdpIp => write!(f, "RTP/UDP/IP"),
            RohcProfile::UdpIp => write!(f, "UDP/IP"),
            RohcProfile::EspIp => write!(f, "ESP/IP"),
            RohcProfile::IpOnly => write!(f, "IP-only"),
            RohcProfile::UdpLite => write!(f, "UDP-Lite/IP"),
            RohcProfile::Unknown(id) => write!(f, "Unknown(0x{:02X})", id),
        }
    }
}

/// CID addressing mode of a compressor instance (RFC 3095, Section 5.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CidType {
    /// CIDs 0..=15, signalled with Add-CID octets.
    Small,
    /// CIDs 0..=16383, signalled with SDVL-encoded CID bytes.
    Large,
}

/// The concrete format chosen for one emitted ROHC packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RohcPacketType {
    /// IR: full static and dynamic chains.
    Ir,
    /// IR-DYN: dynamic chain only.
    IrDyn,
    /// UO-0: one octet, 4 SN bits and a CRC-3.
    Uo0,
    /// UO-1: two octets, IP-ID offset plus SN and a CRC-3.
    Uo1,
    /// UOR-2: SN plus CRC-7, optionally extended.
    Uor2,
    /// Normal packet of the Uncompressed profile.
    Normal,
}

impl RohcPacketType {
    /// Whether this packet carries the dynamic chain.
    #[inline]
    pub fn carries_dynamic_chain(self) -> bool {
        matches!(self, RohcPacketType::Ir | RohcPacketType::IrDyn)
    }
}

impl fmt::Display for RohcPacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RohcPacketType::Ir => "IR",
            RohcPacketType::IrDyn => "IR-DYN",
            RohcPacketType::Uo0 => "UO-0",
            RohcPacketType::Uo1 => "UO-1",
            RohcPacketType::Uor2 => "UOR-2",
            RohcPacketType::Normal => "Normal",
        };
        write!(f, "{}", s)
    }
}

/// Extension appended to a UOR-2 packet (RFC 3095, Section 5.7.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    /// EXT-0: 3 SN bits, 3 inner IP-ID offset bits.
    Ext0,
    /// EXT-1: 3 SN bits, 11 inner IP-ID offset bits.
    Ext1,
    /// EXT-2: 3 SN bits, 11 outer and 8 inner IP-ID offset bits.
    Ext2,
    /// EXT-3: flag-selected fields.
    Ext3,
}

/// Compression state of a context (RFC 3095, Section 4.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextState {
    /// The decompressor is not assumed to hold any context.
    #[default]
    InitializationAndRefresh,
    /// Static context established; dynamic fields being communicated.
    FirstOrder,
    /// Full context; only the SN and derived fields are transmitted.
    SecondOrder,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextState::InitializationAndRefresh => "IR",
            ContextState::FirstOrder => "FO",
            ContextState::SecondOrder => "SO",
        };
        write!(f, "{}", s)
    }
}

/// ROHC operation mode (RFC 3095, Section 4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RohcMode {
    /// Unidirectional mode; the only mode with periodic refreshes.
    #[default]
    Unidirectional,
    /// Bidirectional Optimistic mode.
    BidirectionalOptimistic,
    /// Bidirectional Reliable mode.
    BidirectionalReliable,
}

impl RohcMode {
    /// Decodes the 2-bit mode field of a FEEDBACK-2 packet, if valid.
    pub fn from_feedback_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(RohcMode::Unidirectional),
            2 => Some(RohcMode::BidirectionalOptimistic),
            3 => Some(RohcMode::BidirectionalReliable),
            _ => None,
        }
    }
}
