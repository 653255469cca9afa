//! Error types of the compressor.
//!
//! Three layers mirror the failure taxonomy of the specification:
//! [`RohcParsingError`] for malformed uncompressed input, [`CompressionError`]
//! for operational failures of the compressor itself, and [`FeedbackError`]
//! for structurally invalid feedback. [`RohcError`] consolidates them.
//! The `thiserror` crate provides the ergonomic derives.

use thiserror::Error;

use crate::packet_defs::RohcProfile;
use crate::types::ContextId;

/// Locations where input parsing can run short of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseContext {
    Ipv4HeaderMin,
    Ipv4HeaderCalculated,
    Ipv6Header,
    InnerIpHeader,
    UdpHeader,
    FeedbackHeader,
    FeedbackOption,
}

impl std::fmt::Display for ParseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ipv4HeaderMin => "IPv4 header (minimum)",
            Self::Ipv4HeaderCalculated => "IPv4 header (calculated IHL)",
            Self::Ipv6Header => "IPv6 header",
            Self::InnerIpHeader => "inner IP header",
            Self::UdpHeader => "UDP header",
            Self::FeedbackHeader => "feedback header",
            Self::FeedbackOption => "feedback option",
        };
        write!(f, "{}", s)
    }
}

/// Fields referenced by structured errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    IpVersion,
    IpIhl,
    NumLsbBits,
    SnLsb,
    IpIdLsb,
    Crc3,
    Crc7,
    FeedbackOptionLength,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::IpVersion => "IP version",
            Self::IpIhl => "IPv4 IHL",
            Self::NumLsbBits => "num_lsb_bits",
            Self::SnLsb => "sn_lsb",
            Self::IpIdLsb => "ip_id_lsb",
            Self::Crc3 => "crc3",
            Self::Crc7 => "crc7",
            Self::FeedbackOptionLength => "feedback option length",
        };
        write!(f, "{}", s)
    }
}

/// Errors raised while parsing uncompressed headers handed to the compressor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RohcParsingError {
    /// Insufficient data to parse a complete field or structure.
    #[error("incomplete packet data: needed {needed} bytes, got {got} for {context}")]
    NotEnoughData {
        needed: usize,
        got: usize,
        context: ParseContext,
    },

    /// The input is not an IP packet of a supported version.
    #[error("invalid IP version: got {got}")]
    InvalidIpVersion { got: u8 },

    /// A field contained an invalid or unexpected value.
    #[error("invalid value for field '{field}': expected {expected}, got {got}")]
    InvalidFieldValue { field: Field, expected: u32, got: u32 },
}

/// Errors raised by compression operations and compressor configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompressionError {
    /// The caller-provided output buffer cannot hold the packet. The context
    /// is left untouched.
    #[error("output buffer too small: needed {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// The input cannot be handled by any profile, enabled or not.
    #[error("unsupported packet: {0}")]
    UnsupportedPacket(#[from] RohcParsingError),

    /// No enabled profile matches the packet.
    #[error("no enabled profile matches the packet")]
    NoProfileEnabled,

    /// The requested profile has no compressor implementation.
    #[error("profile {profile} is not implemented by this compressor")]
    ProfileNotImplemented { profile: RohcProfile },

    /// Every CID up to `max_cid` is in use and no context is old enough to
    /// evict.
    #[error("CID space exhausted: all {max_cid} CIDs in use by recent contexts")]
    CidSpaceExhausted { max_cid: u16 },

    /// `max_cid` exceeds what the CID addressing mode can express.
    #[error("max_cid {requested} exceeds the limit {limit} of the CID mode")]
    InvalidMaxCid { requested: u16, limit: u16 },

    /// No random source was installed before the first compression.
    #[error("random source missing: call set_random_source() before compress()")]
    RandomSourceMissing,

    /// Internal invariant violation; indicates a bug, not bad input.
    #[error("internal compressor error: {reason}")]
    Internal { reason: &'static str },
}

/// Errors raised by structurally invalid feedback. Feedback that parses but
/// fails its CRC option is dropped silently and never surfaces here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    /// The feedback data ended before a complete element was read.
    #[error("truncated feedback: needed {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    /// The feedback names a CID with no matching context.
    #[error("feedback for unknown context {0}")]
    UnknownCid(ContextId),

    /// An option length points past the end of the feedback.
    #[error("feedback option {option_type} with invalid length {length}")]
    InvalidOptionLength { option_type: u8, length: usize },
}

/// Top-level error type of the crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RohcError {
    /// Error while parsing uncompressed input headers.
    #[error("parsing error: {0}")]
    Parsing(#[from] RohcParsingError),

    /// Error during a compression operation.
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Error while ingesting feedback.
    #[error("feedback error: {0}")]
    Feedback(#[from] FeedbackError),
}
