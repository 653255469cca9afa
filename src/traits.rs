//! Core traits wiring profiles into the compressor.
//!
//! [`ProfileHandler`] is the registry-facing interface one compression
//! profile implements; [`RohcCompressorContext`] is the per-flow state it
//! creates and operates on. The compressor owns contexts exclusively and
//! hands them to handlers as trait objects; handlers downcast to their
//! concrete context type at the boundary and use typed state from there on.

use std::any::Any;
use std::fmt::Debug;

use rand::RngCore;

use crate::crc::CrcCalculators;
use crate::error::CompressionError;
use crate::feedback::Feedback;
use crate::headers::PacketHeaders;
use crate::packet_defs::{
    CidType, ContextState, ExtensionType, RohcMode, RohcPacketType, RohcProfile,
};
use crate::types::ContextId;

/// Tunables a context captures at creation time.
#[derive(Debug, Clone, Copy)]
pub struct ContextConfig {
    /// Optimistic approach repetition count.
    pub oa_repetitions: u32,
    /// Periodic IR refresh timeout in packets (U-mode).
    pub ir_timeout: u32,
    /// Periodic FO refresh timeout in packets (U-mode).
    pub fo_timeout: u32,
    /// W-LSB window width.
    pub wlsb_window_width: usize,
}

/// Result of one successful profile compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedPacket {
    /// Bytes of compressed header written to the output buffer.
    pub header_len: usize,
    /// Offset into the uncompressed packet at which the payload starts.
    pub payload_offset: usize,
    /// The packet format that was emitted.
    pub packet_type: RohcPacketType,
    /// Extension appended to a UOR-2, if any.
    pub extension: Option<ExtensionType>,
}

/// Per-flow compressor state owned by the compressor.
pub trait RohcCompressorContext: Send + Debug {
    /// Profile this context was created by.
    fn profile_id(&self) -> RohcProfile;
    /// CID assigned to this flow.
    fn cid(&self) -> ContextId;
    /// Current compression state.
    fn state(&self) -> ContextState;
    /// Current operation mode.
    fn mode(&self) -> RohcMode;
    /// Context as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Context as `&mut dyn Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Compressor tick of the last successful use, for LRU eviction.
    fn last_used_tick(&self) -> u64;
    /// Records a successful use at the given compressor tick.
    fn touch(&mut self, tick: u64);
}

/// One compression profile.
///
/// Implementations are stateless; all per-flow state lives in the contexts
/// they create. `compress` must leave the context byte-identical when it
/// fails: every context mutation is committed only after the packet has been
/// fully written.
pub trait ProfileHandler: Send + Debug {
    /// Profile identifier of this handler.
    fn profile_id(&self) -> RohcProfile;

    /// Whether this profile can compress the given header chain.
    fn matches(&self, headers: &PacketHeaders) -> bool;

    /// Whether an existing context of this profile belongs to the flow the
    /// headers describe (static chain comparison).
    fn context_matches(&self, context: &dyn RohcCompressorContext, headers: &PacketHeaders)
        -> bool;

    /// Creates a context for a new flow. `rng` seeds the initial SN where
    /// the profile requires an unpredictable value (RFC 3095, Section
    /// 5.11.1); `creation_tick` is the compressor tick of the packet that
    /// triggered creation.
    fn create_context(
        &self,
        cid: ContextId,
        headers: &PacketHeaders,
        config: &ContextConfig,
        rng: &mut dyn RngCore,
        creation_tick: u64,
    ) -> Box<dyn RohcCompressorContext>;

    /// Compresses one packet into `out`.
    ///
    /// `packet` is the complete uncompressed packet; the handler checks that
    /// header plus payload fit in `out` before committing any state, so a
    /// `BufferTooSmall` failure leaves the context untouched.
    ///
    /// # Errors
    /// - [`CompressionError::BufferTooSmall`] - `out` cannot hold the result
    fn compress(
        &self,
        context: &mut dyn RohcCompressorContext,
        headers: &PacketHeaders,
        packet: &[u8],
        cid_type: CidType,
        crc_calculators: &CrcCalculators,
        out: &mut [u8],
    ) -> Result<CompressedPacket, CompressionError>;

    /// Applies one feedback element to a context of this profile.
    fn handle_feedback(&self, context: &mut dyn RohcCompressorContext, feedback: &Feedback);
}
