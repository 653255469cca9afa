//! ROHC Uncompressed profile (0x0000, RFC 3095 Section 5.10).
//!
//! Passthrough with periodic refresh: IR packets establish the CID binding,
//! Normal packets prepend at most the CID bytes to the unmodified IP packet.
//! The state machine is degenerate, using only IR and FO ("Normal") states.
//! This profile matches every parseable IP packet and acts as the universal
//! fallback when no other enabled profile can compress a flow.

use std::any::Any;

use rand::RngCore;
use tracing::debug;

use crate::constants::IR_PACKET_TYPE_NO_DYN;
use crate::crc::CrcCalculators;
use crate::error::CompressionError;
use crate::feedback::{Feedback, FeedbackAckType};
use crate::headers::PacketHeaders;
use crate::packet_defs::{
    CidType, ContextState, RohcMode, RohcPacketType, RohcProfile,
};
use crate::traits::{
    CompressedPacket, ContextConfig, ProfileHandler, RohcCompressorContext,
};
use crate::types::ContextId;

/// Compressor context of the Uncompressed profile.
#[derive(Debug)]
pub struct UncompressedContext {
    cid: ContextId,
    state: ContextState,
    mode: RohcMode,
    /// IR packets sent in the current IR episode.
    ir_count: u32,
    /// Normal packets sent since context creation.
    normal_count: u32,
    /// Packets sent outside IR, for the periodic context refresh.
    go_back_ir_count: u32,
    ir_sends_before_normal: u32,
    ir_timeout: u32,
    last_used_tick: u64,
}

impl UncompressedContext {
    fn new(cid: ContextId, config: &ContextConfig, creation_tick: u64) -> Self {
        Self {
            cid,
            state: ContextState::InitializationAndRefresh,
            mode: RohcMode::Unidirectional,
            ir_count: 0,
            normal_count: 0,
            go_back_ir_count: 0,
            ir_sends_before_normal: config.oa_repetitions,
            ir_timeout: config.ir_timeout,
            last_used_tick: creation_tick,
        }
    }

    fn decide_state(&self) -> (ContextState, bool) {
        let mut target = self.state;
        if target == ContextState::InitializationAndRefresh
            && self.ir_count >= self.ir_sends_before_normal
        {
            target = ContextState::FirstOrder;
        }
        // Periodic down transition (U-mode only).
        let periodic = self.mode == RohcMode::Unidirectional
            && self.ir_timeout > 0
            && self.go_back_ir_count + 1 >= self.ir_timeout;
        if periodic {
            target = ContextState::InitializationAndRefresh;
        }
        (target, periodic)
    }

    fn force_ir(&mut self) {
        if self.state != ContextState::InitializationAndRefresh {
            self.state = ContextState::InitializationAndRefresh;
            self.ir_count = 0;
            self.normal_count = 0;
        }
    }
}

impl RohcCompressorContext for UncompressedContext {
    fn profile_id(&self) -> RohcProfile {
        RohcProfile::Uncompressed
    }

    fn cid(&self) -> ContextId {
        self.cid
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn mode(&self) -> RohcMode {
        self.mode
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn last_used_tick(&self) -> u64 {
        self.last_used_tick
    }

    fn touch(&mut self, tick: u64) {
        self.last_used_tick = tick;
    }
}

/// Handler of the Uncompressed profile.
#[derive(Debug, Default)]
pub struct UncompressedProfile;

impl UncompressedProfile {
    pub fn new() -> Self {
        Self
    }
}

impl ProfileHandler for UncompressedProfile {
    fn profile_id(&self) -> RohcProfile {
        RohcProfile::Uncompressed
    }

    /// Always matches: the Uncompressed profile is the universal fallback.
    fn matches(&self, _headers: &PacketHeaders) -> bool {
        true
    }

    /// All uncompressed traffic shares one context.
    fn context_matches(
        &self,
        context: &dyn RohcCompressorContext,
        _headers: &PacketHeaders,
    ) -> bool {
        context.as_any().is::<UncompressedContext>()
    }

    fn create_context(
        &self,
        cid: ContextId,
        _headers: &PacketHeaders,
        config: &ContextConfig,
        _rng: &mut dyn RngCore,
        creation_tick: u64,
    ) -> Box<dyn RohcCompressorContext> {
        Box::new(UncompressedContext::new(cid, config, creation_tick))
    }

    fn compress(
        &self,
        context: &mut dyn RohcCompressorContext,
        _headers: &PacketHeaders,
        packet: &[u8],
        cid_type: CidType,
        crc_calculators: &CrcCalculators,
        out: &mut [u8],
    ) -> Result<CompressedPacket, CompressionError> {
        let ctx = context
            .as_any_mut()
            .downcast_mut::<UncompressedContext>()
            .ok_or(CompressionError::Internal {
                reason: "Uncompressed handler received a foreign context",
            })?;

        let (target, periodic) = ctx.decide_state();
        let overhead = super::cid_overhead(cid_type, ctx.cid);

        let (header_len, payload_offset, packet_type) = match target {
            ContextState::InitializationAndRefresh => {
                // IR: type octet, CID info, profile octet, CRC-8; the whole
                // IP packet follows as payload (RFC 3095, Section 5.10.1).
                let header_len = 1 + overhead + 2;
                let needed = header_len + packet.len();
                if out.len() < needed {
                    return Err(CompressionError::BufferTooSmall {
                        needed,
                        available: out.len(),
                    });
                }
                let (first_position, mut pos) =
                    super::encode_cid_prefix(cid_type, ctx.cid, out);
                out[first_position] = IR_PACKET_TYPE_NO_DYN;
                out[pos] = RohcProfile::Uncompressed.into();
                pos += 1;
                out[pos] = 0;
                out[pos] = crc_calculators.crc8(&out[..pos + 1]);
                pos += 1;
                (pos, 0, RohcPacketType::Ir)
            }
            _ => {
                // Normal: the first IP octet doubles as the discriminator
                // (RFC 3095, Section 5.10.2).
                let header_len = 1 + overhead;
                let needed = header_len + packet.len() - 1;
                if out.len() < needed {
                    return Err(CompressionError::BufferTooSmall {
                        needed,
                        available: out.len(),
                    });
                }
                let (first_position, pos) = super::encode_cid_prefix(cid_type, ctx.cid, out);
                out[first_position] = packet[0];
                (pos, 1, RohcPacketType::Normal)
            }
        };

        // Commit.
        if ctx.state != target {
            ctx.state = target;
            ctx.ir_count = 0;
            ctx.normal_count = 0;
        }
        match packet_type {
            RohcPacketType::Ir => ctx.ir_count += 1,
            _ => ctx.normal_count += 1,
        }
        if periodic {
            ctx.go_back_ir_count = 0;
        } else if ctx.state == ContextState::FirstOrder {
            ctx.go_back_ir_count += 1;
        }

        Ok(CompressedPacket {
            header_len,
            payload_offset,
            packet_type,
            extension: None,
        })
    }

    fn handle_feedback(&self, context: &mut dyn RohcCompressorContext, feedback: &Feedback) {
        let Some(ctx) = context.as_any_mut().downcast_mut::<UncompressedContext>() else {
            return;
        };
        let Feedback::Feedback2 { feedback: fb, .. } = feedback else {
            return;
        };
        if fb.mode_bits != 0 && fb.crc_verified {
            if let Some(mode) = RohcMode::from_feedback_bits(fb.mode_bits) {
                if mode != ctx.mode {
                    ctx.mode = mode;
                    ctx.force_ir();
                }
            }
        }
        match fb.ack_type {
            FeedbackAckType::StaticNack => ctx.force_ir(),
            FeedbackAckType::Reserved => {
                debug!(cid = %ctx.cid, "feedback with reserved ack type dropped");
            }
            FeedbackAckType::Ack | FeedbackAckType::Nack => {}
        }
    }
}
