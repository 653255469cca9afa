//! The ROHC compressor.
//!
//! Owns the per-flow context table, the registry of activated profiles, the
//! CRC tables and the global configuration. [`Compressor::compress`] is the
//! single entry point for outgoing packets: it classifies the uncompressed
//! headers, finds or creates the flow's context, delegates to the profile
//! handler and appends the payload. [`Compressor::deliver_feedback`] ingests
//! feedback from the reverse channel before the next `compress` call, as the
//! processing model requires.

use std::collections::BTreeMap;
use std::fmt;

use rand::RngCore;
use tracing::debug;

use crate::constants::{
    DEFAULT_FO_TIMEOUT, DEFAULT_IR_TIMEOUT, DEFAULT_OA_REPETITIONS, DEFAULT_WLSB_WINDOW_WIDTH,
    LARGE_CID_MAX, SMALL_CID_MAX,
};
use crate::crc::CrcCalculators;
use crate::error::{CompressionError, FeedbackError, RohcError};
use crate::feedback::parse_feedback;
use crate::headers::parse_headers;
use crate::packet_defs::{CidType, ContextState, ExtensionType, RohcPacketType, RohcProfile};
use crate::profiles::{ip::IpOnlyProfile, uncompressed::UncompressedProfile, udp::UdpProfile};
use crate::traits::{ContextConfig, ProfileHandler, RohcCompressorContext};
use crate::types::ContextId;

/// Metadata about the most recently emitted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPacketInfo {
    pub packet_type: RohcPacketType,
    pub extension: Option<ExtensionType>,
    pub cid: ContextId,
    pub profile_id: RohcProfile,
    pub header_len: usize,
    pub payload_len: usize,
}

/// A single-threaded ROHC compressor instance.
///
/// Two instances are fully independent; only the immutable CRC tables could
/// be shared between them. The hot path does not allocate: contexts are
/// created once per flow and every buffer is caller-owned.
pub struct Compressor {
    cid_type: CidType,
    max_cid: u16,
    mrru: u16,
    contexts: BTreeMap<ContextId, Box<dyn RohcCompressorContext>>,
    /// Activated profiles, most specific first.
    profiles: Vec<Box<dyn ProfileHandler>>,
    crc_calculators: CrcCalculators,
    rng: Option<Box<dyn RngCore + Send>>,
    /// Monotonic operation counter; every compress operation advances it
    /// and successful ones stamp their context for least-recently-used
    /// eviction.
    tick: u64,
    context_config: ContextConfig,
    last_packet_info: Option<LastPacketInfo>,
}

impl fmt::Debug for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compressor")
            .field("cid_type", &self.cid_type)
            .field("max_cid", &self.max_cid)
            .field("contexts", &self.contexts.len())
            .field("profiles", &self.profiles.iter().map(|p| p.profile_id()).collect::<Vec<_>>())
            .field("rng", &self.rng.is_some())
            .finish()
    }
}

/// Fixed profile preference: the most specific matching profile wins and the
/// Uncompressed fallback always loses.
fn profile_priority(profile: RohcProfile) -> u8 {
    match profile {
        RohcProfile::UdpIp => 0,
        RohcProfile::IpOnly => 1,
        RohcProfile::Uncompressed => 2,
        _ => 3,
    }
}

impl Compressor {
    /// Creates a compressor.
    ///
    /// # Errors
    /// - [`CompressionError::InvalidMaxCid`] - `max_cid` exceeds the CID mode
    pub fn new(cid_type: CidType, max_cid: u16) -> Result<Self, CompressionError> {
        let limit = match cid_type {
            CidType::Small => SMALL_CID_MAX,
            CidType::Large => LARGE_CID_MAX,
        };
        if max_cid > limit {
            return Err(CompressionError::InvalidMaxCid {
                requested: max_cid,
                limit,
            });
        }
        Ok(Self {
            cid_type,
            max_cid,
            mrru: 0,
            contexts: BTreeMap::new(),
            profiles: Vec::new(),
            crc_calculators: CrcCalculators::new(),
            rng: None,
            tick: 0,
            context_config: ContextConfig {
                oa_repetitions: DEFAULT_OA_REPETITIONS,
                ir_timeout: DEFAULT_IR_TIMEOUT,
                fo_timeout: DEFAULT_FO_TIMEOUT,
                wlsb_window_width: DEFAULT_WLSB_WINDOW_WIDTH,
            },
            last_packet_info: None,
        })
    }

    /// Enables a profile. All profiles start disabled; activation is
    /// idempotent.
    ///
    /// # Errors
    /// - [`CompressionError::ProfileNotImplemented`] - no handler exists for
    ///   the profile
    pub fn activate_profile(&mut self, profile: RohcProfile) -> Result<(), CompressionError> {
        if self.profiles.iter().any(|p| p.profile_id() == profile) {
            return Ok(());
        }
        let handler: Box<dyn ProfileHandler> = match profile {
            RohcProfile::Uncompressed => Box::new(UncompressedProfile::new()),
            RohcProfile::IpOnly => Box::new(IpOnlyProfile::new()),
            RohcProfile::UdpIp => Box::new(UdpProfile::new()),
            other => return Err(CompressionError::ProfileNotImplemented { profile: other }),
        };
        self.profiles.push(handler);
        self.profiles
            .sort_by_key(|p| profile_priority(p.profile_id()));
        Ok(())
    }

    /// Installs the random source used to draw the initial SN of new
    /// contexts. Required before the first [`compress`](Self::compress);
    /// a seeded RNG makes the compressor fully deterministic.
    pub fn set_random_source(&mut self, rng: Box<dyn RngCore + Send>) {
        self.rng = Some(rng);
    }

    /// Sets the W-LSB window width for contexts created afterwards.
    pub fn set_wlsb_window_width(&mut self, width: usize) {
        self.context_config.wlsb_window_width = width.max(1);
    }

    /// Sets the U-mode periodic refresh timeouts, in packets, for contexts
    /// created afterwards. Zero disables the respective refresh.
    pub fn set_periodic_refreshes(&mut self, ir_timeout: u32, fo_timeout: u32) {
        self.context_config.ir_timeout = ir_timeout;
        self.context_config.fo_timeout = fo_timeout;
    }

    /// Sets the optimistic approach repetition count for contexts created
    /// afterwards.
    pub fn set_oa_repetitions(&mut self, repetitions: u32) {
        self.context_config.oa_repetitions = repetitions.max(1);
    }

    /// Sets the maximum reconstructed reception unit. Stored for link-layer
    /// negotiation; this compressor never segments.
    pub fn set_mrru(&mut self, mrru: u16) {
        self.mrru = mrru;
    }

    /// Currently configured MRRU.
    pub fn mrru(&self) -> u16 {
        self.mrru
    }

    /// Compresses one uncompressed IP packet into `out`, returning the
    /// total number of bytes written (compressed header plus payload).
    ///
    /// # Errors
    /// - [`CompressionError::RandomSourceMissing`] - no RNG installed
    /// - [`CompressionError::UnsupportedPacket`] - input is not an IP packet
    /// - [`CompressionError::NoProfileEnabled`] - nothing matches the packet
    /// - [`CompressionError::CidSpaceExhausted`] - no CID free or evictable
    /// - [`CompressionError::BufferTooSmall`] - `out` cannot hold the result;
    ///   the context is left untouched
    pub fn compress(&mut self, packet: &[u8], out: &mut [u8]) -> Result<usize, RohcError> {
        if self.rng.is_none() {
            return Err(CompressionError::RandomSourceMissing.into());
        }
        let headers = parse_headers(packet).map_err(CompressionError::UnsupportedPacket)?;

        let profile_idx = self
            .profiles
            .iter()
            .position(|p| p.matches(&headers))
            .ok_or(CompressionError::NoProfileEnabled)?;
        let profile_id = self.profiles[profile_idx].profile_id();
        self.tick = self.tick.wrapping_add(1);
        let tick = self.tick;

        let existing = {
            let handler = &self.profiles[profile_idx];
            self.contexts.iter().find_map(|(cid, ctx)| {
                (ctx.profile_id() == profile_id && handler.context_matches(ctx.as_ref(), &headers))
                    .then_some(*cid)
            })
        };
        let cid = match existing {
            Some(cid) => cid,
            None => {
                let cid = self.allocate_cid(tick)?;
                debug!(%cid, %profile_id, "creating context for new flow");
                let context = self.profiles[profile_idx].create_context(
                    cid,
                    &headers,
                    &self.context_config,
                    self.rng.as_mut().expect("checked above").as_mut(),
                    tick,
                );
                self.contexts.insert(cid, context);
                cid
            }
        };

        let context = self
            .contexts
            .get_mut(&cid)
            .expect("context just looked up or inserted");
        let result = self.profiles[profile_idx].compress(
            context.as_mut(),
            &headers,
            packet,
            self.cid_type,
            &self.crc_calculators,
            out,
        )?;

        let payload = &packet[result.payload_offset..];
        out[result.header_len..result.header_len + payload.len()].copy_from_slice(payload);
        context.touch(tick);

        self.last_packet_info = Some(LastPacketInfo {
            packet_type: result.packet_type,
            extension: result.extension,
            cid,
            profile_id,
            header_len: result.header_len,
            payload_len: payload.len(),
        });
        Ok(result.header_len + payload.len())
    }

    /// Delivers one feedback element received on the reverse channel.
    ///
    /// Feedback whose CRC option fails verification is dropped silently, as
    /// RFC 3095 requires; structural errors are reported.
    ///
    /// # Errors
    /// - [`FeedbackError`] - truncated feedback, bad option lengths, or an
    ///   unknown CID
    pub fn deliver_feedback(&mut self, data: &[u8]) -> Result<(), RohcError> {
        let Some(feedback) = parse_feedback(data, self.cid_type, &self.crc_calculators)? else {
            return Ok(());
        };
        let cid = feedback.cid();
        let context = self
            .contexts
            .get_mut(&cid)
            .ok_or(FeedbackError::UnknownCid(cid))?;
        let profile_id = context.profile_id();
        let handler = self
            .profiles
            .iter()
            .find(|p| p.profile_id() == profile_id)
            .ok_or(CompressionError::Internal {
                reason: "context exists for a profile that is no longer registered",
            })?;
        handler.handle_feedback(context.as_mut(), &feedback);
        Ok(())
    }

    /// Metadata of the most recently compressed packet.
    pub fn last_packet_info(&self) -> Option<&LastPacketInfo> {
        self.last_packet_info.as_ref()
    }

    /// Number of active contexts.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Compression state of a context, if it exists.
    pub fn context_state(&self, cid: ContextId) -> Option<ContextState> {
        self.contexts.get(&cid).map(|ctx| ctx.state())
    }

    /// Profile owning a context, if it exists.
    pub fn context_profile(&self, cid: ContextId) -> Option<RohcProfile> {
        self.contexts.get(&cid).map(|ctx| ctx.profile_id())
    }

    /// Removes one context, e.g. when the caller knows the flow ended.
    pub fn remove_context(&mut self, cid: ContextId) -> bool {
        self.contexts.remove(&cid).is_some()
    }

    /// Smallest free CID, or the least recently used context's CID after
    /// eviction. A context counts as very recent while it was used within
    /// the last full round of table slots; if even the LRU context is that
    /// fresh, every flow is still active and the table is genuinely full.
    fn allocate_cid(&mut self, tick: u64) -> Result<ContextId, CompressionError> {
        for raw in 0..=self.max_cid {
            let cid = ContextId::new(raw);
            if !self.contexts.contains_key(&cid) {
                return Ok(cid);
            }
        }
        let recency_window = self.contexts.len() as u64;
        let lru = self
            .contexts
            .iter()
            .min_by_key(|(cid, ctx)| (ctx.last_used_tick(), **cid))
            .map(|(cid, ctx)| (*cid, ctx.last_used_tick()));
        if let Some((cid, last_used)) = lru {
            if tick.saturating_sub(last_used) > recency_window {
                debug!(%cid, "evicting least recently used context");
                self.contexts.remove(&cid);
                return Ok(cid);
            }
        }
        Err(CompressionError::CidSpaceExhausted {
            max_cid: self.max_cid,
        })
    }
}
