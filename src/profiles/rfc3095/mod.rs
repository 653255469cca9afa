//! The generic RFC 3095 compression engine.
//!
//! Implements the machinery shared by the IP-only and UDP profiles: the
//! IR/FO/SO state machine with its optimistic-approach counters and U-mode
//! periodic refreshes, per-field change detection, packet format and
//! extension selection, and the encoding pipeline for IR, IR-DYN, UO-0,
//! UO-1 and UOR-2 packets. Profile-specific behaviour plugs in through the
//! [`Rfc3095Profile`] trait; all profile state lives in the profile's own
//! context struct which embeds an [`Rfc3095State`].

pub(crate) mod chains;
pub(crate) mod uo;

use rand::RngCore;
use tracing::debug;

use crate::constants::{UO0_SN_BITS, UO1_IP_ID_BITS, UO1_SN_BITS};
use crate::crc::CrcCalculators;
use crate::encodings::{PBehavior, WlsbWindow};
use crate::error::CompressionError;
use crate::feedback::{Feedback, FeedbackAckType};
use crate::headers::{IpHeader, PacketHeaders};
use crate::packet_defs::{CidType, ContextState, RohcMode, RohcPacketType};
use crate::traits::{CompressedPacket, ContextConfig};
use crate::types::{ContextId, SequenceNumber};

pub(crate) use chains::CrcInput;

use uo::UoExtension;

/// Per-IP-header compressor state.
#[derive(Debug, Clone)]
pub(crate) struct IpHeaderState {
    /// The header as last sent.
    pub old: IpHeader,
    /// Established IP-ID randomness (RND flag).
    pub rnd: bool,
    /// Established IP-ID byte order (NBO flag).
    pub nbo: bool,
    /// Repetitions of the current TOS/TC value.
    pub tos_count: u32,
    /// Repetitions of the current TTL/Hop Limit value.
    pub ttl_count: u32,
    /// Repetitions of the current DF flag.
    pub df_count: u32,
    /// Repetitions of the current RND flag.
    pub rnd_count: u32,
    /// Repetitions of the current NBO flag.
    pub nbo_count: u32,
    /// W-LSB window over the IP-ID offset (`id - sn`), sequential IDs only.
    pub id_window: WlsbWindow,
}

impl IpHeaderState {
    fn new(header: &IpHeader, config: &ContextConfig) -> Self {
        Self {
            old: *header,
            rnd: false,
            nbo: true,
            // A fresh context has nothing to repeat: all fields count as
            // established until a change is observed.
            tos_count: config.oa_repetitions,
            ttl_count: config.oa_repetitions,
            df_count: config.oa_repetitions,
            rnd_count: config.oa_repetitions,
            nbo_count: config.oa_repetitions,
            id_window: WlsbWindow::new(config.wlsb_window_width, 16, PBehavior::Constant(0)),
        }
    }
}

/// Generic compressor context state of the RFC 3095 profile family.
#[derive(Debug, Clone)]
pub(crate) struct Rfc3095State {
    pub cid: ContextId,
    pub state: ContextState,
    pub mode: RohcMode,
    /// Current compressor-generated sequence number.
    pub sn: SequenceNumber,
    pub sn_window: WlsbWindow,
    /// Innermost IP header state.
    pub ip: IpHeaderState,
    /// Outer IP header state for IPv4-in-IPv4 tunnels.
    pub outer_ip: Option<IpHeaderState>,
    pub oa_repetitions: u32,
    pub ir_timeout: u32,
    pub fo_timeout: u32,
    /// Packets emitted since the last periodic IR refresh.
    pub packets_since_ir_refresh: u32,
    /// Packets emitted since the last periodic FO refresh.
    pub packets_since_fo_refresh: u32,
    pub num_sent_packets: u32,
    pub num_sent_in_current_state: u32,
}

impl Rfc3095State {
    /// Creates the generic state for a new flow. The initial SN is drawn
    /// from the caller's random source (RFC 3095, Section 5.11.1).
    pub(crate) fn new(
        cid: ContextId,
        headers: &PacketHeaders,
        config: &ContextConfig,
        rng: &mut dyn RngCore,
    ) -> Self {
        let sn = SequenceNumber::new((rng.next_u32() & 0xFFFF) as u16);
        debug!(cid = %cid, sn = %sn, "initializing generic context, SN from random source");
        Self {
            cid,
            state: ContextState::InitializationAndRefresh,
            mode: RohcMode::Unidirectional,
            sn,
            sn_window: WlsbWindow::new(config.wlsb_window_width, 16, PBehavior::SnAligned),
            ip: IpHeaderState::new(&headers.ip, config),
            outer_ip: headers
                .outer_ip
                .as_ref()
                .map(|h| IpHeaderState::new(h, config)),
            oa_repetitions: config.oa_repetitions,
            ir_timeout: config.ir_timeout,
            fo_timeout: config.fo_timeout,
            packets_since_ir_refresh: 0,
            packets_since_fo_refresh: 0,
            num_sent_packets: 0,
            num_sent_in_current_state: 0,
        }
    }

    /// Whether this context's static chain matches the classified headers.
    pub(crate) fn static_chain_matches(&self, headers: &PacketHeaders) -> bool {
        if !self.ip.old.static_chain_matches(&headers.ip) {
            return false;
        }
        match (&self.outer_ip, &headers.outer_ip) {
            (None, None) => true,
            (Some(state), Some(header)) => state.old.static_chain_matches(header),
            _ => false,
        }
    }

    /// Forces the context back into the given state, resetting the
    /// per-state packet counter.
    pub(crate) fn force_state(&mut self, state: ContextState) {
        if self.state != state {
            debug!(cid = %self.cid, from = %self.state, to = %state, "forced state transition");
            self.state = state;
            self.num_sent_in_current_state = 0;
        }
    }
}

/// Changes detected on one IP header for the current packet.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HeaderChanges {
    pub tos_changed: bool,
    pub ttl_changed: bool,
    pub df_changed: bool,
    pub rnd_changed: bool,
    pub nbo_changed: bool,
    /// Per-field "still being communicated" flags: the field changed now or
    /// its repetition count has not reached `oa_repetitions` yet.
    pub tos_pending: bool,
    pub ttl_pending: bool,
    pub df_pending: bool,
    pub rnd_pending: bool,
    pub nbo_pending: bool,
    /// IP-ID behaviour for this packet.
    pub new_rnd: bool,
    pub new_nbo: bool,
    /// Current DF flag value (IPv4 only).
    pub new_df: bool,
    /// Whether the header carries a sequentially increasing IPv4 ID whose
    /// offset from the SN is W-LSB encodable.
    pub has_seq_id: bool,
    /// `id - sn` (byte-swapped first when `new_nbo` is false).
    pub id_offset: u16,
    /// Offset bits the decompressor needs; zero when the offset is already
    /// established or the header has no sequential IP-ID.
    pub k_id: u8,
    /// Any field of this header changed now or is still being repeated.
    pub pending: bool,
}

/// Profile-specific observations for the current packet.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ProfileChanges {
    /// The profile demands an IR packet (e.g. UDP checksum behaviour flip).
    pub force_ir: bool,
    /// The triggering condition was a behaviour flip, resetting the
    /// profile's repetition counter.
    pub flip: bool,
}

/// Everything decided about the current packet before any state mutation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChangeSet {
    pub next_sn: SequenceNumber,
    pub k_sn: u8,
    pub inner: HeaderChanges,
    pub outer: Option<HeaderChanges>,
    pub profile: ProfileChanges,
    pub periodic_ir_due: bool,
    pub periodic_fo_due: bool,
}

impl ChangeSet {
    /// Any per-field dynamic change still being communicated.
    pub(crate) fn fields_pending(&self) -> bool {
        self.inner.pending || self.outer.map_or(false, |o| o.pending)
    }

    /// Offset bits needed for the outer IP-ID, zero without a tunnel.
    pub(crate) fn outer_k_id(&self) -> u8 {
        self.outer.map_or(0, |o| o.k_id)
    }
}

fn detect_header_changes(
    state: &IpHeaderState,
    current: &IpHeader,
    next_sn: SequenceNumber,
    oa: u32,
) -> HeaderChanges {
    use crate::constants::IP_ID_SEQUENTIAL_MAX_DELTA;

    let mut ch = HeaderChanges::default();
    match (&state.old, current) {
        (IpHeader::V4(old), IpHeader::V4(cur)) => {
            ch.tos_changed = old.tos != cur.tos;
            ch.ttl_changed = old.ttl != cur.ttl;
            ch.df_changed = old.dont_fragment != cur.dont_fragment;
            ch.new_df = cur.dont_fragment;

            let delta = cur.identification.value().wrapping_sub(old.identification.value());
            let swapped_delta = cur
                .identification
                .value()
                .swap_bytes()
                .wrapping_sub(old.identification.value().swap_bytes());
            (ch.new_nbo, ch.new_rnd) = if delta == 0 {
                // No evidence either way; keep the established behaviour.
                (state.nbo, state.rnd)
            } else if delta <= IP_ID_SEQUENTIAL_MAX_DELTA {
                (true, false)
            } else if swapped_delta > 0 && swapped_delta <= IP_ID_SEQUENTIAL_MAX_DELTA {
                (false, false)
            } else {
                (state.nbo, true)
            };
            ch.rnd_changed = ch.new_rnd != state.rnd;
            ch.nbo_changed = ch.new_nbo != state.nbo;

            if !ch.new_rnd {
                ch.has_seq_id = true;
                let id = if ch.new_nbo {
                    cur.identification.value()
                } else {
                    cur.identification.value().swap_bytes()
                };
                ch.id_offset = id.wrapping_sub(next_sn.value());
                ch.k_id = state.id_window.min_k(ch.id_offset);
            }
        }
        (IpHeader::V6(old), IpHeader::V6(cur)) => {
            ch.tos_changed = old.traffic_class != cur.traffic_class;
            ch.ttl_changed = old.hop_limit != cur.hop_limit;
            ch.new_nbo = state.nbo;
            ch.new_rnd = state.rnd;
        }
        _ => {
            // Version flip inside a context cannot happen: the static chain
            // match would have failed and a new context been created.
            debug_assert!(false, "IP version changed within a context");
        }
    }

    ch.tos_pending = ch.tos_changed || state.tos_count < oa;
    ch.ttl_pending = ch.ttl_changed || state.ttl_count < oa;
    ch.df_pending = ch.df_changed || state.df_count < oa;
    ch.rnd_pending = ch.rnd_changed || state.rnd_count < oa;
    ch.nbo_pending = ch.nbo_changed || state.nbo_count < oa;
    ch.pending =
        ch.tos_pending || ch.ttl_pending || ch.df_pending || ch.rnd_pending || ch.nbo_pending;
    ch
}

/// Computes the full change set for the current packet. Pure: the context is
/// not modified.
pub(crate) fn detect_changes(
    state: &Rfc3095State,
    headers: &PacketHeaders,
    profile: ProfileChanges,
) -> ChangeSet {
    let next_sn = state.sn + 1;
    let k_sn = state.sn_window.min_k(next_sn.value());
    let inner = detect_header_changes(&state.ip, &headers.ip, next_sn, state.oa_repetitions);
    let outer = match (&state.outer_ip, &headers.outer_ip) {
        (Some(outer_state), Some(outer_header)) => Some(detect_header_changes(
            outer_state,
            outer_header,
            next_sn,
            state.oa_repetitions,
        )),
        _ => None,
    };
    ChangeSet {
        next_sn,
        k_sn,
        inner,
        outer,
        profile,
        periodic_ir_due: state.ir_timeout > 0
            && state.packets_since_ir_refresh + 1 >= state.ir_timeout,
        periodic_fo_due: state.fo_timeout > 0
            && state.packets_since_fo_refresh + 1 >= state.fo_timeout,
    }
}

/// The shared IR/FO/SO transition rules (RFC 3095, Section 4.3.1, U-mode
/// optimistic approach).
pub(crate) fn generic_decide_state(state: &Rfc3095State, changes: &ChangeSet) -> ContextState {
    let oa = state.oa_repetitions;
    match state.state {
        ContextState::InitializationAndRefresh => {
            if state.num_sent_in_current_state >= oa && !changes.fields_pending() {
                ContextState::FirstOrder
            } else {
                ContextState::InitializationAndRefresh
            }
        }
        ContextState::FirstOrder => {
            if changes.fields_pending() {
                ContextState::FirstOrder
            } else if state.num_sent_in_current_state > oa {
                ContextState::SecondOrder
            } else {
                ContextState::FirstOrder
            }
        }
        ContextState::SecondOrder => {
            if changes.fields_pending() {
                ContextState::FirstOrder
            } else {
                ContextState::SecondOrder
            }
        }
    }
}

/// Profile hooks of the generic engine.
///
/// Implemented by each profile's compressor context; the default methods
/// describe a profile with no next header (IP-only). All hooks are pure
/// except [`commit_profile`], which the engine calls exactly once per
/// successfully emitted packet.
pub(crate) trait Rfc3095Profile {
    fn generic(&self) -> &Rfc3095State;
    fn generic_mut(&mut self) -> &mut Rfc3095State;
    fn profile_byte(&self) -> u8;

    /// Profile-specific change observations for this packet.
    fn profile_changes(&self, _headers: &PacketHeaders) -> ProfileChanges {
        ProfileChanges::default()
    }

    /// Lets the profile override the generic state decision.
    fn adjust_state(&self, _changes: &ChangeSet, tentative: ContextState) -> ContextState {
        tentative
    }

    fn static_next_header_len(&self) -> usize {
        0
    }
    fn dynamic_next_header_len(&self) -> usize {
        0
    }
    fn uo_remainder_len(&self, _headers: &PacketHeaders) -> usize {
        0
    }

    /// Emits the next header's static chain part. Returns bytes written.
    fn code_static_next_header(&self, _headers: &PacketHeaders, _out: &mut [u8]) -> usize {
        0
    }
    /// Emits the next header's dynamic chain part. Returns bytes written.
    fn code_dynamic_next_header(&self, _headers: &PacketHeaders, _out: &mut [u8]) -> usize {
        0
    }
    /// Emits the next header's fields in the tail of a UO packet.
    fn code_uo_remainder(&self, _headers: &PacketHeaders, _out: &mut [u8]) -> usize {
        0
    }

    /// Appends the next header's CRC-STATIC fields.
    fn append_crc_static(&self, _headers: &PacketHeaders, _input: &mut CrcInput) {}
    /// Appends the next header's CRC-DYNAMIC fields.
    fn append_crc_dynamic(&self, _headers: &PacketHeaders, _input: &mut CrcInput) {}

    /// Applies profile-specific context updates after a successful emit.
    fn commit_profile(
        &mut self,
        _headers: &PacketHeaders,
        _changes: &ChangeSet,
        _packet_type: RohcPacketType,
    ) {
    }
}

/// Picks the packet format (and extension) for a non-IR target state.
fn decide_uo_packet(
    changes: &ChangeSet,
    target: ContextState,
) -> (RohcPacketType, UoExtension) {
    let inner = &changes.inner;
    let fields_pending = changes.fields_pending();
    let outer_k = changes.outer_k_id();

    if target == ContextState::SecondOrder && !fields_pending {
        if changes.k_sn <= UO0_SN_BITS && inner.k_id == 0 && outer_k == 0 {
            return (RohcPacketType::Uo0, UoExtension::None);
        }
        if inner.has_seq_id
            && changes.k_sn <= UO1_SN_BITS
            && inner.k_id <= UO1_IP_ID_BITS
            && outer_k == 0
        {
            return (RohcPacketType::Uo1, UoExtension::None);
        }
    }

    match uo::decide_extension(changes) {
        Some(extension) => (RohcPacketType::Uor2, extension),
        None => (RohcPacketType::IrDyn, UoExtension::None),
    }
}

fn ir_header_len<P: Rfc3095Profile>(
    ctx: &P,
    headers: &PacketHeaders,
    cid_type: CidType,
    with_static: bool,
) -> usize {
    let generic = ctx.generic();
    let mut len = 1 + super::cid_overhead(cid_type, generic.cid) + 1 /* profile */ + 1 /* CRC-8 */;
    if with_static {
        if let Some(outer) = &headers.outer_ip {
            len += chains::static_part_len(outer);
        }
        len += chains::static_part_len(&headers.ip) + ctx.static_next_header_len();
    }
    if let Some(outer) = &headers.outer_ip {
        len += chains::dynamic_part_len(outer);
    }
    len += chains::dynamic_part_len(&headers.ip) + ctx.dynamic_next_header_len();
    len + 2 // 16-bit SN remainder
}

fn code_ir_packet<P: Rfc3095Profile>(
    ctx: &P,
    headers: &PacketHeaders,
    changes: &ChangeSet,
    cid_type: CidType,
    crc_calculators: &CrcCalculators,
    with_static: bool,
    out: &mut [u8],
) -> usize {
    let generic = ctx.generic();
    let (first_position, mut pos) = super::encode_cid_prefix(cid_type, generic.cid, out);
    out[first_position] = if with_static {
        crate::constants::IR_PACKET_TYPE_WITH_DYN
    } else {
        crate::constants::IR_DYN_PACKET_TYPE
    };
    out[pos] = ctx.profile_byte();
    pos += 1;
    let crc_position = pos;
    out[pos] = 0;
    pos += 1;

    if with_static {
        if let Some(outer) = &headers.outer_ip {
            pos += chains::code_static_ip(outer, &mut out[pos..]);
        }
        pos += chains::code_static_ip(&headers.ip, &mut out[pos..]);
        pos += ctx.code_static_next_header(headers, &mut out[pos..]);
    }

    if let (Some(outer), Some(outer_changes)) = (&headers.outer_ip, &changes.outer) {
        pos += chains::code_dynamic_ip(
            outer,
            outer_changes.new_rnd,
            outer_changes.new_nbo,
            &mut out[pos..],
        );
    }
    pos += chains::code_dynamic_ip(
        &headers.ip,
        changes.inner.new_rnd,
        changes.inner.new_nbo,
        &mut out[pos..],
    );
    pos += ctx.code_dynamic_next_header(headers, &mut out[pos..]);

    out[pos..pos + 2].copy_from_slice(&changes.next_sn.to_be_bytes());
    pos += 2;

    // The 8-bit CRC covers every emitted header byte, Add-CID included,
    // with the CRC octet zeroed (RFC 3095, Section 5.7.7.1).
    out[crc_position] = crc_calculators.crc8(&out[..pos]);
    pos
}

fn build_uo_crc_input<P: Rfc3095Profile>(
    ctx: &P,
    headers: &PacketHeaders,
    changes: &ChangeSet,
) -> CrcInput {
    let mut input = CrcInput::new();
    if let Some(outer) = &headers.outer_ip {
        chains::append_crc_static_ip(outer, &mut input);
    }
    chains::append_crc_static_ip(&headers.ip, &mut input);
    ctx.append_crc_static(headers, &mut input);
    if let Some(outer) = &headers.outer_ip {
        chains::append_crc_dynamic_ip(outer, &mut input);
    }
    chains::append_crc_dynamic_ip(&headers.ip, &mut input);
    ctx.append_crc_dynamic(headers, &mut input);
    input.push_slice(&changes.next_sn.to_be_bytes());
    input
}

fn commit_header_state(
    state: &mut IpHeaderState,
    current: &IpHeader,
    changes: &HeaderChanges,
    sn: SequenceNumber,
    oa: u32,
) {
    fn bump(count: &mut u32, changed: bool, oa: u32) {
        if changed {
            *count = 1;
        } else if *count < oa {
            *count += 1;
        }
    }

    if changes.has_seq_id {
        state.id_window.add(sn, changes.id_offset);
    }
    bump(&mut state.tos_count, changes.tos_changed, oa);
    bump(&mut state.ttl_count, changes.ttl_changed, oa);
    bump(&mut state.df_count, changes.df_changed, oa);
    bump(&mut state.rnd_count, changes.rnd_changed, oa);
    bump(&mut state.nbo_count, changes.nbo_changed, oa);
    state.rnd = changes.new_rnd;
    state.nbo = changes.new_nbo;
    state.old = *current;
}

/// Compresses one packet with the generic engine.
///
/// Serialization happens before any context mutation; a `BufferTooSmall`
/// failure leaves the context byte-identical to its pre-call state.
///
/// # Errors
/// - [`CompressionError::BufferTooSmall`] - `out` cannot hold header plus
///   payload
pub(crate) fn encode<P: Rfc3095Profile>(
    ctx: &mut P,
    headers: &PacketHeaders,
    packet: &[u8],
    cid_type: CidType,
    crc_calculators: &CrcCalculators,
    out: &mut [u8],
) -> Result<CompressedPacket, CompressionError> {
    let profile_changes = ctx.profile_changes(headers);
    let changes = detect_changes(ctx.generic(), headers, profile_changes);

    let tentative = generic_decide_state(ctx.generic(), &changes);
    let tentative = ctx.adjust_state(&changes, tentative);
    let target = if changes.periodic_ir_due {
        ContextState::InitializationAndRefresh
    } else if changes.periodic_fo_due && tentative == ContextState::SecondOrder {
        ContextState::FirstOrder
    } else {
        tentative
    };

    let (packet_type, extension) = match target {
        ContextState::InitializationAndRefresh => (RohcPacketType::Ir, UoExtension::None),
        _ => decide_uo_packet(&changes, target),
    };

    let payload_len = packet.len() - headers.header_len;
    let header_len = match packet_type {
        RohcPacketType::Ir | RohcPacketType::IrDyn => {
            let with_static = packet_type == RohcPacketType::Ir;
            let needed = ir_header_len(ctx, headers, cid_type, with_static);
            ensure_capacity(out, needed + payload_len)?;
            code_ir_packet(
                ctx,
                headers,
                &changes,
                cid_type,
                crc_calculators,
                with_static,
                out,
            )
        }
        _ => {
            let needed = uo::uo_header_len(ctx, headers, &changes, packet_type, &extension, cid_type);
            ensure_capacity(out, needed + payload_len)?;
            let crc_input = build_uo_crc_input(ctx, headers, &changes);
            uo::code_uo_packet(
                ctx,
                headers,
                &changes,
                packet_type,
                &extension,
                cid_type,
                crc_calculators,
                crc_input.bytes(),
                out,
            )
        }
    };

    // Commit: the packet is fully written, the context may now advance.
    let generic = ctx.generic_mut();
    let transitioned = generic.state != target;
    let involuntary = transitioned && (changes.profile.force_ir || changes.fields_pending());
    if transitioned {
        generic.num_sent_in_current_state = 0;
    }
    generic.state = target;
    generic.sn = changes.next_sn;
    generic.sn_window.add(changes.next_sn, changes.next_sn.value());
    if changes.periodic_ir_due || involuntary {
        generic.packets_since_ir_refresh = 0;
        generic.packets_since_fo_refresh = 0;
    } else {
        generic.packets_since_ir_refresh += 1;
        if changes.periodic_fo_due {
            generic.packets_since_fo_refresh = 0;
        } else {
            generic.packets_since_fo_refresh += 1;
        }
    }
    generic.num_sent_packets = generic.num_sent_packets.wrapping_add(1);
    generic.num_sent_in_current_state = generic.num_sent_in_current_state.saturating_add(1);

    let oa = generic.oa_repetitions;
    commit_header_state(&mut generic.ip, &headers.ip, &changes.inner, changes.next_sn, oa);
    if let (Some(outer_state), Some(outer_header), Some(outer_changes)) =
        (generic.outer_ip.as_mut(), headers.outer_ip.as_ref(), changes.outer.as_ref())
    {
        commit_header_state(outer_state, outer_header, outer_changes, changes.next_sn, oa);
    }
    ctx.commit_profile(headers, &changes, packet_type);

    Ok(CompressedPacket {
        header_len,
        payload_offset: headers.header_len,
        packet_type,
        extension: extension.as_type(),
    })
}

fn ensure_capacity(out: &[u8], needed: usize) -> Result<(), CompressionError> {
    if out.len() < needed {
        return Err(CompressionError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }
    Ok(())
}

/// Resolves LSB-coded acknowledged SN against the compressor's current SN.
/// The acknowledged value is assumed to be at or before the current one.
fn resolve_acked_sn(current: SequenceNumber, lsb: u16, k: u8) -> SequenceNumber {
    let mask = (1u32 << k) as u16 - 1;
    let candidate = (current.value() & !mask) | (lsb & mask);
    if candidate > current.value() {
        SequenceNumber::new(candidate.wrapping_sub(mask.wrapping_add(1)))
    } else {
        SequenceNumber::new(candidate)
    }
}

fn purge_windows(state: &mut Rfc3095State, acked: SequenceNumber) {
    state.sn_window.purge_acked(acked);
    state.ip.id_window.purge_acked(acked);
    if let Some(outer) = state.outer_ip.as_mut() {
        outer.id_window.purge_acked(acked);
    }
}

/// Applies one feedback element to the generic state (RFC 3095, Section
/// 5.7.6.2).
pub(crate) fn apply_feedback(state: &mut Rfc3095State, feedback: &Feedback) {
    match feedback {
        Feedback::Ack1 { sn_lsb, .. } => {
            let acked = resolve_acked_sn(state.sn, *sn_lsb as u16, 8);
            purge_windows(state, acked);
        }
        Feedback::Feedback2 { feedback: fb, .. } => {
            if fb.mode_bits != 0 {
                if fb.crc_verified {
                    if let Some(mode) = RohcMode::from_feedback_bits(fb.mode_bits) {
                        if mode != state.mode {
                            debug!(cid = %state.cid, ?mode, "mode change from feedback");
                            state.mode = mode;
                            state.force_state(ContextState::InitializationAndRefresh);
                        }
                    }
                } else {
                    debug!(cid = %state.cid, "mode change requested without CRC; ignored");
                }
            }
            match fb.ack_type {
                FeedbackAckType::Ack => {
                    if fb.sn_valid {
                        let acked = resolve_acked_sn(state.sn, fb.sn, 12);
                        purge_windows(state, acked);
                    }
                }
                FeedbackAckType::Nack => {
                    state.force_state(ContextState::FirstOrder);
                }
                FeedbackAckType::StaticNack => {
                    state.force_state(ContextState::InitializationAndRefresh);
                }
                FeedbackAckType::Reserved => {
                    debug!(cid = %state.cid, "feedback with reserved ack type dropped");
                }
            }
            if fb.rejected {
                debug!(cid = %state.cid, "flow rejected by decompressor; restarting at IR");
                state.force_state(ContextState::InitializationAndRefresh);
            }
        }
    }
}
