//! ROHC UDP/IP profile (0x0002, RFC 3095 Section 5.11).
//!
//! Extends the IP-only behaviour of the generic engine with the UDP next
//! header: source and destination ports join the static chain, the 16-bit
//! checksum joins the dynamic chain, and UO packets carry the checksum in
//! their tail whenever the context's reference checksum is non-zero.
//!
//! The checksum *behaviour* (zero versus non-zero) is a first-class trigger:
//! a flip, or a behaviour not yet repeated `oa_repetitions` times, forces IR
//! so the decompressor always knows whether to expect the checksum field in
//! UO packets.

use std::any::Any;

use rand::RngCore;

use crate::crc::CrcCalculators;
use crate::error::CompressionError;
use crate::feedback::Feedback;
use crate::headers::{PacketHeaders, UdpHeader};
use crate::packet_defs::{CidType, ContextState, RohcMode, RohcPacketType, RohcProfile};
use crate::traits::{
    CompressedPacket, ContextConfig, ProfileHandler, RohcCompressorContext,
};
use crate::types::ContextId;

use super::rfc3095::{self, ChangeSet, CrcInput, ProfileChanges, Rfc3095Profile, Rfc3095State};

/// UDP-specific compressor sub-state.
#[derive(Debug, Clone)]
pub(crate) struct UdpState {
    /// UDP header as last communicated in a dynamic chain.
    pub old_udp: UdpHeader,
    /// Times the checksum field was emitted in a dynamic chain since the
    /// last behaviour change.
    pub checksum_change_count: u32,
}

/// Compressor context of the UDP/IP profile.
#[derive(Debug)]
pub struct UdpContext {
    pub(crate) generic: Rfc3095State,
    pub(crate) udp: UdpState,
    last_used_tick: u64,
}

impl UdpContext {
    fn current_udp<'a>(&self, headers: &'a PacketHeaders) -> &'a UdpHeader {
        headers
            .udp
            .as_ref()
            .expect("UDP profile classified a packet without a UDP header")
    }
}

impl Rfc3095Profile for UdpContext {
    fn generic(&self) -> &Rfc3095State {
        &self.generic
    }

    fn generic_mut(&mut self) -> &mut Rfc3095State {
        &mut self.generic
    }

    fn profile_byte(&self) -> u8 {
        RohcProfile::UdpIp.into()
    }

    fn profile_changes(&self, headers: &PacketHeaders) -> ProfileChanges {
        let udp = self.current_udp(headers);
        let flip = (udp.checksum != 0) != (self.udp.old_udp.checksum != 0);
        ProfileChanges {
            force_ir: flip || self.udp.checksum_change_count < self.generic.oa_repetitions,
            flip,
        }
    }

    fn adjust_state(&self, changes: &ChangeSet, tentative: ContextState) -> ContextState {
        if changes.profile.force_ir {
            ContextState::InitializationAndRefresh
        } else {
            tentative
        }
    }

    fn static_next_header_len(&self) -> usize {
        4
    }

    fn dynamic_next_header_len(&self) -> usize {
        2
    }

    fn uo_remainder_len(&self, _headers: &PacketHeaders) -> usize {
        if self.udp.old_udp.checksum != 0 {
            2
        } else {
            0
        }
    }

    fn code_static_next_header(&self, headers: &PacketHeaders, out: &mut [u8]) -> usize {
        let udp = self.current_udp(headers);
        out[0..2].copy_from_slice(&udp.src_port.to_be_bytes());
        out[2..4].copy_from_slice(&udp.dst_port.to_be_bytes());
        4
    }

    fn code_dynamic_next_header(&self, headers: &PacketHeaders, out: &mut [u8]) -> usize {
        let udp = self.current_udp(headers);
        out[0..2].copy_from_slice(&udp.checksum.to_be_bytes());
        2
    }

    fn code_uo_remainder(&self, headers: &PacketHeaders, out: &mut [u8]) -> usize {
        // Presence is governed by the *reference* checksum: the decompressor
        // only expects the field when its context says so.
        if self.udp.old_udp.checksum != 0 {
            let udp = self.current_udp(headers);
            out[0..2].copy_from_slice(&udp.checksum.to_be_bytes());
            2
        } else {
            0
        }
    }

    fn append_crc_static(&self, headers: &PacketHeaders, input: &mut CrcInput) {
        let udp = self.current_udp(headers);
        input.push_slice(&udp.src_port.to_be_bytes());
        input.push_slice(&udp.dst_port.to_be_bytes());
    }

    fn append_crc_dynamic(&self, headers: &PacketHeaders, input: &mut CrcInput) {
        let udp = self.current_udp(headers);
        input.push_slice(&udp.length.to_be_bytes());
        input.push_slice(&udp.checksum.to_be_bytes());
    }

    fn commit_profile(
        &mut self,
        headers: &PacketHeaders,
        changes: &ChangeSet,
        packet_type: RohcPacketType,
    ) {
        if packet_type.carries_dynamic_chain() {
            self.udp.checksum_change_count = if changes.profile.flip {
                1
            } else {
                self.udp.checksum_change_count.saturating_add(1)
            };
            self.udp.old_udp = *self.current_udp(headers);
        }
    }
}

impl RohcCompressorContext for UdpContext {
    fn profile_id(&self) -> RohcProfile {
        RohcProfile::UdpIp
    }

    fn cid(&self) -> ContextId {
        self.generic.cid
    }

    fn state(&self) -> ContextState {
        self.generic.state
    }

    fn mode(&self) -> RohcMode {
        self.generic.mode
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

/// Handler of the UDP/IP profile.
#[derive(Debug, Default)]
pub struct UdpProfile;

impl UdpProfile {
    pub fn new() -> Self {
        Self
    }
}

impl ProfileHandler for UdpProfile {
    fn profile_id(&self) -> RohcProfile {
        RohcProfile::UdpIp
    }

    fn matches(&self, headers: &PacketHeaders) -> bool {
        headers.udp.is_some() && headers.is_compressible()
    }

    fn context_matches(
        &self,
        context: &dyn RohcCompressorContext,
        headers: &PacketHeaders,
    ) -> bool {
        let Some(udp) = headers.udp.as_ref() else {
            return false;
        };
        context.as_any().downcast_ref::<UdpContext>().is_some_and(|ctx| {
            ctx.generic.static_chain_matches(headers)
                && ctx.udp.old_udp.src_port == udp.src_port
                && ctx.udp.old_udp.dst_port == udp.dst_port
        })
    }

    fn create_context(
        &self,
        cid: ContextId,
        headers: &PacketHeaders,
        config: &ContextConfig,
        rng: &mut dyn RngCore,
        creation_tick: u64,
    ) -> Box<dyn RohcCompressorContext> {
        let udp = headers
            .udp
            .expect("UDP profile selected for a packet without a UDP header");
        Box::new(UdpContext {
            generic: Rfc3095State::new(cid, headers, config, rng),
            udp: UdpState {
                old_udp: udp,
                checksum_change_count: 0,
            },
            last_used_tick: creation_tick,
        })
    }

    fn compress(
        &self,
        context: &mut dyn RohcCompressorContext,
        headers: &PacketHeaders,
        packet: &[u8],
        cid_type: CidType,
        crc_calculators: &CrcCalculators,
        out: &mut [u8],
    ) -> Result<CompressedPacket, CompressionError> {
        let ctx = context
            .as_any_mut()
            .downcast_mut::<UdpContext>()
            .ok_or(CompressionError::Internal {
                reason: "UDP handler received a foreign context",
            })?;
        rfc3095::encode(ctx, headers, packet, cid_type, crc_calculators, out)
    }

    fn handle_feedback(&self, context: &mut dyn RohcCompressorContext, feedback: &Feedback) {
        if let Some(ctx) = context.as_any_mut().downcast_mut::<UdpContext>() {
            rfc3095::apply_feedback(&mut ctx.generic, feedback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::parse_headers;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> ContextConfig {
        ContextConfig {
            oa_repetitions: 3,
            ir_timeout: 1700,
            fo_timeout: 700,
            wlsb_window_width: 4,
        }
    }

    fn udp_packet(ip_id: u16, checksum: u16) -> Vec<u8> {
        let mut packet = vec![
            0x45, 0x00, 0x00, 0x21, 0, 0, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 192, 168, 7, 1,
            192, 168, 7, 2, 0x27, 0x10, 0x4E, 0x20, 0x00, 0x0D, 0, 0, 0x5A,
        ];
        packet[4..6].copy_from_slice(&ip_id.to_be_bytes());
        packet[26..28].copy_from_slice(&checksum.to_be_bytes());
        packet
    }

    struct Flow {
        handler: UdpProfile,
        context: Box<dyn RohcCompressorContext>,
        crc: CrcCalculators,
    }

    impl Flow {
        fn new(first: &[u8]) -> Self {
            let handler = UdpProfile::new();
            let headers = parse_headers(first).unwrap();
            let mut rng = StdRng::seed_from_u64(99);
            let context = handler.create_context(
                ContextId::new(0),
                &headers,
                &config(),
                &mut rng,
                0,
            );
            Self {
                handler,
                context,
                crc: CrcCalculators::new(),
            }
        }

        fn push(&mut self, packet: &[u8]) -> CompressedPacket {
            let headers = parse_headers(packet).unwrap();
            let mut out = [0u8; 256];
            self.handler
                .compress(
                    self.context.as_mut(),
                    &headers,
                    packet,
                    CidType::Small,
                    &self.crc,
                    &mut out,
                )
                .unwrap()
        }
    }

    #[test]
    fn steady_udp_flow_follows_ir_fo_so_ladder() {
        let first = udp_packet(100, 0x1234);
        let mut flow = Flow::new(&first);
        let mut types = Vec::new();
        for i in 0..12u16 {
            types.push(flow.push(&udp_packet(100 + i, 0x1234)).packet_type);
        }
        assert_eq!(
            &types[..3],
            &[RohcPacketType::Ir, RohcPacketType::Ir, RohcPacketType::Ir]
        );
        assert!(types[3..7].iter().all(|t| *t == RohcPacketType::Uor2));
        assert!(types[7..].iter().all(|t| *t == RohcPacketType::Uo0));
    }

    #[test]
    fn uo_packets_carry_checksum_for_nonzero_reference() {
        let first = udp_packet(1, 0xBEEF);
        let mut flow = Flow::new(&first);
        for i in 0..8u16 {
            flow.push(&udp_packet(1 + i, 0xBEEF));
        }
        let result = flow.push(&udp_packet(9, 0xBEEF));
        assert_eq!(result.packet_type, RohcPacketType::Uo0);
        // UO-0 octet plus the two checksum octets in the tail.
        assert_eq!(result.header_len, 3);
    }

    #[test]
    fn zero_checksum_flow_has_bare_uo0() {
        let first = udp_packet(1, 0);
        let mut flow = Flow::new(&first);
        for i in 0..8u16 {
            flow.push(&udp_packet(1 + i, 0));
        }
        let result = flow.push(&udp_packet(9, 0));
        assert_eq!(result.packet_type, RohcPacketType::Uo0);
        assert_eq!(result.header_len, 1);
    }

    #[test]
    fn checksum_behaviour_flip_forces_ir_repetitions() {
        let first = udp_packet(1, 0x1234);
        let mut flow = Flow::new(&first);
        for i in 0..10u16 {
            flow.push(&udp_packet(1 + i, 0x1234));
        }

        let mut types = Vec::new();
        for i in 0..9u16 {
            types.push(flow.push(&udp_packet(11 + i, 0)).packet_type);
        }
        assert_eq!(
            &types[..3],
            &[RohcPacketType::Ir, RohcPacketType::Ir, RohcPacketType::Ir]
        );
        assert!(
            types[7..].iter().all(|t| *t == RohcPacketType::Uo0),
            "UO-0 must resume after the behaviour settles, got {:?}",
            types
        );
    }

    #[test]
    fn context_matches_requires_same_ports() {
        let first = udp_packet(1, 0x1234);
        let flow = Flow::new(&first);
        let headers = parse_headers(&first).unwrap();
        assert!(flow.handler.context_matches(flow.context.as_ref(), &headers));

        let mut other = first.clone();
        other[22..24].copy_from_slice(&9999u16.to_be_bytes());
        let other_headers = parse_headers(&other).unwrap();
        assert!(!flow
            .handler
            .context_matches(flow.context.as_ref(), &other_headers));
    }
}
