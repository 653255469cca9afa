//! ROHC IP-only profile (0x0004, RFC 3843 applied to the RFC 3095 engine).
//!
//! Compresses bare IP header chains with the generic engine: the SN is
//! generated by the compressor and incremented by one per packet, and there
//! is no next header, so every hook keeps its default behaviour.

use std::any::Any;

use rand::RngCore;

use crate::crc::CrcCalculators;
use crate::error::CompressionError;
use crate::feedback::Feedback;
use crate::headers::PacketHeaders;
use crate::packet_defs::{CidType, ContextState, RohcMode, RohcProfile};
use crate::traits::{
    CompressedPacket, ContextConfig, ProfileHandler, RohcCompressorContext,
};
use crate::types::ContextId;

use super::rfc3095::{self, Rfc3095Profile, Rfc3095State};

/// Compressor context of the IP-only profile.
#[derive(Debug)]
pub struct IpOnlyContext {
    pub(crate) generic: Rfc3095State,
    last_used_tick: u64,
}

impl Rfc3095Profile for IpOnlyContext {
    fn generic(&self) -> &Rfc3095State {
        &self.generic
    }

    fn generic_mut(&mut self) -> &mut Rfc3095State {
        &mut self.generic
    }

    fn profile_byte(&self) -> u8 {
        RohcProfile::IpOnly.into()
    }
}

impl RohcCompressorContext for IpOnlyContext {
    fn profile_id(&self) -> RohcProfile {
        RohcProfile::IpOnly
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

/// Handler of the IP-only profile.
#[derive(Debug, Default)]
pub struct IpOnlyProfile;

impl IpOnlyProfile {
    pub fn new() -> Self {
        Self
    }
}

impl ProfileHandler for IpOnlyProfile {
    fn profile_id(&self) -> RohcProfile {
        RohcProfile::IpOnly
    }

    fn matches(&self, headers: &PacketHeaders) -> bool {
        headers.is_compressible()
    }

    fn context_matches(
        &self,
        context: &dyn RohcCompressorContext,
        headers: &PacketHeaders,
    ) -> bool {
        context
            .as_any()
            .downcast_ref::<IpOnlyContext>()
            .is_some_and(|ctx| ctx.generic.static_chain_matches(headers))
    }

    fn create_context(
        &self,
        cid: ContextId,
        headers: &PacketHeaders,
        config: &ContextConfig,
        rng: &mut dyn RngCore,
        creation_tick: u64,
    ) -> Box<dyn RohcCompressorContext> {
        Box::new(IpOnlyContext {
            generic: Rfc3095State::new(cid, headers, config, rng),
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
            .downcast_mut::<IpOnlyContext>()
            .ok_or(CompressionError::Internal {
                reason: "IP-only handler received a foreign context",
            })?;
        rfc3095::encode(ctx, headers, packet, cid_type, crc_calculators, out)
    }

    fn handle_feedback(&self, context: &mut dyn RohcCompressorContext, feedback: &Feedback) {
        if let Some(ctx) = context.as_any_mut().downcast_mut::<IpOnlyContext>() {
            rfc3095::apply_feedback(&mut ctx.generic, feedback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::parse_headers;
    use crate::packet_defs::RohcPacketType;
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

    fn tcp_packet(ip_id: u16, payload: &[u8]) -> Vec<u8> {
        let total_len = 20 + payload.len() as u16;
        let mut packet = vec![
            0x45, 0x00, 0, 0, 0, 0, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 10, 1, 1, 1, 10, 1, 1, 2,
        ];
        packet[2..4].copy_from_slice(&total_len.to_be_bytes());
        packet[4..6].copy_from_slice(&ip_id.to_be_bytes());
        packet.extend_from_slice(payload);
        packet
    }

    #[test]
    fn first_packet_is_ir_with_static_chain() {
        let handler = IpOnlyProfile::new();
        let packet = tcp_packet(0x0100, b"hello");
        let headers = parse_headers(&packet).unwrap();
        assert!(handler.matches(&headers));

        let mut rng = StdRng::seed_from_u64(1);
        let mut context = handler.create_context(
            ContextId::new(0),
            &headers,
            &config(),
            &mut rng,
            0,
        );
        let crc = CrcCalculators::new();
        let mut out = [0u8; 256];
        let result = handler
            .compress(
                context.as_mut(),
                &headers,
                &packet,
                CidType::Small,
                &crc,
                &mut out,
            )
            .unwrap();
        assert_eq!(result.packet_type, RohcPacketType::Ir);
        assert_eq!(result.payload_offset, 20);
        assert_eq!(out[0], 0xFD);
        assert_eq!(out[1], 0x04);
        // 3 header octets + IPv4 static part + IPv4 dynamic part + SN.
        assert_eq!(result.header_len, 3 + 10 + 6 + 2);
    }

    #[test]
    fn steady_flow_reaches_uo0() {
        let handler = IpOnlyProfile::new();
        let first = tcp_packet(0x0100, b"x");
        let headers = parse_headers(&first).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut context = handler.create_context(
            ContextId::new(0),
            &headers,
            &config(),
            &mut rng,
            0,
        );
        let crc = CrcCalculators::new();
        let mut out = [0u8; 256];

        let mut types = Vec::new();
        for i in 0..10u16 {
            let packet = tcp_packet(0x0100 + i, b"x");
            let headers = parse_headers(&packet).unwrap();
            let result = handler
                .compress(
                    context.as_mut(),
                    &headers,
                    &packet,
                    CidType::Small,
                    &crc,
                    &mut out,
                )
                .unwrap();
            types.push(result.packet_type);
        }
        assert_eq!(
            &types[..3],
            &[RohcPacketType::Ir, RohcPacketType::Ir, RohcPacketType::Ir]
        );
        assert!(types[3..7].iter().all(|t| *t == RohcPacketType::Uor2));
        assert!(types[7..].iter().all(|t| *t == RohcPacketType::Uo0));
    }

    #[test]
    fn buffer_too_small_leaves_context_unchanged() {
        let handler = IpOnlyProfile::new();
        let packet = tcp_packet(0x0100, b"payload");
        let headers = parse_headers(&packet).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut context = handler.create_context(
            ContextId::new(0),
            &headers,
            &config(),
            &mut rng,
            0,
        );
        let crc = CrcCalculators::new();

        let sn_before = {
            let ctx = context.as_any().downcast_ref::<IpOnlyContext>().unwrap();
            ctx.generic.sn
        };
        let mut small = [0u8; 4];
        let err = handler
            .compress(
                context.as_mut(),
                &headers,
                &packet,
                CidType::Small,
                &crc,
                &mut small,
            )
            .unwrap_err();
        assert!(matches!(err, CompressionError::BufferTooSmall { .. }));

        let ctx = context.as_any().downcast_ref::<IpOnlyContext>().unwrap();
        assert_eq!(ctx.generic.sn, sn_before);
        assert_eq!(ctx.generic.num_sent_packets, 0);
        assert!(ctx.generic.sn_window.is_empty());
    }
}
