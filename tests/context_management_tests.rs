//! Context table behaviour: periodic refreshes, multi-flow CID handling and
//! buffer boundary conditions.

mod common;

use common::{ready_compressor, UdpFlow};
use rohcpress::{
    CidType, CompressionError, Compressor, ContextId, RohcError, RohcPacketType, RohcProfile,
};

use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn periodic_ir_refresh_fires_on_schedule() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.activate_profile(RohcProfile::UdpIp).unwrap();
    comp.set_random_source(Box::new(StdRng::seed_from_u64(10)));
    comp.set_periodic_refreshes(100, 700);

    let flow = UdpFlow::default();
    let mut out = [0u8; 256];
    let mut types = Vec::new();
    for i in 0..100u16 {
        comp.compress(&flow.packet(1 + i), &mut out).unwrap();
        types.push(comp.last_packet_info().unwrap().packet_type);
    }

    assert_eq!(
        types[99],
        RohcPacketType::Ir,
        "packet 100 must be a periodic IR refresh"
    );
    // No other IR beyond the initial establishment and the refresh.
    assert!(types[3..99].iter().all(|t| *t != RohcPacketType::Ir));
}

#[test]
fn periodic_fo_refresh_reopens_first_order() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.activate_profile(RohcProfile::UdpIp).unwrap();
    comp.set_random_source(Box::new(StdRng::seed_from_u64(11)));
    comp.set_periodic_refreshes(1000, 20);

    let flow = UdpFlow::default();
    let mut out = [0u8; 256];
    let mut types = Vec::new();
    for i in 0..40u16 {
        comp.compress(&flow.packet(1 + i), &mut out).unwrap();
        types.push(comp.last_packet_info().unwrap().packet_type);
    }
    assert_eq!(
        types[19],
        RohcPacketType::Uor2,
        "packet 20 must be the periodic FO refresh, got {:?}",
        &types[15..25]
    );
}

#[test]
fn two_interleaved_flows_use_distinct_cids_and_add_cid_octets() {
    let mut comp = ready_compressor(12);
    let flow_a = UdpFlow::with_ports(10000, 20000);
    let flow_b = UdpFlow::with_ports(30000, 40000);
    let mut out = [0u8; 256];

    for i in 0..8u16 {
        comp.compress(&flow_a.packet(100 + i), &mut out).unwrap();
        assert_eq!(comp.last_packet_info().unwrap().cid, ContextId::new(0));

        comp.compress(&flow_b.packet(900 + i), &mut out).unwrap();
        let info = *comp.last_packet_info().unwrap();
        assert_eq!(info.cid, ContextId::new(1));
        // CID 1 always needs an Add-CID octet in small CID mode.
        assert_eq!(out[0], 0xE1);
    }
    assert_eq!(comp.context_count(), 2);

    // Both flows progressed to second order independently.
    comp.compress(&flow_a.packet(108), &mut out).unwrap();
    assert_eq!(
        comp.last_packet_info().unwrap().packet_type,
        RohcPacketType::Uo0
    );
    comp.compress(&flow_b.packet(908), &mut out).unwrap();
    let info = *comp.last_packet_info().unwrap();
    assert_eq!(info.packet_type, RohcPacketType::Uo0);
    // Add-CID octet + UO-0 octet + checksum tail.
    assert_eq!(info.header_len, 4);
}

#[test]
fn exact_buffer_succeeds_one_short_fails() {
    let mut comp = ready_compressor(13);
    let flow = UdpFlow::default();
    let mut big = [0u8; 256];

    for i in 0..10u16 {
        comp.compress(&flow.packet(100 + i), &mut big).unwrap();
    }
    // Steady state: UO-0 octet + checksum + 4 payload bytes = 7.
    let needed = comp.compress(&flow.packet(110), &mut big).unwrap();
    assert_eq!(needed, 7);

    let mut exact = vec![0u8; needed];
    let written = comp.compress(&flow.packet(111), &mut exact).unwrap();
    assert_eq!(written, needed);

    let mut short = vec![0u8; needed - 1];
    let err = comp.compress(&flow.packet(112), &mut short).unwrap_err();
    assert_eq!(
        err,
        RohcError::Compression(CompressionError::BufferTooSmall {
            needed: 7,
            available: 6
        })
    );

    // The failed call must not have advanced the context: the retry's SN is
    // exactly one past the last successful packet's.
    let mut retry = [0u8; 64];
    comp.compress(&flow.packet(112), &mut retry).unwrap();
    let sn_of = |octet: u8| (octet >> 3) & 0x0F;
    assert_eq!(sn_of(retry[0]), (sn_of(exact[0]) + 1) & 0x0F);
}

#[test]
fn failed_compress_leaves_context_state_intact() {
    let mut comp = ready_compressor(14);
    let flow = UdpFlow::default();
    let mut out = [0u8; 256];

    comp.compress(&flow.packet(1), &mut out).unwrap();
    let cid = comp.last_packet_info().unwrap().cid;
    let state_before = comp.context_state(cid).unwrap();

    let mut tiny = [0u8; 2];
    let err = comp.compress(&flow.packet(2), &mut tiny).unwrap_err();
    assert!(matches!(
        err,
        RohcError::Compression(CompressionError::BufferTooSmall { .. })
    ));
    assert_eq!(comp.context_state(cid).unwrap(), state_before);
}

#[test]
fn large_cid_mode_emits_sdvl_cid_bytes() {
    let mut comp = Compressor::new(CidType::Large, 300).unwrap();
    comp.activate_profile(RohcProfile::UdpIp).unwrap();
    comp.set_random_source(Box::new(StdRng::seed_from_u64(15)));

    let flow = UdpFlow::default();
    let mut out = [0u8; 256];
    comp.compress(&flow.packet(1), &mut out).unwrap();
    let info = comp.last_packet_info().unwrap();
    assert_eq!(info.cid, ContextId::new(0));
    // Type octet first, then the one-octet SDVL CID.
    assert_eq!(out[0], 0xFD);
    assert_eq!(out[1], 0x00);
}

#[test]
fn uncompressed_normal_packet_round_trips_bytes() {
    let mut comp = Compressor::new(CidType::Small, 15).unwrap();
    comp.activate_profile(RohcProfile::Uncompressed).unwrap();
    comp.set_random_source(Box::new(StdRng::seed_from_u64(16)));

    let flow = UdpFlow::default();
    let packet = flow.packet(77);
    let mut out = [0u8; 256];
    // Three IRs establish the context, then Normal packets flow.
    for _ in 0..3 {
        comp.compress(&packet, &mut out).unwrap();
        assert_eq!(
            comp.last_packet_info().unwrap().packet_type,
            RohcPacketType::Ir
        );
    }
    let written = comp.compress(&packet, &mut out).unwrap();
    assert_eq!(
        comp.last_packet_info().unwrap().packet_type,
        RohcPacketType::Normal
    );
    // CID 0: the emitted packet is byte-identical to the input.
    assert_eq!(written, packet.len());
    assert_eq!(&out[..written], &packet[..]);
}
