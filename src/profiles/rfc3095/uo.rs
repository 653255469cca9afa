//! UO-0, UO-1 and UOR-2 packet serialization with extension selection.
//!
//! Implements the compressed packet formats of RFC 3095, Section 5.7, in
//! their non-RTP variants (Section 5.11.3): the sequence number replaces the
//! timestamp and extension `+T` fields carry IP-ID offset bits. The 3- and
//! 7-bit CRCs cover the uncompressed header (CRC-STATIC then CRC-DYNAMIC
//! fields), never the compressed bytes, so they are computed before the
//! packet is written.

use crate::constants::{
    EXT0_IP_ID_BITS, EXT1_IP_ID_BITS, EXT2_INNER_IP_ID_BITS, EXT2_OUTER_IP_ID_BITS,
    UO0_SN_BITS, UO1_IP_ID_BITS, UO1_SN_BITS, UOR2_DISCRIMINATOR_BITS, UOR2_EXT3_SN_BITS,
    UOR2_EXT_SN_BITS, UO1_DISCRIMINATOR_BITS,
};
use crate::crc::CrcCalculators;
use crate::encodings::encode_lsb;
use crate::headers::{IpHeader, PacketHeaders};
use crate::packet_defs::{CidType, ExtensionType, RohcPacketType};

use super::{ChangeSet, HeaderChanges, Rfc3095Profile};

/// Flags and trailing fields one IP header contributes to EXT-3.
///
/// `tos`/`ttl` mark trailing field presence; `df`/`nbo`/`rnd` carry the flag
/// values themselves; `send_id` requests the verbatim 16-bit IP-ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ext3IpFlags {
    pub tos: bool,
    pub ttl: bool,
    pub df: bool,
    pub nbo: bool,
    pub rnd: bool,
    pub send_id: bool,
}

impl Ext3IpFlags {
    fn from_changes(ch: &HeaderChanges, send_id: bool) -> Option<Self> {
        let needed =
            ch.tos_pending || ch.ttl_pending || ch.df_pending || ch.nbo_pending || ch.rnd_pending;
        (needed || send_id).then_some(Self {
            tos: ch.tos_pending,
            ttl: ch.ttl_pending,
            df: ch.new_df,
            nbo: ch.new_nbo,
            rnd: ch.new_rnd,
            send_id,
        })
    }

    fn trailing_len(&self) -> usize {
        usize::from(self.tos) + usize::from(self.ttl) + if self.send_id { 2 } else { 0 }
    }
}

/// Field selection for one EXT-3 emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ext3Plan {
    /// 8 additional SN bits present.
    pub s: bool,
    /// Verbatim 16-bit inner IP-ID present (the I flag of the type octet).
    pub send_inner_id: bool,
    /// Inner IP header flags octet (the `ip` flag).
    pub inner: Option<Ext3IpFlags>,
    /// Outer IP header flags octet (the `ip2` flag of the inner octet).
    pub outer: Option<Ext3IpFlags>,
}

impl Ext3Plan {
    pub(crate) fn from_changes(changes: &ChangeSet) -> Self {
        let s = changes.k_sn > UO1_SN_BITS;
        let inner_ch = &changes.inner;
        let send_inner_id = inner_ch.has_seq_id && inner_ch.k_id > 0;

        let outer = changes.outer.as_ref().and_then(|o| {
            let send_id = o.has_seq_id && o.k_id > 0;
            Ext3IpFlags::from_changes(o, send_id)
        });
        // The outer flags octet is reachable only through the ip2 bit of the
        // inner octet, so the inner octet is forced when the outer exists.
        let inner = if outer.is_some() {
            Some(Ext3IpFlags::from_changes(inner_ch, false).unwrap_or(Ext3IpFlags {
                tos: false,
                ttl: false,
                df: inner_ch.new_df,
                nbo: inner_ch.new_nbo,
                rnd: inner_ch.new_rnd,
                send_id: false,
            }))
        } else {
            Ext3IpFlags::from_changes(inner_ch, false)
        };

        Self {
            s,
            send_inner_id,
            inner,
            outer,
        }
    }

    fn wire_len(&self) -> usize {
        1 + usize::from(self.inner.is_some())
            + usize::from(self.outer.is_some())
            + usize::from(self.s)
            + self.inner.map_or(0, |f| {
                usize::from(f.tos) + usize::from(f.ttl)
            })
            + if self.send_inner_id { 2 } else { 0 }
            + self.outer.map_or(0, |f| f.trailing_len())
    }
}

/// Extension choice for one UOR-2 packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UoExtension {
    /// No extension (X bit clear).
    None,
    Ext0,
    Ext1,
    Ext2,
    Ext3(Ext3Plan),
}

impl UoExtension {
    /// The public classification of this extension.
    pub(crate) fn as_type(&self) -> Option<ExtensionType> {
        match self {
            UoExtension::None => None,
            UoExtension::Ext0 => Some(ExtensionType::Ext0),
            UoExtension::Ext1 => Some(ExtensionType::Ext1),
            UoExtension::Ext2 => Some(ExtensionType::Ext2),
            UoExtension::Ext3(_) => Some(ExtensionType::Ext3),
        }
    }

    /// Bytes this extension occupies on the wire.
    pub(crate) fn wire_len(&self) -> usize {
        match self {
            UoExtension::None => 0,
            UoExtension::Ext0 => 1,
            UoExtension::Ext1 => 2,
            UoExtension::Ext2 => 3,
            UoExtension::Ext3(plan) => plan.wire_len(),
        }
    }

    /// Total SN bits a UOR-2 with this extension conveys.
    fn sn_bits(&self) -> u8 {
        match self {
            UoExtension::None => UO1_SN_BITS,
            UoExtension::Ext0 | UoExtension::Ext1 | UoExtension::Ext2 => UOR2_EXT_SN_BITS,
            UoExtension::Ext3(plan) => {
                if plan.s {
                    UOR2_EXT3_SN_BITS
                } else {
                    UO1_SN_BITS
                }
            }
        }
    }
}

/// Picks the lowest-numbered extension able to carry the change set
/// (RFC 3095, Section 5.7.5 selection rule). `None` means not even EXT-3
/// can express it and the caller must escalate to IR-DYN.
pub(crate) fn decide_extension(changes: &ChangeSet) -> Option<UoExtension> {
    let inner_k = changes.inner.k_id;
    let outer_k = changes.outer_k_id();
    let k_sn = changes.k_sn;

    if changes.fields_pending() {
        return (k_sn <= UOR2_EXT3_SN_BITS)
            .then(|| UoExtension::Ext3(Ext3Plan::from_changes(changes)));
    }
    if k_sn <= UO1_SN_BITS && inner_k == 0 && outer_k == 0 {
        return Some(UoExtension::None);
    }
    if k_sn <= UOR2_EXT_SN_BITS && outer_k == 0 {
        if inner_k <= EXT0_IP_ID_BITS {
            return Some(UoExtension::Ext0);
        }
        if inner_k <= EXT1_IP_ID_BITS {
            return Some(UoExtension::Ext1);
        }
    }
    if k_sn <= UOR2_EXT_SN_BITS
        && inner_k <= EXT2_INNER_IP_ID_BITS
        && outer_k <= EXT2_OUTER_IP_ID_BITS
        && changes.outer.is_some()
    {
        return Some(UoExtension::Ext2);
    }
    (k_sn <= UOR2_EXT3_SN_BITS).then(|| UoExtension::Ext3(Ext3Plan::from_changes(changes)))
}

fn tail_len<P: Rfc3095Profile>(
    ctx: &P,
    headers: &PacketHeaders,
    changes: &ChangeSet,
) -> usize {
    let mut len = 0;
    if changes.inner.new_rnd && matches!(headers.ip, IpHeader::V4(_)) {
        len += 2;
    }
    if let (Some(outer_changes), Some(IpHeader::V4(_))) = (&changes.outer, &headers.outer_ip) {
        if outer_changes.new_rnd {
            len += 2;
        }
    }
    len + ctx.uo_remainder_len(headers)
}

/// Exact compressed header size of the chosen UO packet.
pub(crate) fn uo_header_len<P: Rfc3095Profile>(
    ctx: &P,
    headers: &PacketHeaders,
    changes: &ChangeSet,
    packet_type: RohcPacketType,
    extension: &UoExtension,
    cid_type: CidType,
) -> usize {
    let overhead = crate::profiles::cid_overhead(cid_type, ctx.generic().cid);
    let tail = tail_len(ctx, headers, changes);
    match packet_type {
        RohcPacketType::Uo0 => 1 + overhead + tail,
        RohcPacketType::Uo1 => 2 + overhead + tail,
        RohcPacketType::Uor2 => 2 + overhead + extension.wire_len() + tail,
        _ => unreachable!("uo_header_len called for {packet_type}"),
    }
}

fn code_extension(
    extension: &UoExtension,
    changes: &ChangeSet,
    headers: &PacketHeaders,
    sn_enc: u16,
    out: &mut [u8],
) -> usize {
    let inner_offset = changes.inner.id_offset;
    let sn3 = (sn_enc & 0x07) as u8;
    match extension {
        UoExtension::None => 0,
        UoExtension::Ext0 => {
            out[0] = (sn3 << 3) | (encode_lsb(inner_offset, EXT0_IP_ID_BITS) as u8);
            1
        }
        UoExtension::Ext1 => {
            let id11 = encode_lsb(inner_offset, EXT1_IP_ID_BITS);
            out[0] = 0x40 | (sn3 << 3) | ((id11 >> 8) as u8 & 0x07);
            out[1] = id11 as u8;
            2
        }
        UoExtension::Ext2 => {
            let outer11 = encode_lsb(
                changes.outer.map_or(0, |o| o.id_offset),
                EXT2_OUTER_IP_ID_BITS,
            );
            out[0] = 0x80 | (sn3 << 3) | ((outer11 >> 8) as u8 & 0x07);
            out[1] = outer11 as u8;
            out[2] = encode_lsb(inner_offset, EXT2_INNER_IP_ID_BITS) as u8;
            3
        }
        UoExtension::Ext3(plan) => code_ext3(plan, headers, sn_enc, out),
    }
}

fn code_ext3(plan: &Ext3Plan, headers: &PacketHeaders, sn_enc: u16, out: &mut [u8]) -> usize {
    let mut pos = 0;
    out[pos] = 0xC0
        | (u8::from(plan.s) << 5)
        | (u8::from(plan.send_inner_id) << 2)
        | (u8::from(plan.inner.is_some()) << 1);
    pos += 1;

    if let Some(flags) = &plan.inner {
        out[pos] = ip_flags_octet(flags, plan.outer.is_some());
        pos += 1;
    }
    if let Some(flags) = &plan.outer {
        out[pos] = ip_flags_octet(flags, flags.send_id);
        pos += 1;
    }
    if plan.s {
        out[pos] = sn_enc as u8;
        pos += 1;
    }
    if let Some(flags) = &plan.inner {
        pos += code_ext3_ip_fields(flags, &headers.ip, plan.send_inner_id, &mut out[pos..]);
    } else if plan.send_inner_id {
        pos += code_ip_id_verbatim(&headers.ip, &mut out[pos..]);
    }
    if let (Some(flags), Some(outer_header)) = (&plan.outer, &headers.outer_ip) {
        pos += code_ext3_ip_fields(flags, outer_header, flags.send_id, &mut out[pos..]);
    }
    pos
}

/// Inner/outer IP header flags octet of EXT-3. The last bit chains to the
/// outer octet (inner position) or requests the outer IP-ID (outer position).
fn ip_flags_octet(flags: &Ext3IpFlags, last_bit: bool) -> u8 {
    (u8::from(flags.tos) << 7)
        | (u8::from(flags.ttl) << 6)
        | (u8::from(flags.df) << 5)
        | (u8::from(flags.nbo) << 2)
        | (u8::from(flags.rnd) << 1)
        | u8::from(last_bit)
}

fn code_ext3_ip_fields(
    flags: &Ext3IpFlags,
    header: &IpHeader,
    send_id: bool,
    out: &mut [u8],
) -> usize {
    let mut pos = 0;
    if flags.tos {
        out[pos] = match header {
            IpHeader::V4(h) => h.tos,
            IpHeader::V6(h) => h.traffic_class,
        };
        pos += 1;
    }
    if flags.ttl {
        out[pos] = match header {
            IpHeader::V4(h) => h.ttl,
            IpHeader::V6(h) => h.hop_limit,
        };
        pos += 1;
    }
    if send_id {
        pos += code_ip_id_verbatim(header, &mut out[pos..]);
    }
    pos
}

fn code_ip_id_verbatim(header: &IpHeader, out: &mut [u8]) -> usize {
    match header {
        IpHeader::V4(h) => {
            out[..2].copy_from_slice(&h.identification.to_be_bytes());
            2
        }
        IpHeader::V6(_) => 0,
    }
}

/// Serializes one UO packet. Capacity has been verified by the caller;
/// `crc_input` is the uncompressed-header byte string the 3/7-bit CRC
/// covers.
#[allow(clippy::too_many_arguments)]
pub(crate) fn code_uo_packet<P: Rfc3095Profile>(
    ctx: &P,
    headers: &PacketHeaders,
    changes: &ChangeSet,
    packet_type: RohcPacketType,
    extension: &UoExtension,
    cid_type: CidType,
    crc_calculators: &CrcCalculators,
    crc_input: &[u8],
    out: &mut [u8],
) -> usize {
    let generic = ctx.generic();
    let (first_position, mut pos) = crate::profiles::encode_cid_prefix(cid_type, generic.cid, out);
    let sn = changes.next_sn.value();

    match packet_type {
        RohcPacketType::Uo0 => {
            let crc3 = crc_calculators.crc3(crc_input);
            let sn_lsb = encode_lsb(sn, UO0_SN_BITS) as u8;
            out[first_position] = (sn_lsb << 3) | crc3;
        }
        RohcPacketType::Uo1 => {
            let crc3 = crc_calculators.crc3(crc_input);
            let id_lsb = encode_lsb(changes.inner.id_offset, UO1_IP_ID_BITS) as u8;
            out[first_position] = UO1_DISCRIMINATOR_BITS | id_lsb;
            out[pos] = ((encode_lsb(sn, UO1_SN_BITS) as u8) << 3) | crc3;
            pos += 1;
        }
        RohcPacketType::Uor2 => {
            let crc7 = crc_calculators.crc7(crc_input);
            let sn_enc = encode_lsb(sn, extension.sn_bits());
            let base_bits = match extension {
                UoExtension::None => sn_enc as u8,
                UoExtension::Ext0 | UoExtension::Ext1 | UoExtension::Ext2 => {
                    (sn_enc >> 3) as u8 & 0x1F
                }
                UoExtension::Ext3(plan) => {
                    if plan.s {
                        (sn_enc >> 8) as u8 & 0x1F
                    } else {
                        sn_enc as u8
                    }
                }
            };
            out[first_position] = UOR2_DISCRIMINATOR_BITS | base_bits;
            let x = !matches!(extension, UoExtension::None);
            out[pos] = (u8::from(x) << 7) | crc7;
            pos += 1;
            pos += code_extension(extension, changes, headers, sn_enc, &mut out[pos..]);
        }
        _ => unreachable!("code_uo_packet called for {packet_type}"),
    }

    // Tail: verbatim random IP-IDs, then the profile remainder.
    if changes.inner.new_rnd {
        pos += code_ip_id_verbatim(&headers.ip, &mut out[pos..]);
    }
    if let (Some(outer_changes), Some(outer_header)) = (&changes.outer, &headers.outer_ip) {
        if outer_changes.new_rnd {
            pos += code_ip_id_verbatim(outer_header, &mut out[pos..]);
        }
    }
    pos += ctx.code_uo_remainder(headers, &mut out[pos..]);
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::rfc3095::ProfileChanges;
    use crate::types::SequenceNumber;

    fn changes_with(k_sn: u8, inner_k: u8) -> ChangeSet {
        ChangeSet {
            next_sn: SequenceNumber::new(100),
            k_sn,
            inner: HeaderChanges {
                has_seq_id: true,
                new_nbo: true,
                k_id: inner_k,
                ..Default::default()
            },
            outer: None,
            profile: ProfileChanges::default(),
            periodic_ir_due: false,
            periodic_fo_due: false,
        }
    }

    #[test]
    fn extension_selection_prefers_lowest() {
        assert_eq!(decide_extension(&changes_with(4, 0)), Some(UoExtension::None));
        assert_eq!(decide_extension(&changes_with(8, 2)), Some(UoExtension::Ext0));
        assert_eq!(decide_extension(&changes_with(8, 10)), Some(UoExtension::Ext1));
        // Inner IP-ID beyond EXT-1 falls through to EXT-3 without a tunnel.
        assert!(matches!(
            decide_extension(&changes_with(8, 14)),
            Some(UoExtension::Ext3(_))
        ));
    }

    #[test]
    fn extension_selection_uses_ext2_for_tunnels() {
        let mut changes = changes_with(8, 4);
        changes.outer = Some(HeaderChanges {
            has_seq_id: true,
            new_nbo: true,
            k_id: 9,
            ..Default::default()
        });
        assert_eq!(decide_extension(&changes), Some(UoExtension::Ext2));
    }

    #[test]
    fn pending_fields_force_ext3() {
        let mut changes = changes_with(2, 0);
        changes.inner.ttl_changed = true;
        changes.inner.ttl_pending = true;
        changes.inner.pending = true;
        let Some(UoExtension::Ext3(plan)) = decide_extension(&changes) else {
            panic!("expected EXT-3");
        };
        assert!(plan.inner.is_some());
        assert!(plan.inner.unwrap().ttl);
        assert!(!plan.s);
    }

    #[test]
    fn huge_sn_jump_cannot_be_extended() {
        assert_eq!(decide_extension(&changes_with(14, 0)), None);
    }

    #[test]
    fn ext3_plan_sizes() {
        let mut changes = changes_with(7, 0);
        changes.inner.tos_changed = true;
        changes.inner.tos_pending = true;
        changes.inner.pending = true;
        let Some(UoExtension::Ext3(plan)) = decide_extension(&changes) else {
            panic!("expected EXT-3");
        };
        assert!(plan.s);
        // Type octet + inner flags octet + SN octet + TOS value.
        assert_eq!(plan.wire_len(), 4);
    }

    #[test]
    fn ext0_layout() {
        let changes = changes_with(8, 2);
        let headers = dummy_headers();
        let mut buf = [0u8; 8];
        // sn_enc = 8 LSBs of 100 = 0x64; low three bits 0b100.
        let len = code_extension(&UoExtension::Ext0, &changes, &headers, 0x64, &mut buf);
        assert_eq!(len, 1);
        assert_eq!(buf[0] >> 6, 0b00);
        assert_eq!((buf[0] >> 3) & 0x07, 0x64 & 0x07);
    }

    fn dummy_headers() -> PacketHeaders {
        crate::headers::parse_headers(&[
            0x45, 0x00, 0x00, 0x1C, 0x00, 0x64, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 10, 0, 0, 1,
            10, 0, 0, 2, 0x00, 0x07, 0x00, 0x07, 0x00, 0x08, 0x00, 0x00,
        ])
        .unwrap()
    }
}
