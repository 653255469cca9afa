//! Static and dynamic chain coding for IP headers.
//!
//! Emits the per-header parts of IR and IR-DYN packets (RFC 3095, Sections
//! 5.7.7.3 through 5.7.7.5) and assembles the CRC-STATIC / CRC-DYNAMIC
//! input the 3- and 7-bit header CRCs are computed over (Section 5.9.2).
//! The CRC field partition follows the chain coders exactly: a field is
//! CRC-STATIC here if and only if the static chain carries it.

use crate::headers::{IpHeader, Ipv4Header, Ipv6Header};

/// Static chain bytes contributed by one IPv4 header.
pub(crate) const IPV4_STATIC_PART_LEN: usize = 10;
/// Static chain bytes contributed by one IPv6 header.
pub(crate) const IPV6_STATIC_PART_LEN: usize = 36;
/// Dynamic chain bytes contributed by one IPv4 header.
pub(crate) const IPV4_DYNAMIC_PART_LEN: usize = 6;
/// Dynamic chain bytes contributed by one IPv6 header.
pub(crate) const IPV6_DYNAMIC_PART_LEN: usize = 2;

/// Fixed-size accumulator for the uncompressed-header bytes a UO CRC covers.
///
/// Sized for two IP headers plus a transport header with slack; the hot path
/// must not allocate.
#[derive(Debug)]
pub(crate) struct CrcInput {
    buf: [u8; 128],
    len: usize,
}

impl CrcInput {
    pub(crate) fn new() -> Self {
        Self {
            buf: [0; 128],
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, byte: u8) {
        self.buf[self.len] = byte;
        self.len += 1;
    }

    #[inline]
    pub(crate) fn push_slice(&mut self, bytes: &[u8]) {
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    #[inline]
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Static chain length of one IP header.
pub(crate) fn static_part_len(header: &IpHeader) -> usize {
    match header {
        IpHeader::V4(_) => IPV4_STATIC_PART_LEN,
        IpHeader::V6(_) => IPV6_STATIC_PART_LEN,
    }
}

/// Dynamic chain length of one IP header.
pub(crate) fn dynamic_part_len(header: &IpHeader) -> usize {
    match header {
        IpHeader::V4(_) => IPV4_DYNAMIC_PART_LEN,
        IpHeader::V6(_) => IPV6_DYNAMIC_PART_LEN,
    }
}

/// Emits the static part of one IP header (RFC 3095, Section 5.7.7.4 for v4,
/// 5.7.7.3 for v6). Returns the number of bytes written.
pub(crate) fn code_static_ip(header: &IpHeader, out: &mut [u8]) -> usize {
    match header {
        IpHeader::V4(h) => code_static_ipv4(h, out),
        IpHeader::V6(h) => code_static_ipv6(h, out),
    }
}

fn code_static_ipv4(h: &Ipv4Header, out: &mut [u8]) -> usize {
    out[0] = 0x40; // version 4, low nibble reserved
    out[1] = h.protocol;
    out[2..6].copy_from_slice(&h.src.octets());
    out[6..10].copy_from_slice(&h.dst.octets());
    IPV4_STATIC_PART_LEN
}

fn code_static_ipv6(h: &Ipv6Header, out: &mut [u8]) -> usize {
    // Version nibble and the 20-bit flow label split across three octets.
    out[0] = 0x60 | ((h.flow_label >> 16) as u8 & 0x0F);
    out[1] = (h.flow_label >> 8) as u8;
    out[2] = h.flow_label as u8;
    out[3] = h.next_header;
    out[4..20].copy_from_slice(&h.src.octets());
    out[20..36].copy_from_slice(&h.dst.octets());
    IPV6_STATIC_PART_LEN
}

/// Emits the dynamic part of one IP header. The NBO/RND flags describe the
/// IP-ID behaviour the compressor has established for this header. Returns
/// the number of bytes written.
pub(crate) fn code_dynamic_ip(header: &IpHeader, rnd: bool, nbo: bool, out: &mut [u8]) -> usize {
    match header {
        IpHeader::V4(h) => {
            out[0] = h.tos;
            out[1] = h.ttl;
            out[2..4].copy_from_slice(&h.identification.to_be_bytes());
            out[4] = (u8::from(h.dont_fragment) << 7) | (u8::from(rnd) << 6) | (u8::from(nbo) << 5);
            out[5] = 0; // generic extension header list: empty
            IPV4_DYNAMIC_PART_LEN
        }
        IpHeader::V6(h) => {
            out[0] = h.traffic_class;
            out[1] = h.hop_limit;
            IPV6_DYNAMIC_PART_LEN
        }
    }
}

/// Appends the CRC-STATIC fields of one IP header. These are exactly the
/// fields the static chain serializes: version, protocol and addresses for
/// v4; version/flow label, next header and addresses for v6.
pub(crate) fn append_crc_static_ip(header: &IpHeader, input: &mut CrcInput) {
    match header {
        IpHeader::V4(h) => {
            input.push(0x40);
            input.push(h.protocol);
            input.push_slice(&h.src.octets());
            input.push_slice(&h.dst.octets());
        }
        IpHeader::V6(h) => {
            input.push(0x60 | ((h.flow_label >> 16) as u8 & 0x0F));
            input.push((h.flow_label >> 8) as u8);
            input.push(h.flow_label as u8);
            input.push(h.next_header);
            input.push_slice(&h.src.octets());
            input.push_slice(&h.dst.octets());
        }
    }
}

/// Appends the CRC-DYNAMIC fields of one IP header: everything the static
/// chain does not carry. For v4 that is IHL, TOS, total length,
/// identification, the flags/fragment octets (DF included, matching the
/// DF/RND/NBO flags of the dynamic chain), TTL and checksum; for v6 the
/// traffic class, payload length and hop limit.
pub(crate) fn append_crc_dynamic_ip(header: &IpHeader, input: &mut CrcInput) {
    match header {
        IpHeader::V4(h) => {
            input.push(h.ihl);
            input.push(h.tos);
            input.push_slice(&h.total_length.to_be_bytes());
            input.push_slice(&h.identification.to_be_bytes());
            let flags_frag = (u16::from(h.dont_fragment) << 14)
                | (u16::from(h.more_fragments) << 13)
                | h.fragment_offset;
            input.push_slice(&flags_frag.to_be_bytes());
            input.push(h.ttl);
            input.push_slice(&h.checksum.to_be_bytes());
        }
        IpHeader::V6(h) => {
            input.push(h.traffic_class);
            input.push_slice(&h.payload_length.to_be_bytes());
            input.push(h.hop_limit);
        }
    }
}
