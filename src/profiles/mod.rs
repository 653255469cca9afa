//! Compression profiles.
//!
//! Each submodule implements one RFC 3095 profile; `rfc3095` holds the
//! generic engine shared by the IP-only and UDP profiles. This module also
//! provides the CID encoding helpers every packet builder needs.

pub mod ip;
pub mod rfc3095;
pub mod uncompressed;
pub mod udp;

use crate::constants::{ADD_CID_PREFIX_VALUE, SMALL_CID_MASK};
use crate::packet_defs::CidType;
use crate::types::ContextId;

/// Extra bytes the CID information adds on top of the packet's first octet.
pub(crate) fn cid_overhead(cid_type: CidType, cid: ContextId) -> usize {
    match cid_type {
        CidType::Small => usize::from(cid.value() > 0),
        CidType::Large => {
            if cid.value() <= 0x7F {
                1
            } else {
                2
            }
        }
    }
}

/// Writes the CID information of a packet.
///
/// Small CIDs 1..=15 get an Add-CID octet *before* the packet's first octet;
/// large CIDs are SDVL-coded *after* it (RFC 3095, Sections 5.2.3 and 5.7.7).
/// Returns `(first_position, counter)`: the index where the caller must place
/// the packet-type octet and the index where the remaining fields start. The
/// caller has already verified capacity.
pub(crate) fn encode_cid_prefix(
    cid_type: CidType,
    cid: ContextId,
    out: &mut [u8],
) -> (usize, usize) {
    match cid_type {
        CidType::Small => {
            if cid.value() > 0 {
                out[0] = ADD_CID_PREFIX_VALUE | (cid.value() as u8 & SMALL_CID_MASK);
                (1, 2)
            } else {
                (0, 1)
            }
        }
        CidType::Large => {
            if cid.value() <= 0x7F {
                out[1] = cid.value() as u8;
                (0, 2)
            } else {
                out[1] = 0x80 | ((cid.value() >> 8) as u8 & 0x3F);
                out[2] = cid.value() as u8;
                (0, 3)
            }
        }
    }
}
