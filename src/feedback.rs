//! Parsing of feedback received from the decompressor.
//!
//! Implements the FEEDBACK-1 and FEEDBACK-2 element formats of RFC 3095,
//! Section 5.7.6. The feedback handed to [`parse_feedback`] starts at the
//! (optional) CID information, i.e. after any link-layer feedback envelope.
//! A FEEDBACK-2 carrying a CRC option is verified here: the CRC-8 is
//! computed over the whole feedback element with the CRC octet zeroed, and a
//! mismatch drops the feedback silently as the RFC requires.

use tracing::debug;

use crate::constants::{ADD_CID_PREFIX_MASK, ADD_CID_PREFIX_VALUE, SMALL_CID_MASK};
use crate::crc::CrcCalculators;
use crate::error::FeedbackError;
use crate::packet_defs::CidType;
use crate::types::ContextId;

/// Acknowledgment type of a FEEDBACK-2 element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackAckType {
    /// Packet decompressed correctly; references may advance.
    Ack,
    /// Dynamic context is damaged; fall back to FO.
    Nack,
    /// Static context is damaged; fall back to IR.
    StaticNack,
    /// Reserved value; logged and dropped.
    Reserved,
}

impl FeedbackAckType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => FeedbackAckType::Ack,
            1 => FeedbackAckType::Nack,
            2 => FeedbackAckType::StaticNack,
            _ => FeedbackAckType::Reserved,
        }
    }
}

/// A parsed FEEDBACK-2 element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback2 {
    pub ack_type: FeedbackAckType,
    /// Raw 2-bit mode field; zero means "no mode change requested".
    pub mode_bits: u8,
    /// Acknowledged SN: 12 bits from the header, widened by SN options.
    pub sn: u16,
    /// Cleared when an SN-Not-Valid option is present.
    pub sn_valid: bool,
    /// Set when a CRC option was present and matched.
    pub crc_verified: bool,
    /// Set when a Reject option was present.
    pub rejected: bool,
}

/// One feedback element, addressed to a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// FEEDBACK-1: an ACK carrying 8 SN LSBs.
    Ack1 { cid: ContextId, sn_lsb: u8 },
    /// FEEDBACK-2 with its options applied.
    Feedback2 { cid: ContextId, feedback: Feedback2 },
}

impl Feedback {
    /// Context the feedback addresses.
    pub fn cid(&self) -> ContextId {
        match self {
            Feedback::Ack1 { cid, .. } => *cid,
            Feedback::Feedback2 { cid, .. } => *cid,
        }
    }
}

/// Splits the CID information off the front of a feedback element.
fn parse_feedback_cid(
    data: &[u8],
    cid_type: CidType,
) -> Result<(ContextId, usize), FeedbackError> {
    match cid_type {
        CidType::Small => match data.first() {
            Some(&octet) if octet & ADD_CID_PREFIX_MASK == ADD_CID_PREFIX_VALUE => {
                Ok((ContextId::new((octet & SMALL_CID_MASK) as u16), 1))
            }
            Some(_) => Ok((ContextId::new(0), 0)),
            None => Err(FeedbackError::Truncated { needed: 1, got: 0 }),
        },
        CidType::Large => {
            // SDVL-coded CID, at most two octets for CIDs up to 16383.
            let first = *data
                .first()
                .ok_or(FeedbackError::Truncated { needed: 1, got: 0 })?;
            if first & 0x80 == 0 {
                Ok((ContextId::new(first as u16), 1))
            } else {
                let second = *data
                    .get(1)
                    .ok_or(FeedbackError::Truncated { needed: 2, got: 1 })?;
                let cid = (((first & 0x3F) as u16) << 8) | second as u16;
                Ok((ContextId::new(cid), 2))
            }
        }
    }
}

/// Parses one feedback element.
///
/// Returns `Ok(None)` when the feedback carried a CRC option that failed
/// verification; per RFC 3095 such feedback is discarded without error.
///
/// # Errors
/// - [`FeedbackError`] - The element is structurally truncated or an option
///   length points past its end.
pub fn parse_feedback(
    data: &[u8],
    cid_type: CidType,
    crc_calculators: &CrcCalculators,
) -> Result<Option<Feedback>, FeedbackError> {
    let (cid, cid_len) = parse_feedback_cid(data, cid_type)?;
    let body = &data[cid_len..];

    match body.len() {
        0 => Err(FeedbackError::Truncated {
            needed: cid_len + 1,
            got: data.len(),
        }),
        1 => Ok(Some(Feedback::Ack1 {
            cid,
            sn_lsb: body[0],
        })),
        _ => parse_feedback2(data, cid_len, cid, crc_calculators),
    }
}

fn parse_feedback2(
    data: &[u8],
    cid_len: usize,
    cid: ContextId,
    crc_calculators: &CrcCalculators,
) -> Result<Option<Feedback>, FeedbackError> {
    let body = &data[cid_len..];
    debug_assert!(body.len() >= 2, "FEEDBACK-2 dispatch requires two octets");

    let ack_type = FeedbackAckType::from_bits(body[0] >> 6);
    let mode_bits = (body[0] >> 4) & 0x03;
    let mut sn = (((body[0] & 0x0F) as u16) << 8) | body[1] as u16;
    let mut sn_valid = true;
    let mut rejected = false;
    let mut crc_in_packet = None;

    // Options TLV walk: Type:4 Len:4 followed by Len value octets.
    let mut pos = 2;
    while pos < body.len() {
        let opt_type = body[pos] >> 4;
        let opt_len = (body[pos] & 0x0F) as usize;
        let value_start = pos + 1;
        if value_start + opt_len > body.len() {
            return Err(FeedbackError::InvalidOptionLength {
                option_type: opt_type,
                length: opt_len,
            });
        }
        let value = &body[value_start..value_start + opt_len];

        match opt_type {
            1 => {
                // CRC: exactly one octet; its position in the full element is
                // needed to zero it for verification.
                if opt_len != 1 {
                    return Err(FeedbackError::InvalidOptionLength {
                        option_type: opt_type,
                        length: opt_len,
                    });
                }
                crc_in_packet = Some((value[0], cid_len + value_start));
            }
            2 => rejected = true,
            3 => sn_valid = false,
            4 => {
                // SN: each option widens the acknowledged SN by 8 bits.
                if opt_len != 1 {
                    return Err(FeedbackError::InvalidOptionLength {
                        option_type: opt_type,
                        length: opt_len,
                    });
                }
                sn = (sn << 8) | value[0] as u16;
            }
            7 => {
                // Loss: informational only.
                debug!(cid = %cid, loss = ?value, "feedback reports loss event");
            }
            other => {
                debug!(option = other, "ignoring unknown feedback option");
            }
        }
        pos = value_start + opt_len;
    }

    let crc_verified = match crc_in_packet {
        Some((received, crc_pos)) => {
            let mut scratch = data.to_vec();
            scratch[crc_pos] = 0;
            let computed = crc_calculators.crc8(&scratch);
            if computed != received {
                debug!(
                    cid = %cid,
                    received = received,
                    computed = computed,
                    "dropping feedback with bad CRC"
                );
                return Ok(None);
            }
            true
        }
        None => false,
    };

    Ok(Some(Feedback::Feedback2 {
        cid,
        feedback: Feedback2 {
            ack_type,
            mode_bits,
            sn,
            sn_valid,
            crc_verified,
            rejected,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crc() -> CrcCalculators {
        CrcCalculators::new()
    }

    /// Builds a FEEDBACK-2 element with a valid CRC option appended.
    pub(crate) fn build_feedback2_with_crc(
        cid: u16,
        ack_type_bits: u8,
        mode_bits: u8,
        sn: u16,
        crc_calculators: &CrcCalculators,
    ) -> Vec<u8> {
        let mut fb = Vec::new();
        if cid > 0 {
            fb.push(ADD_CID_PREFIX_VALUE | (cid as u8 & SMALL_CID_MASK));
        }
        fb.push((ack_type_bits << 6) | (mode_bits << 4) | ((sn >> 8) as u8 & 0x0F));
        fb.push(sn as u8);
        fb.push(0x11); // CRC option, length 1
        fb.push(0);
        let crc_value = crc_calculators.crc8(&fb);
        let crc_pos = fb.len() - 1;
        fb[crc_pos] = crc_value;
        fb
    }

    #[test]
    fn feedback1_single_octet_is_ack() {
        let parsed = parse_feedback(&[0x2A], CidType::Small, &crc())
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            Feedback::Ack1 {
                cid: ContextId::new(0),
                sn_lsb: 0x2A
            }
        );
    }

    #[test]
    fn feedback1_with_add_cid() {
        let parsed = parse_feedback(&[0xE5, 0x10], CidType::Small, &crc())
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            Feedback::Ack1 {
                cid: ContextId::new(5),
                sn_lsb: 0x10
            }
        );
    }

    #[test]
    fn feedback2_static_nack_with_valid_crc() {
        let calculators = crc();
        let fb = build_feedback2_with_crc(3, 2, 0, 0x123, &calculators);
        let parsed = parse_feedback(&fb, CidType::Small, &calculators)
            .unwrap()
            .unwrap();
        let Feedback::Feedback2 { cid, feedback } = parsed else {
            panic!("expected FEEDBACK-2");
        };
        assert_eq!(cid, ContextId::new(3));
        assert_eq!(feedback.ack_type, FeedbackAckType::StaticNack);
        assert_eq!(feedback.sn, 0x123);
        assert!(feedback.crc_verified);
        assert!(feedback.sn_valid);
    }

    #[test]
    fn feedback2_bad_crc_dropped_silently() {
        let calculators = crc();
        let mut fb = build_feedback2_with_crc(3, 0, 0, 7, &calculators);
        let crc_pos = fb.len() - 1;
        fb[crc_pos] ^= 0xFF;
        assert_eq!(parse_feedback(&fb, CidType::Small, &calculators).unwrap(), None);
    }

    #[test]
    fn feedback2_sn_option_widens_sn() {
        let calculators = crc();
        // ACK, SN header bits 0x001, SN option appending 0x55.
        let fb = vec![0x00, 0x01, 0x41, 0x55];
        let parsed = parse_feedback(&fb, CidType::Small, &calculators)
            .unwrap()
            .unwrap();
        let Feedback::Feedback2 { feedback, .. } = parsed else {
            panic!("expected FEEDBACK-2");
        };
        assert_eq!(feedback.sn, 0x0155);
        assert!(!feedback.crc_verified);
    }

    #[test]
    fn feedback2_sn_not_valid_option() {
        let calculators = crc();
        let fb = vec![0x00, 0x01, 0x30];
        let parsed = parse_feedback(&fb, CidType::Small, &calculators)
            .unwrap()
            .unwrap();
        let Feedback::Feedback2 { feedback, .. } = parsed else {
            panic!("expected FEEDBACK-2");
        };
        assert!(!feedback.sn_valid);
    }

    #[test]
    fn feedback2_unknown_option_is_skipped() {
        let calculators = crc();
        // Unknown option type 9 with a two-octet value, then SN-Not-Valid.
        let fb = vec![0x40, 0x01, 0x92, 0xAA, 0xBB, 0x30];
        let parsed = parse_feedback(&fb, CidType::Small, &calculators)
            .unwrap()
            .unwrap();
        let Feedback::Feedback2 { feedback, .. } = parsed else {
            panic!("expected FEEDBACK-2");
        };
        assert_eq!(feedback.ack_type, FeedbackAckType::Nack);
        assert!(!feedback.sn_valid);
    }

    #[test]
    fn truncated_option_is_an_error() {
        let calculators = crc();
        let fb = vec![0x00, 0x01, 0x12]; // CRC option claims 2 value octets
        let err = parse_feedback(&fb, CidType::Small, &calculators).unwrap_err();
        assert_eq!(
            err,
            FeedbackError::InvalidOptionLength {
                option_type: 1,
                length: 2
            }
        );
    }

    #[test]
    fn empty_feedback_is_truncated() {
        let err = parse_feedback(&[], CidType::Small, &crc()).unwrap_err();
        assert!(matches!(err, FeedbackError::Truncated { .. }));
    }

    #[test]
    fn large_cid_sdvl_two_octets() {
        let calculators = crc();
        // CID 300 = 0b1_0010_1100 -> SDVL 10xxxxxx: 0x81, 0x2C; then FEEDBACK-1.
        let fb = vec![0x81, 0x2C, 0x42];
        let parsed = parse_feedback(&fb, CidType::Large, &calculators)
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            Feedback::Ack1 {
                cid: ContextId::new(300),
                sn_lsb: 0x42
            }
        );
    }
}
