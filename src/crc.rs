//! ROHC CRC calculation utilities.
//!
//! Thin wrappers around the `crc` crate providing the three CRC flavours of
//! RFC 3095, Section 5.9: CRC-3 (UO-0/UO-1 headers), CRC-7 (UOR-2 headers)
//! and CRC-8 (IR/IR-DYN headers and feedback). [`CrcCalculators`] holds the
//! pre-built lookup tables so they are computed once per compressor and can
//! be shared read-only afterwards.

use crc::{Crc, CRC_3_ROHC, CRC_7_ROHC, CRC_8_ROHC};
use std::fmt;

/// Pre-initialized CRC algorithm instances for ROHC.
///
/// Owned by the compressor and handed by reference into profile code; the
/// tables are immutable after construction.
pub struct CrcCalculators {
    crc3: Crc<u8>,
    crc7: Crc<u8>,
    crc8: Crc<u8>,
}

impl fmt::Debug for CrcCalculators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrcCalculators")
            .field("crc3", &format_args!("Crc<u8>(CRC_3_ROHC)"))
            .field("crc7", &format_args!("Crc<u8>(CRC_7_ROHC)"))
            .field("crc8", &format_args!("Crc<u8>(CRC_8_ROHC)"))
            .finish()
    }
}

impl CrcCalculators {
    /// Builds the three ROHC CRC instances, precomputing their tables.
    pub fn new() -> Self {
        Self {
            crc3: Crc::<u8>::new(&CRC_3_ROHC),
            crc7: Crc::<u8>::new(&CRC_7_ROHC),
            crc8: Crc::<u8>::new(&CRC_8_ROHC),
        }
    }

    /// ROHC CRC-3 over `input` (values `0x00..=0x07`).
    #[inline]
    pub fn crc3(&self, input: &[u8]) -> u8 {
        self.crc3.checksum(input)
    }

    /// ROHC CRC-7 over `input` (values `0x00..=0x7F`).
    #[inline]
    pub fn crc7(&self, input: &[u8]) -> u8 {
        self.crc7.checksum(input)
    }

    /// ROHC CRC-8 over `input`.
    #[inline]
    pub fn crc8(&self, input: &[u8]) -> u8 {
        self.crc8.checksum(input)
    }
}

impl Default for CrcCalculators {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc3_standard_check_value() {
        let calculators = CrcCalculators::new();
        assert_eq!(calculators.crc3(b"123456789"), 0x06);
    }

    #[test]
    fn crc7_standard_check_value() {
        let calculators = CrcCalculators::new();
        assert_eq!(calculators.crc7(b"123456789"), 0x53);
        assert_eq!(CRC_7_ROHC.check, 0x53);
    }

    #[test]
    fn crc8_standard_check_value() {
        let calculators = CrcCalculators::new();
        assert_eq!(calculators.crc8(b"123456789"), 0xD0);
        assert_eq!(CRC_8_ROHC.check, 0xD0);
    }

    #[test]
    fn crc_of_empty_input_is_init_value() {
        let calculators = CrcCalculators::new();
        assert_eq!(calculators.crc3(b""), 0x07);
        assert_eq!(calculators.crc7(b""), 0x7F);
        assert_eq!(calculators.crc8(b""), 0xFF);
    }

    #[test]
    fn crc_outputs_stay_within_width() {
        let calculators = CrcCalculators::new();
        let data = b"a longer input exercising every table entry at least once";
        assert!(calculators.crc3(data) <= 0x07);
        assert!(calculators.crc7(data) <= 0x7F);
    }
}
