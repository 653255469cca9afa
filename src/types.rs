//! Core value types of the compressor.
//!
//! Zero-cost newtypes that keep CIDs, sequence numbers and IP identification
//! values from being mixed up at compile time. All wrappers are
//! `#[repr(transparent)]` and support the wrapping arithmetic the protocol
//! requires.

use std::fmt;
use std::ops::{Add, AddAssign, Deref};

use serde::{Deserialize, Serialize};

/// Generates a protocol newtype with the shared set of conversions.
macro_rules! protocol_newtype {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty) => $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[derive(Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Wraps a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Raw value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }

            /// Wrapping addition of a raw increment.
            #[inline]
            pub const fn wrapping_add(self, rhs: $inner) -> Self {
                Self(self.0.wrapping_add(rhs))
            }

            /// Wrapping difference to another value, as the inner type.
            #[inline]
            pub const fn wrapping_sub(self, rhs: Self) -> $inner {
                self.0.wrapping_sub(rhs.0)
            }

            /// Big-endian wire representation.
            #[inline]
            pub const fn to_be_bytes(self) -> [u8; 2] {
                self.0.to_be_bytes()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl Deref for $name {
            type Target = $inner;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl PartialEq<$inner> for $name {
            #[inline]
            fn eq(&self, other: &$inner) -> bool {
                self.0 == *other
            }
        }

        impl PartialEq<$name> for $inner {
            #[inline]
            fn eq(&self, other: &$name) -> bool {
                *self == other.0
            }
        }

        impl PartialOrd<$inner> for $name {
            #[inline]
            fn partial_cmp(&self, other: &$inner) -> Option<std::cmp::Ordering> {
                self.0.partial_cmp(other)
            }
        }

        impl Add<$inner> for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: $inner) -> Self::Output {
                self.wrapping_add(rhs)
            }
        }

        impl AddAssign<$inner> for $name {
            #[inline]
            fn add_assign(&mut self, rhs: $inner) {
                *self = self.wrapping_add(rhs);
            }
        }
    };
}

protocol_newtype!(
    /// Context identifier labelling one flow inside a compressor.
    ContextId(u16) => "CID"
);

protocol_newtype!(
    /// 16-bit compressor sequence number with wrapping arithmetic.
    SequenceNumber(u16) => "SN"
);

protocol_newtype!(
    /// IPv4 Identification field value.
    IpId(u16) => "IP_ID"
);

impl ContextId {
    /// Largest CID usable in small CID mode.
    pub const MAX_SMALL_CID: Self = Self::new(15);
}

impl SequenceNumber {
    /// Wrapping distance from `older` to `self`, treating `self` as the more
    /// recent value.
    #[inline]
    pub fn distance_from(self, older: SequenceNumber) -> u16 {
        self.0.wrapping_sub(older.0)
    }
}

impl IpId {
    /// Offset of this IP-ID relative to a sequence number, the quantity
    /// actually W-LSB encoded on the wire (RFC 3095, Section 4.5.5).
    #[inline]
    pub fn offset_from(self, sn: SequenceNumber) -> u16 {
        self.0.wrapping_sub(sn.0)
    }
}
