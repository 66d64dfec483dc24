//! Core value types shared across the index.
//!
//! Dimension counts and scope masks are newtypes rather than bare integers so
//! the compiler keeps "how long is a vector" and "which subsets does a record
//! belong to" from being swapped or forgotten at call sites.

use crate::error::{IndexError, IndexResult};

/// Type-safe vector dimension count.
///
/// Fixed for the lifetime of an index: set at construction or recovered from
/// a loaded file header. Validation happens once here so the tree and codec
/// can rely on every stored vector having exactly this length. [`new`] is the
/// only way to obtain one, so a zero count cannot exist.
///
/// [`new`]: Dimensions::new
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions(usize);

impl Dimensions {
    /// Creates a new `Dimensions` with validation.
    ///
    /// Returns an error if the count is zero.
    pub fn new(count: usize) -> IndexResult<Self> {
        if count == 0 {
            return Err(IndexError::InvalidDimension {
                dimension: 0,
                reason: "dimension count cannot be zero",
            });
        }
        Ok(Self(count))
    }

    /// Returns the underlying dimension count.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has exactly this many components.
    pub fn validate_vector(&self, vector: &[f32]) -> IndexResult<()> {
        if vector.len() != self.0 {
            return Err(IndexError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Bitmask partitioning an index into up to 32 overlapping subsets.
///
/// A record matches a search when the bitwise AND of the two masks is
/// non-zero. The default is all bits set, so unscoped records match every
/// scoped search and unscoped searches match every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeMask(u32);

impl ScopeMask {
    /// Mask with every bit set: matches everything.
    pub const ALL: Self = Self(u32::MAX);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// True when the two masks share at least one bit.
    #[must_use]
    pub const fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Converts to little-endian bytes for storage.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Creates from little-endian bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl Default for ScopeMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_reject_zero() {
        assert!(matches!(
            Dimensions::new(0),
            Err(IndexError::InvalidDimension { dimension: 0, .. })
        ));
        assert_eq!(Dimensions::new(384).unwrap().get(), 384);
    }

    #[test]
    fn dimensions_validate_vector_length() {
        let dims = Dimensions::new(3).unwrap();
        assert!(dims.validate_vector(&[1.0, 2.0, 3.0]).is_ok());

        let err = dims.validate_vector(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn default_scope_matches_everything() {
        let narrow = ScopeMask::new(0b0100);
        assert!(ScopeMask::default().intersects(narrow));
        assert!(narrow.intersects(ScopeMask::ALL));
    }

    #[test]
    fn disjoint_scopes_do_not_intersect() {
        let a = ScopeMask::new(0b0011);
        let b = ScopeMask::new(0b1100);
        assert!(!a.intersects(b));
        assert!(a.intersects(ScopeMask::new(0b0010)));
    }

    #[test]
    fn scope_mask_byte_round_trip() {
        let mask = ScopeMask::new(0xDEAD_BEEF);
        assert_eq!(ScopeMask::from_bytes(mask.to_bytes()), mask);
    }
}
