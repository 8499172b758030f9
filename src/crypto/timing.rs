//! Constant-time comparisons for key material.

use subtle::ConstantTimeEq;

/// Constant-time utilities for security-critical comparisons
pub struct TimingSafe;

impl TimingSafe {
    /// Constant-time comparison of byte arrays
    ///
    /// Returns true if arrays are equal. The running time depends only on the
    /// lengths, never on the contents.
    pub fn bytes_equal(a: &[u8], b: &[u8]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.ct_eq(b).into()
    }

    /// Constant-time comparison of two key fingerprints
    pub fn fingerprints_equal(a: &[u8; 32], b: &[u8; 32]) -> bool {
        a.ct_eq(b).into()
    }
}
