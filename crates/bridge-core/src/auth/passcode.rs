//! Shared-passcode verification.
//!
//! The bridge is protected by one passcode configured at startup.  Every login
//! attempt is compared against it with [`PasscodeVerifier::is_valid`].
//!
//! # Timing behaviour
//!
//! When the candidate and the configured passcode have the same byte length,
//! every byte is compared (XOR-fold, no early exit) so the running time does
//! not reveal how long the matching prefix is.  A candidate of a different
//! length is rejected immediately, which reveals the passcode *length* to a
//! patient attacker.  That is accepted for a single shared passcode and kept
//! deliberately.

use std::fmt;

/// Checks login attempts against the configured passcode.
#[derive(Clone)]
pub struct PasscodeVerifier {
    expected: Vec<u8>,
}

impl PasscodeVerifier {
    /// Creates a verifier for `passcode`.  An empty passcode means "not
    /// configured": every login attempt will be rejected.
    pub fn new(passcode: impl Into<String>) -> Self {
        Self {
            expected: passcode.into().into_bytes(),
        }
    }

    /// Returns `true` if a non-empty passcode was configured.
    pub fn is_configured(&self) -> bool {
        !self.expected.is_empty()
    }

    /// Returns `true` if `candidate` equals the configured passcode.
    ///
    /// Always `false` when no passcode is configured or the lengths differ.
    pub fn is_valid(&self, candidate: &str) -> bool {
        if !self.is_configured() {
            return false;
        }

        let provided = candidate.as_bytes();
        if provided.len() != self.expected.len() {
            return false;
        }

        constant_time_eq(provided, &self.expected)
    }
}

impl fmt::Debug for PasscodeVerifier {
    // Never print the secret, even in debug logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasscodeVerifier")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Compares two equal-length slices without short-circuiting.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let diff = a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    std::hint::black_box(diff) == 0
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_passcode_is_valid() {
        let verifier = PasscodeVerifier::new("abc123");
        assert!(verifier.is_valid("abc123"));
    }

    #[test]
    fn test_wrong_passcode_same_length_is_rejected() {
        let verifier = PasscodeVerifier::new("abc123");
        assert!(!verifier.is_valid("abc124"));
        assert!(!verifier.is_valid("xbc123"));
    }

    #[test]
    fn test_different_length_is_rejected() {
        let verifier = PasscodeVerifier::new("abc123");
        assert!(!verifier.is_valid("abc12"));
        assert!(!verifier.is_valid("abc1234"));
        assert!(!verifier.is_valid(""));
    }

    #[test]
    fn test_unconfigured_passcode_rejects_everything() {
        // Arrange: empty passcode means "login disabled"
        let verifier = PasscodeVerifier::new("");

        // Assert: not even the empty string is accepted
        assert!(!verifier.is_configured());
        assert!(!verifier.is_valid(""));
        assert!(!verifier.is_valid("anything"));
    }

    #[test]
    fn test_multibyte_passcode_compares_bytes() {
        let verifier = PasscodeVerifier::new("pässwörd");
        assert!(verifier.is_valid("pässwörd"));
        assert!(!verifier.is_valid("passwörd"));
    }

    #[test]
    fn test_debug_output_does_not_leak_secret() {
        let verifier = PasscodeVerifier::new("hunter2");
        let printed = format!("{verifier:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("configured: true"));
    }
}
