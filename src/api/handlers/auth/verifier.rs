//! Secret comparison behind the login policy.

use secrecy::{ExposeSecret, SecretString};

/// Decides whether a candidate password matches the configured credential.
///
/// The gateway applies its own policy (length, weak-password denylist) before
/// asking the verifier, so implementations only compare.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, candidate: &str) -> bool;
}

/// Compares against a single shared admin secret.
#[derive(Debug, Clone)]
pub struct SharedSecretVerifier {
    secret: SecretString,
}

impl SharedSecretVerifier {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

impl CredentialVerifier for SharedSecretVerifier {
    fn verify(&self, candidate: &str) -> bool {
        let expected = self.secret.expose_secret();
        !expected.is_empty() && constant_time_eq(expected.as_bytes(), candidate.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }

    #[test]
    fn shared_secret_requires_exact_match() {
        let verifier = SharedSecretVerifier::new(SecretString::from("Correct-Horse-9"));
        assert!(verifier.verify("Correct-Horse-9"));
        assert!(!verifier.verify("correct-horse-9"));
        assert!(!verifier.verify("Correct-Horse-9 "));
    }

    #[test]
    fn empty_secret_never_matches() {
        let verifier = SharedSecretVerifier::new(SecretString::from(""));
        assert!(!verifier.verify(""));
    }

    #[test]
    fn debug_redacts_secret() {
        let verifier = SharedSecretVerifier::new(SecretString::from("Correct-Horse-9"));
        assert!(!format!("{verifier:?}").contains("Correct-Horse-9"));
    }
}
