//! Cryptographically secure random identifiers.

use rand::distr::{Alphanumeric, SampleString};

/// Generates a random alphanumeric string of `len` characters.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a session identifier.
///
/// 43 alphanumeric characters carry roughly 256 bits of entropy.
#[must_use]
pub fn random_session_id() -> String {
    random_alphanumeric(43)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphanumeric_has_requested_length() {
        let s = random_alphanumeric(16);
        assert_eq!(s.len(), 16);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(random_session_id(), random_session_id());
    }
}
