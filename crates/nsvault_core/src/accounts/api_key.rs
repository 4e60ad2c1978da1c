//! API-key generation and uniqueness repair.

use super::account::Account;
use crate::error::{CoreError, CoreResult};
use rand::distributions::Uniform;
use rand::Rng;
use std::collections::HashSet;

/// Length of generated API keys.
pub const API_KEY_LENGTH: usize = 32;

const API_KEY_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-";

/// Draws candidate API keys.
pub trait KeySource: Send + Sync {
    /// Returns one candidate key.
    fn draw(&self) -> String;
}

/// Random keys of [`API_KEY_LENGTH`] characters over `A-Za-z0-9-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeySource;

impl KeySource for RandomKeySource {
    fn draw(&self) -> String {
        let alphabet = Uniform::from(0..API_KEY_ALPHABET.len());
        rand::thread_rng()
            .sample_iter(alphabet)
            .take(API_KEY_LENGTH)
            .map(|i| char::from(API_KEY_ALPHABET[i]))
            .collect()
    }
}

/// Gives `account` a key that is not in `seen`, and registers it there.
///
/// An existing key that is not yet taken is kept. Otherwise up to
/// `max_attempts` candidates are drawn. Returns whether the account changed.
///
/// # Errors
///
/// Returns [`CoreError::KeySpaceExhausted`] if every draw collided.
pub fn ensure_unique(
    account: &mut Account,
    seen: &mut HashSet<String>,
    source: &dyn KeySource,
    max_attempts: u32,
) -> CoreResult<bool> {
    if let Some(key) = account.api_key.as_deref() {
        if !key.is_empty() && seen.insert(key.to_string()) {
            return Ok(false);
        }
    }

    for _ in 0..max_attempts {
        let candidate = source.draw();
        if seen.insert(candidate.clone()) {
            account.api_key = Some(candidate);
            return Ok(true);
        }
    }

    Err(CoreError::KeySpaceExhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedKeySource(&'static str);

    impl KeySource for FixedKeySource {
        fn draw(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn random_keys_use_alphabet() {
        let key = RandomKeySource.draw();
        assert_eq!(key.len(), API_KEY_LENGTH);
        assert!(key.bytes().all(|b| API_KEY_ALPHABET.contains(&b)));
        assert_ne!(key, RandomKeySource.draw());
    }

    #[test]
    fn keeps_unseen_key() {
        let mut account = Account::new("a", "pw", false);
        account.api_key = Some("existing".into());
        let mut seen = HashSet::new();

        let changed = ensure_unique(&mut account, &mut seen, &RandomKeySource, 20).unwrap();
        assert!(!changed);
        assert_eq!(account.api_key.as_deref(), Some("existing"));
        assert!(seen.contains("existing"));
    }

    #[test]
    fn replaces_duplicate_and_missing_keys() {
        let mut seen: HashSet<String> = ["dup".to_string()].into_iter().collect();

        let mut duplicate = Account::new("a", "pw", false);
        duplicate.api_key = Some("dup".into());
        assert!(ensure_unique(&mut duplicate, &mut seen, &RandomKeySource, 20).unwrap());
        assert_ne!(duplicate.api_key.as_deref(), Some("dup"));

        let mut missing = Account::new("b", "pw", false);
        missing.api_key = Some(String::new());
        assert!(ensure_unique(&mut missing, &mut seen, &RandomKeySource, 20).unwrap());
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut seen: HashSet<String> = ["same".to_string()].into_iter().collect();
        let mut account = Account::new("a", "pw", false);

        let err = ensure_unique(&mut account, &mut seen, &FixedKeySource("same"), 5).unwrap_err();
        assert!(matches!(err, CoreError::KeySpaceExhausted { attempts: 5 }));
        assert!(err.is_internal());
        assert_eq!(account.api_key, None);
    }
}
