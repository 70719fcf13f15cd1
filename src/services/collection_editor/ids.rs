use rand::{Rng, rng};

/// Alphabet of generated identifiers: 64 URL-safe symbols.
const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_-";
/// Length of generated identifiers.
pub const SHORT_ID_LENGTH: usize = 10;

/// Source of identifiers for new games, users and embedded elements.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random short identifiers. Uniqueness is probabilistic: collisions with
/// existing identifiers are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortIdGenerator;

impl IdGenerator for ShortIdGenerator {
    fn generate(&self) -> String {
        let mut rng = rng();
        (0..SHORT_ID_LENGTH)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn short_ids_are_url_safe_and_fixed_length() {
        let id = ShortIdGenerator.generate();
        assert_eq!(id.len(), SHORT_ID_LENGTH);
        assert!(id.bytes().all(|byte| ALPHABET.contains(&byte)));
    }

    #[test]
    fn short_ids_do_not_repeat_in_practice() {
        let ids: HashSet<_> = (0..1_000).map(|_| ShortIdGenerator.generate()).collect();
        assert_eq!(ids.len(), 1_000);
    }
}
