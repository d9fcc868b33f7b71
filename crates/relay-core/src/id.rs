//! Connection identifier generation.
//!
//! Identifiers are random hex tokens. Collisions are statistically
//! negligible at the default length, but registration still rejects them
//! rather than overwriting (see the registry).

use rand::Rng;

/// Default identifier length in characters.
pub const DEFAULT_ID_LENGTH: usize = 32;

const HEX_ALPHABET: &[u8; 16] = b"0123456789abcdef";

/// Generator of collision-resistant connection identifiers.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    length: usize,
}

impl IdGenerator {
    /// Create a generator producing identifiers of the given length.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| HEX_ALPHABET[rng.random_range(0..HEX_ALPHABET.len())] as char)
            .collect()
    }

    /// The configured identifier length.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}
