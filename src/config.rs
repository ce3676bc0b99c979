//! Settings for one dealer run.
use std::path::PathBuf;

use num_bigint::BigUint;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::{
    algebra::field::PrimeField,
    schemes::spdz::preprocessing::{Dealer, DealerError},
};

/// Number of elements in an exponentiation pipe, `r^-1` included.
pub const EXP_PIPE_SIZE: usize = 201;

/// 512-bit prime used when no modulus is configured, big-endian.
pub const DEFAULT_MODULUS: [u8; 64] = [
    0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1f, 0x9a, 0x40, 0x71,
    0x24, 0x09, 0x0f, 0x95, 0xb1, 0x66, 0x5c, 0xc3, 0x6f, 0x47, 0xc1, 0xa0, 0xd9, 0xc0, 0x49, 0x89,
    0x00, 0x60, 0xbc, 0xd5, 0x9a, 0x8e, 0xa0, 0x64, 0x1a, 0xfc, 0xc0, 0x04, 0xf2, 0x86, 0x9b, 0xe9,
    0x92, 0xb0, 0x79, 0x14, 0x11, 0x56, 0x94, 0x3d, 0xf1, 0x74, 0x93, 0xd4, 0x06, 0x42, 0x00, 0x01,
];

pub fn default_modulus() -> BigUint {
    BigUint::from_bytes_be(&DEFAULT_MODULUS)
}

/// Dimensions of the matrices in a permutation item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationShape {
    pub rows: usize,
    pub columns: usize,
}

impl Default for PermutationShape {
    fn default() -> Self {
        Self {
            rows: 100,
            columns: 42,
        }
    }
}

impl PermutationShape {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    /// Entries in the random matrix and in the permuted matrix.
    pub fn matrix_len(&self) -> usize {
        self.rows * self.columns
    }

    /// Entries in the one-hot encoded permutation.
    pub fn permutation_len(&self) -> usize {
        self.rows * self.rows
    }

    /// Shares each party holds per permutation item.
    pub fn len(&self) -> usize {
        2 * self.matrix_len() + self.permutation_len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }
}

/// How many items of each kind to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    pub triples: usize,
    /// Per owning party.
    pub input_masks: usize,
    pub bits: usize,
    pub exp_pipes: usize,
    pub permutations: usize,
}

/// Where the dealer's randomness comes from.
///
/// `Seeded` makes a run reproducible, which is what fixtures and tests want.
/// It is never chosen implicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandomSource {
    #[default]
    Entropy,
    Seeded(u64),
}

impl RandomSource {
    pub fn rng(&self) -> ChaCha20Rng {
        match self {
            RandomSource::Entropy => ChaCha20Rng::from_entropy(),
            RandomSource::Seeded(seed) => ChaCha20Rng::seed_from_u64(*seed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealerConfig {
    pub modulus: BigUint,
    pub parties: usize,
    pub counts: ItemCounts,
    pub permutation_shape: PermutationShape,
    pub pipe_length: usize,
    /// Worker threads of the streamed layout.
    pub threads: usize,
    pub output_dir: PathBuf,
    pub random_source: RandomSource,
}

impl Default for DealerConfig {
    fn default() -> Self {
        Self {
            modulus: default_modulus(),
            parties: 2,
            counts: ItemCounts::default(),
            permutation_shape: PermutationShape::default(),
            pipe_length: EXP_PIPE_SIZE,
            threads: 1,
            output_dir: PathBuf::from("."),
            random_source: RandomSource::default(),
        }
    }
}

impl DealerConfig {
    /// Set up a dealer with a freshly sampled MAC key.
    pub fn dealer(&self) -> Result<Dealer<ChaCha20Rng>, DealerError> {
        let field = PrimeField::new(self.modulus.clone())?;
        let dealer = Dealer::with_random_key(field, self.parties, self.random_source.rng())?;
        dealer.with_pipe_length(self.pipe_length)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_modulus_matches_decimal() {
        let decimal = "6703903964971298549787012499123814115273848577471136527425966013026501536706464354255445443244279389455058889493431223951165286470575994074291745908195329";
        assert_eq!(default_modulus(), decimal.parse::<BigUint>().unwrap());
        assert_eq!(default_modulus().bits(), 512);
    }

    #[test]
    fn permutation_layout_length() {
        let shape = PermutationShape::default();
        assert_eq!(shape.len(), 100 * 42 * 2 + 100 * 100);
        assert!(!shape.is_empty());
        assert!(PermutationShape::new(0, 3).is_empty());
    }

    #[test]
    fn seeded_sources_repeat() {
        use rand::RngCore;
        let a = RandomSource::Seeded(8).rng().next_u64();
        let b = RandomSource::Seeded(8).rng().next_u64();
        assert_eq!(a, b);
    }

    #[test]
    fn dealer_from_config() {
        let config = DealerConfig {
            modulus: BigUint::from(7u8),
            parties: 3,
            pipe_length: 4,
            random_source: RandomSource::Seeded(0),
            ..Default::default()
        };
        let dealer = config.dealer().unwrap();
        assert_eq!(dealer.parties(), 3);
        assert_eq!(dealer.pipe_length(), 4);
        assert_eq!(dealer.field().modulus(), &BigUint::from(7u8));
    }
}
