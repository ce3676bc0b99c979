//! Field arithmetic with a modulus only known at runtime.
//!
//! `ff::Field` fixes its modulus at compile time, but a dealer run takes its
//! prime from the command line, so elements here are plain `BigUint`s and
//! all arithmetic goes through a [`PrimeField`] context.
use std::fmt::Debug;

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{Rng, RngCore};
use thiserror::Error;

/// Minimal field interface needed for additive sharing.
///
/// The field is a value rather than a type, so every operation takes `&self`.
pub trait Field {
    type Element: Clone + PartialEq + Debug;

    fn zero(&self) -> Self::Element;
    fn add(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;
    fn sub(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;
    fn mul(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;

    /// Uniformly random element.
    fn random<R: RngCore + ?Sized>(&self, rng: &mut R) -> Self::Element;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Modulus must be at least 2, got {0}")]
    ModulusTooSmall(BigUint),
}

/// The integers modulo `p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeField {
    modulus: BigUint,
    bits: u64,
    byte_len: usize,
}

impl PrimeField {
    pub fn new(modulus: BigUint) -> Result<Self, FieldError> {
        if modulus < BigUint::from(2u8) {
            return Err(FieldError::ModulusTooSmall(modulus));
        }
        let bits = modulus.bits();
        let byte_len = bits.div_ceil(8) as usize;
        Ok(Self {
            modulus,
            bits,
            byte_len,
        })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Bit length of the modulus.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Number of bytes needed to hold any element, big-endian without sign byte.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Sample uniformly from `[0, p)`.
    ///
    /// Draws exactly `bits(p)` random bits and retries while the candidate is
    /// out of range. The expected number of draws is below two.
    pub fn sample<R: RngCore + ?Sized>(&self, rng: &mut R) -> BigUint {
        loop {
            let candidate = rng.gen_biguint(self.bits);
            if candidate < self.modulus {
                return candidate;
            }
        }
    }

    /// Sample a single random bit as a field element.
    pub fn sample_bit<R: RngCore + ?Sized>(&self, rng: &mut R) -> BigUint {
        if rng.gen::<bool>() {
            BigUint::one()
        } else {
            BigUint::zero()
        }
    }

    pub fn reduce(&self, x: &BigUint) -> BigUint {
        x % &self.modulus
    }

    /// Modular inverse, `None` if `x` shares a factor with the modulus (or is zero).
    pub fn inverse(&self, x: &BigUint) -> Option<BigUint> {
        let x = self.reduce(x);
        if x.is_zero() {
            return None;
        }
        x.modinv(&self.modulus)
    }

    pub fn pow(&self, base: &BigUint, exp: u64) -> BigUint {
        base.modpow(&BigUint::from(exp), &self.modulus)
    }

    pub fn sum<'a>(&self, elements: impl IntoIterator<Item = &'a BigUint>) -> BigUint {
        elements
            .into_iter()
            .fold(BigUint::zero(), |acc, x| self.add(&acc, x))
    }
}

impl Field for PrimeField {
    type Element = BigUint;

    fn zero(&self) -> BigUint {
        BigUint::zero()
    }

    fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.modulus
    }

    fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        let a = self.reduce(a);
        let b = self.reduce(b);
        (a + &self.modulus - b) % &self.modulus
    }

    fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.modulus
    }

    fn random<R: RngCore + ?Sized>(&self, rng: &mut R) -> BigUint {
        self.sample(rng)
    }
}

#[cfg(test)]
mod test {
    use num_traits::ToPrimitive;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn field(p: u64) -> PrimeField {
        PrimeField::new(BigUint::from(p)).unwrap()
    }

    #[test]
    fn rejects_tiny_modulus() {
        assert_eq!(
            PrimeField::new(BigUint::one()),
            Err(FieldError::ModulusTooSmall(BigUint::one()))
        );
        assert!(PrimeField::new(BigUint::zero()).is_err());
    }

    #[test]
    fn byte_length() {
        assert_eq!(field(7).byte_len(), 1);
        assert_eq!(field(255).byte_len(), 1);
        assert_eq!(field(257).byte_len(), 2);
        assert_eq!(field(65537).bits(), 17);
        assert_eq!(field(65537).byte_len(), 3);
    }

    #[test]
    fn samples_stay_below_modulus() {
        let f = field(7);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let mut seen = [false; 7];
        for _ in 0..10_000 {
            let x = f.sample(&mut rng);
            assert!(x < BigUint::from(7u8));
            seen[x.to_usize().unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s), "every residue should show up");
    }

    #[test]
    fn sampling_is_reproducible() {
        let f = field(7);
        let draw = |seed| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            (0..64).map(|_| f.sample(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draw(1234), draw(1234));
        assert_ne!(draw(1234), draw(4321));
    }

    #[test]
    fn seeded_samples_are_pinned() {
        let pinned = |p: u64, expected: &[u64]| {
            let f = field(p);
            let mut rng = ChaCha20Rng::seed_from_u64(1234);
            let got: Vec<u64> = (0..expected.len())
                .map(|_| f.sample(&mut rng).to_u64().unwrap())
                .collect();
            assert_eq!(got, expected, "samples mod {p} changed");
        };
        pinned(7, &[0, 0, 4, 6, 6, 2, 4, 2, 3, 1, 0, 4, 5, 3, 5, 4]);
        pinned(65521, &[420, 6877, 40830, 54755, 57049, 18022, 33967, 23255]);
    }

    #[test]
    fn bits_are_bits() {
        let f = field(7);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let ones = (0..1000)
            .map(|_| f.sample_bit(&mut rng))
            .inspect(|b| assert!(b <= &BigUint::one()))
            .filter(|b| b.is_one())
            .count();
        assert!((400..600).contains(&ones));
    }

    #[test]
    fn arithmetic() {
        let f = field(7);
        let a = BigUint::from(5u8);
        let b = BigUint::from(4u8);
        assert_eq!(f.add(&a, &b), BigUint::from(2u8));
        assert_eq!(f.sub(&b, &a), BigUint::from(6u8));
        assert_eq!(f.mul(&a, &b), BigUint::from(6u8));
        assert_eq!(f.inverse(&BigUint::from(3u8)), Some(a.clone()));
        assert_eq!(f.inverse(&BigUint::zero()), None);
        assert_eq!(f.pow(&a, 2), BigUint::from(4u8));
        assert_eq!(f.sum([&a, &b, &a]), BigUint::from(0u8));
    }

    #[test]
    fn composite_modulus_has_non_invertibles() {
        let f = field(15);
        assert_eq!(f.inverse(&BigUint::from(5u8)), None);
        assert_eq!(f.inverse(&BigUint::from(2u8)), Some(BigUint::from(8u8)));
    }
}
