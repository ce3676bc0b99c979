//
//! SPDZ-style authenticated shares.
//!
//! A value `x` is authenticated by its MAC `x * alpha`, where `alpha` is a
//! global key nobody knows in the clear. Both `x` and its MAC are additively
//! shared, and so is `alpha` itself.
//!
//! Everything here is produced by a trusted dealer: it is "fake" preprocessing
//! meant for tests and benchmarks, not a secure way to obtain the key.
//!

use num_bigint::BigUint;
use rand::RngCore;

use crate::{
    algebra::field::{Field, PrimeField},
    schemes::additive,
};

pub mod preprocessing;

/// One party's part of an authenticated value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Share {
    pub val: BigUint,
    pub mac: BigUint,
}

impl Share {
    pub fn new(val: BigUint, mac: BigUint) -> Self {
        Self { val, mac }
    }
}

impl From<[BigUint; 2]> for Share {
    fn from([val, mac]: [BigUint; 2]) -> Self {
        Share { val, mac }
    }
}

/// The global MAC key `alpha`.
#[derive(Clone, PartialEq, Eq)]
pub struct MacKey {
    alpha: BigUint,
}

// Only the dealer ever holds the whole key; keep it out of logs.
impl std::fmt::Debug for MacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacKey").finish_non_exhaustive()
    }
}

impl MacKey {
    pub fn new(field: &PrimeField, alpha: BigUint) -> Self {
        Self {
            alpha: field.reduce(&alpha),
        }
    }

    pub fn random<R: RngCore + ?Sized>(field: &PrimeField, rng: &mut R) -> Self {
        Self {
            alpha: field.sample(rng),
        }
    }

    /// Recover the key from its shares.
    pub fn from_shares(field: &PrimeField, shares: &[BigUint]) -> Self {
        Self {
            alpha: field.sum(shares),
        }
    }

    pub fn value(&self) -> &BigUint {
        &self.alpha
    }

    /// MAC of `value`, that is `value * alpha mod p`.
    pub fn mac(&self, field: &PrimeField, value: &BigUint) -> BigUint {
        field.mul(value, &self.alpha)
    }

    /// Split the key into one share per party.
    ///
    /// The key carries no MAC of its own.
    pub fn split<R: RngCore + ?Sized>(
        &self,
        field: &PrimeField,
        rng: &mut R,
        parties: usize,
    ) -> Vec<BigUint> {
        additive::split(field, rng, [self.alpha.clone()], parties)
            .into_iter()
            .map(|[share]| share)
            .collect()
    }

    /// MAC `value` and share both the value and the MAC.
    pub fn authenticate<R: RngCore + ?Sized>(
        &self,
        field: &PrimeField,
        rng: &mut R,
        value: &BigUint,
        parties: usize,
    ) -> Vec<Share> {
        let mac = self.mac(field, value);
        split_shares(field, rng, field.reduce(value), mac, parties)
    }
}

/// Share a `(value, mac)` pair among `parties`.
///
/// Parties `1..n-1` receive random pairs, the last party the remainders.
/// Every authenticated item the dealer produces goes through here.
pub fn split_shares<R: RngCore + ?Sized>(
    field: &PrimeField,
    rng: &mut R,
    value: BigUint,
    mac: BigUint,
    parties: usize,
) -> Vec<Share> {
    additive::split(field, rng, [value, mac], parties)
        .into_iter()
        .map(Share::from)
        .collect()
}
