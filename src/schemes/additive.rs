//! Additive secret sharing over any [`Field`].
//!
//! A secret is split into `n` parts that sum to it. The first `n - 1` parts
//! are drawn uniformly at random and the last party receives the remainder,
//! so reconstruction never depends on the random source.
//!
//! Several secrets can be split in lockstep (`K > 1`), which is how a value
//! and its MAC are shared together. For each of the first `n - 1` parties the
//! `K` components are drawn in order, so a seeded source reproduces the
//! exact same shares.

use rand::RngCore;

use crate::algebra::field::Field;

/// Split `secret` into `parties` additive shares.
///
/// `parties` must be at least one; a single party simply receives the secret.
pub fn split<F: Field, const K: usize, R: RngCore + ?Sized>(
    field: &F,
    rng: &mut R,
    secret: [F::Element; K],
    parties: usize,
) -> Vec<[F::Element; K]> {
    debug_assert!(parties > 0, "cannot share among zero parties");
    let mut rest = secret;
    let mut shares = Vec::with_capacity(parties);
    for _ in 1..parties {
        let share: [F::Element; K] = std::array::from_fn(|_| field.random(&mut *rng));
        for (r, s) in rest.iter_mut().zip(&share) {
            *r = field.sub(r, s);
        }
        shares.push(share);
    }
    shares.push(rest);
    shares
}

/// Sum shares component-wise.
pub fn combine<F: Field, const K: usize>(field: &F, shares: &[[F::Element; K]]) -> [F::Element; K] {
    shares.iter().fold(std::array::from_fn(|_| field.zero()), |mut acc, share| {
        for (a, s) in acc.iter_mut().zip(share) {
            *a = field.add(a, s);
        }
        acc
    })
}

#[cfg(test)]
mod test {
    use num_bigint::BigUint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::algebra::field::PrimeField;

    /// Integers mod 2^64, enough to check the scheme is field-agnostic.
    struct Wrapping;

    impl Field for Wrapping {
        type Element = u64;

        fn zero(&self) -> u64 {
            0
        }

        fn add(&self, a: &u64, b: &u64) -> u64 {
            a.wrapping_add(*b)
        }

        fn sub(&self, a: &u64, b: &u64) -> u64 {
            a.wrapping_sub(*b)
        }

        fn mul(&self, a: &u64, b: &u64) -> u64 {
            a.wrapping_mul(*b)
        }

        fn random<R: RngCore + ?Sized>(&self, rng: &mut R) -> u64 {
            rng.next_u64()
        }
    }

    #[test]
    fn shares_sum_to_secret() {
        let field = PrimeField::new(BigUint::from(101u8)).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for parties in 1..6 {
            let secret = [BigUint::from(42u8), BigUint::from(99u8)];
            let shares = split(&field, &mut rng, secret.clone(), parties);
            assert_eq!(shares.len(), parties);
            assert_eq!(combine(&field, &shares), secret);
        }
    }

    #[test]
    fn single_party_gets_the_secret() {
        let field = PrimeField::new(BigUint::from(7u8)).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let shares = split(&field, &mut rng, [BigUint::from(3u8)], 1);
        assert_eq!(shares, vec![[BigUint::from(3u8)]]);
    }

    #[test]
    fn last_share_is_the_remainder() {
        let field = PrimeField::new(BigUint::from(7u8)).unwrap();
        let secret = BigUint::from(4u8);

        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let shares = split(&field, &mut rng, [secret.clone()], 3);

        // The first two shares are exactly the next two samples of the source.
        let mut replay = ChaCha20Rng::seed_from_u64(5);
        let first = field.sample(&mut replay);
        let second = field.sample(&mut replay);
        assert_eq!(shares[0][0], first);
        assert_eq!(shares[1][0], second);

        let rest = field.sub(&field.sub(&secret, &first), &second);
        assert_eq!(shares[2][0], rest);
    }

    #[test]
    fn works_over_other_fields() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let shares = split(&Wrapping, &mut rng, [u64::MAX, 17], 4);
        assert_eq!(combine(&Wrapping, &shares), [u64::MAX, 17]);
    }
}
