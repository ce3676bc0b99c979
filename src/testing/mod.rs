//! Helpers for opening dealer output in tests.

use crate::{
    algebra::field::{Field, PrimeField},
    schemes::spdz::Share,
};

/// Sum the shares of one authenticated value.
pub fn reconstruct(field: &PrimeField, shares: &[Share]) -> Share {
    shares.iter().fold(
        Share::new(field.zero(), field.zero()),
        |acc, s| Share::new(field.add(&acc.val, &s.val), field.add(&acc.mac, &s.mac)),
    )
}

/// Open position-wise values held as one vector per party.
pub fn reconstruct_columns(field: &PrimeField, columns: &[Vec<Share>]) -> Vec<Share> {
    let len = columns.first().map_or(0, Vec::len);
    assert!(columns.iter().all(|c| c.len() == len), "ragged shares");
    (0..len)
        .map(|i| {
            let shares: Vec<_> = columns.iter().map(|c| c[i].clone()).collect();
            reconstruct(field, &shares)
        })
        .collect()
}
