// Preprocessing

use crate::{
    algebra::field::{Field, FieldError, PrimeField},
    config::{ItemCounts, PermutationShape, EXP_PIPE_SIZE},
    schemes::spdz::{MacKey, Share},
};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{Rng, RngCore};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DealerError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("At least one party is needed")]
    NoParties,
    #[error("Exponentiation pipes need at least one element")]
    EmptyPipe,
    #[error("Permutation shape {rows}x{columns} is empty")]
    EmptyShape { rows: usize, columns: usize },
    #[error("{0} has no inverse modulo the field modulus")]
    NotInvertible(BigUint),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MultiplicationTriple {
    pub shares: (Share, Share, Share),
}

impl MultiplicationTriple {
    pub fn new(a: Share, b: Share, c: Share) -> Self {
        MultiplicationTriple { shares: (a, b, c) }
    }
}

/// A party's share of an input mask.
///
/// Only the party owning the mask knows it in the clear.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InputMask {
    pub share: Share,
    pub mask: Option<BigUint>,
}

/// A party's shares of `[r^-1, r, r^2, ...]` for one random `r`.
pub type ExpPipe = Vec<Share>;

/// A party's shares of one shuffle item.
///
/// The layout is fixed: the random matrix `R` row-major, then the permutation
/// as one-hot rows, then the rows of `R` in permuted order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PermutationShare {
    shape: PermutationShape,
    shares: Vec<Share>,
}

impl PermutationShare {
    pub fn shape(&self) -> PermutationShape {
        self.shape
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    pub fn into_shares(self) -> Vec<Share> {
        self.shares
    }

    pub fn matrix(&self) -> &[Share] {
        &self.shares[..self.shape.matrix_len()]
    }

    pub fn permutation(&self) -> &[Share] {
        let start = self.shape.matrix_len();
        &self.shares[start..start + self.shape.permutation_len()]
    }

    pub fn permuted(&self) -> &[Share] {
        &self.shares[self.shape.matrix_len() + self.shape.permutation_len()..]
    }
}

/// Everything one run hands out, indexed by item first and party last.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PreprocessedValues {
    pub modulus: BigUint,
    pub key_shares: Vec<BigUint>,
    pub triplets: Vec<Vec<MultiplicationTriple>>,
    /// Indexed by owning party, then item, then receiving party.
    pub input_masks: Vec<Vec<Vec<InputMask>>>,
    pub bits: Vec<Vec<Share>>,
    pub exp_pipes: Vec<Vec<ExpPipe>>,
    pub permutations: Vec<Vec<PermutationShare>>,
}

/// Trusted dealer producing correlated randomness for `parties` parties.
///
/// All sampling goes through one random source, in call order, so a seeded
/// source reproduces a run exactly.
pub struct Dealer<R> {
    field: PrimeField,
    key: MacKey,
    parties: usize,
    pipe_length: usize,
    rng: R,
}

impl<R: RngCore> Dealer<R> {
    pub fn new(field: PrimeField, key: MacKey, parties: usize, rng: R) -> Result<Self, DealerError> {
        if parties == 0 {
            return Err(DealerError::NoParties);
        }
        Ok(Self {
            field,
            key,
            parties,
            pipe_length: EXP_PIPE_SIZE,
            rng,
        })
    }

    /// Sample the MAC key from `rng` before anything else.
    pub fn with_random_key(field: PrimeField, parties: usize, mut rng: R) -> Result<Self, DealerError> {
        let key = MacKey::random(&field, &mut rng);
        Self::new(field, key, parties, rng)
    }

    pub fn with_pipe_length(mut self, pipe_length: usize) -> Result<Self, DealerError> {
        if pipe_length == 0 {
            return Err(DealerError::EmptyPipe);
        }
        self.pipe_length = pipe_length;
        Ok(self)
    }

    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    pub fn key(&self) -> &MacKey {
        &self.key
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    pub fn pipe_length(&self) -> usize {
        self.pipe_length
    }

    /// Authenticate `value` and share it among all parties.
    pub fn share(&mut self, value: &BigUint) -> Vec<Share> {
        self.key
            .authenticate(&self.field, &mut self.rng, value, self.parties)
    }

    /// Fresh sharing of the MAC key.
    pub fn key_shares(&mut self) -> Vec<BigUint> {
        self.key.split(&self.field, &mut self.rng, self.parties)
    }

    /// One multiplication triple, one entry per party.
    pub fn triple(&mut self) -> Vec<MultiplicationTriple> {
        let a = self.field.sample(&mut self.rng);
        let a_shares = self.share(&a);
        let b = self.field.sample(&mut self.rng);
        let b_shares = self.share(&b);
        let c = self.field.mul(&a, &b);
        let c_shares = self.share(&c);
        itertools::izip!(a_shares, b_shares, c_shares)
            .map(|(a, b, c)| MultiplicationTriple::new(a, b, c))
            .collect()
    }

    pub fn triples(&mut self, amount: usize) -> Vec<Vec<MultiplicationTriple>> {
        (0..amount).map(|_| self.triple()).collect()
    }

    /// One input mask owned by `owner` (0-based), one entry per party.
    pub fn input_mask(&mut self, owner: usize) -> Vec<InputMask> {
        let mask = self.field.sample(&mut self.rng);
        let shares = self.share(&mask);
        shares
            .into_iter()
            .enumerate()
            .map(|(party, share)| InputMask {
                share,
                mask: (party == owner).then(|| mask.clone()),
            })
            .collect()
    }

    /// `amount` input masks for every owning party.
    pub fn input_masks(&mut self, amount: usize) -> Vec<Vec<Vec<InputMask>>> {
        (0..self.parties)
            .map(|owner| (0..amount).map(|_| self.input_mask(owner)).collect())
            .collect()
    }

    /// A shared random bit.
    pub fn bit(&mut self) -> Vec<Share> {
        let bit = self.field.sample_bit(&mut self.rng);
        self.share(&bit)
    }

    pub fn bits(&mut self, amount: usize) -> Vec<Vec<Share>> {
        (0..amount).map(|_| self.bit()).collect()
    }

    /// One exponentiation pipe, one `[r^-1, r, r^2, ..]` vector per party.
    pub fn exp_pipe(&mut self) -> Result<Vec<ExpPipe>, DealerError> {
        let r = loop {
            let r = self.field.sample(&mut self.rng);
            if !r.is_zero() {
                break r;
            }
        };
        let r_inv = self
            .field
            .inverse(&r)
            .ok_or_else(|| DealerError::NotInvertible(r.clone()))?;

        let mut pipes: Vec<ExpPipe> = (0..self.parties)
            .map(|_| Vec::with_capacity(self.pipe_length))
            .collect();
        let shares = self.share(&r_inv);
        append_shares(&mut pipes, shares);

        let mut exp = BigUint::one();
        for _ in 1..self.pipe_length {
            exp = self.field.mul(&exp, &r);
            let shares = self.share(&exp);
            append_shares(&mut pipes, shares);
        }
        Ok(pipes)
    }

    pub fn exp_pipes(&mut self, amount: usize) -> Result<Vec<Vec<ExpPipe>>, DealerError> {
        (0..amount).map(|_| self.exp_pipe()).collect()
    }

    /// One shuffle item, one flat share vector per party.
    pub fn permutation(&mut self, shape: PermutationShape) -> Result<Vec<PermutationShare>, DealerError> {
        if shape.is_empty() {
            return Err(DealerError::EmptyShape {
                rows: shape.rows,
                columns: shape.columns,
            });
        }
        let PermutationShape { rows, columns } = shape;
        let mut blocks: Vec<Vec<Share>> = (0..self.parties)
            .map(|_| Vec::with_capacity(shape.len()))
            .collect();

        let mut matrix = Vec::with_capacity(shape.matrix_len());
        for _ in 0..shape.matrix_len() {
            let x = self.field.sample(&mut self.rng);
            let shares = self.share(&x);
            append_shares(&mut blocks, shares);
            matrix.push(x);
        }

        // Fisher-Yates
        let mut permutation: Vec<usize> = (0..rows).collect();
        for i in 0..rows {
            let j = self.rng.gen_range(i..rows);
            permutation.swap(i, j);
        }

        let one = BigUint::one();
        let zero = BigUint::zero();
        for &target in &permutation {
            for j in 0..rows {
                let entry = if target == j { &one } else { &zero };
                let shares = self.share(entry);
                append_shares(&mut blocks, shares);
            }
        }

        for &target in &permutation {
            for entry in &matrix[target * columns..(target + 1) * columns] {
                let shares = self.share(entry);
                append_shares(&mut blocks, shares);
            }
        }

        Ok(blocks
            .into_iter()
            .map(|shares| PermutationShare { shape, shares })
            .collect())
    }

    pub fn permutations(
        &mut self,
        amount: usize,
        shape: PermutationShape,
    ) -> Result<Vec<Vec<PermutationShare>>, DealerError> {
        (0..amount).map(|_| self.permutation(shape)).collect()
    }

    /// Produce a key sharing and every item kind in one go.
    #[tracing::instrument(skip_all, fields(parties = self.parties))]
    pub fn preprocess(
        &mut self,
        counts: &ItemCounts,
        shape: PermutationShape,
    ) -> Result<PreprocessedValues, DealerError> {
        let key_shares = self.key_shares();
        tracing::info!("Generating {} triples", counts.triples);
        let triplets = self.triples(counts.triples);
        tracing::info!("Generating {} input masks per party", counts.input_masks);
        let input_masks = self.input_masks(counts.input_masks);
        tracing::info!("Generating {} bits", counts.bits);
        let bits = self.bits(counts.bits);
        tracing::info!("Generating {} exponentiation pipes", counts.exp_pipes);
        let exp_pipes = self.exp_pipes(counts.exp_pipes)?;
        tracing::info!("Generating {} permutations", counts.permutations);
        let permutations = self.permutations(counts.permutations, shape)?;
        Ok(PreprocessedValues {
            modulus: self.field.modulus().clone(),
            key_shares,
            triplets,
            input_masks,
            bits,
            exp_pipes,
            permutations,
        })
    }
}

fn append_shares(columns: &mut [Vec<Share>], shares: Vec<Share>) {
    debug_assert_eq!(columns.len(), shares.len());
    for (column, share) in columns.iter_mut().zip(shares) {
        column.push(share);
    }
}
