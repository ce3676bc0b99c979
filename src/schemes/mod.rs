//! Secret-sharing schemes.
//!
//! [`additive`] is plain n-out-of-n sharing over any [`Field`](crate::algebra::field::Field).
//! [`spdz`] layers information-theoretic MACs on top of it.

pub mod additive;
pub mod spdz;
