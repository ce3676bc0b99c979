//! Fan the dealer's output out to per-party stores.
//!
//! Each store given here holds the namespaces of *all* parties, which is how
//! local test setups simulate a network of players. Material is generated once
//! per call and written in full to every store that does not have it yet.
//!
//! The modulus and key share records go in last, with party 1's modulus the
//! very last record of a store. A run that dies midway thus leaves that
//! record missing and the next run starts over. Namespaces of a store being
//! regenerated are cleared first so no stale item outlives a rerun with
//! smaller counts.

use num_bigint::BigUint;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::DealerConfig,
    schemes::spdz::preprocessing::{DealerError, PreprocessedValues},
    storage::{
        keys::{self, MODULUS_KEY, SSK_KEY},
        Storage, StorageError, StreamedStorage,
    },
};

#[derive(Error, Debug)]
pub enum DistributeError {
    #[error(transparent)]
    Dealer(#[from] DealerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Streamed storage needs at least one thread")]
    NoThreads,
}

/// Populate every store that has no preprocessed material yet.
///
/// Returns how many stores were written; zero means nothing was sampled.
#[tracing::instrument(skip_all, fields(stores = stores.len(), parties = config.parties))]
pub fn init_storage<S: Storage>(
    stores: &mut [S],
    config: &DealerConfig,
) -> Result<usize, DistributeError> {
    let probe_name = keys::storage_name(1);
    let missing: Vec<usize> = stores
        .iter()
        .enumerate()
        .filter(|(i, store)| {
            let present = match store.get_object::<BigUint>(&probe_name, MODULUS_KEY) {
                Ok(modulus) => modulus.is_some(),
                Err(e) => {
                    warn!("Probing store {i} failed, regenerating it: {e}");
                    false
                }
            };
            debug!("Store {i} populated: {present}");
            !present
        })
        .map(|(i, _)| i)
        .collect();

    if missing.is_empty() {
        info!("All stores already hold preprocessed data");
        return Ok(0);
    }

    let values = generate(config)?;
    for &i in &missing {
        info!("Writing preprocessed data to store {i}");
        let store = &mut stores[i];
        for party in 1..=config.parties {
            store.clear(&keys::storage_name(party))?;
        }
        write_store(store, &values)?;
    }
    Ok(missing.len())
}

/// Streamed counterpart of [`init_storage`].
///
/// Every party's records are duplicated into each of its `threads`
/// namespaces. Streams of a store being regenerated are truncated first.
#[tracing::instrument(skip_all, fields(stores = stores.len(), parties = config.parties, threads = config.threads))]
pub fn init_streamed_storage<S: StreamedStorage>(
    stores: &mut [S],
    config: &DealerConfig,
) -> Result<usize, DistributeError> {
    let threads = config.threads;
    if threads == 0 {
        return Err(DistributeError::NoThreads);
    }
    // The last namespace to receive its modulus.
    let probe_key = format!(
        "{}{MODULUS_KEY}",
        keys::streamed_name(threads, config.parties, threads - 1)
    );
    let mut missing = vec![];
    for (i, store) in stores.iter_mut().enumerate() {
        let present = match store.peek_next::<BigUint>(&probe_key) {
            Ok(modulus) => modulus.is_some(),
            Err(e) => {
                warn!("Probing streamed store {i} failed, regenerating it: {e}");
                false
            }
        };
        debug!("Streamed store {i} populated: {present}");
        if !present {
            missing.push(i);
        }
    }

    if missing.is_empty() {
        info!("All streamed stores already hold preprocessed data");
        return Ok(0);
    }

    let values = generate(config)?;
    for &i in &missing {
        info!("Writing preprocessed streams to store {i}");
        let mut streams = Streams {
            store: &mut stores[i],
            threads,
        };
        streams.clear(config.parties)?;
        streams.write(&values)?;
    }
    Ok(missing.len())
}

fn generate(config: &DealerConfig) -> Result<PreprocessedValues, DealerError> {
    info!("Generating preprocessed data");
    let mut dealer = config.dealer()?;
    dealer.preprocess(&config.counts, config.permutation_shape)
}

fn write_store<S: Storage>(store: &mut S, values: &PreprocessedValues) -> Result<(), StorageError> {
    let parties = values.key_shares.len();
    let names: Vec<String> = (1..=parties).map(keys::storage_name).collect();

    for (counter, triple) in values.triplets.iter().enumerate() {
        for (name, share) in names.iter().zip(triple) {
            store.put_object(name, &keys::triple_key(counter), share)?;
        }
    }

    for (owner, masks) in values.input_masks.iter().enumerate() {
        let mut counters = vec![0usize; parties];
        for mask in masks {
            for ((name, share), counter) in names.iter().zip(mask).zip(counters.iter_mut()) {
                store.put_object(name, &keys::input_key(owner + 1, *counter), share)?;
                *counter += 1;
            }
        }
    }

    for (counter, bit) in values.bits.iter().enumerate() {
        for (name, share) in names.iter().zip(bit) {
            store.put_object(name, &keys::bit_key(counter), share)?;
        }
    }

    for (counter, pipe) in values.exp_pipes.iter().enumerate() {
        for (name, share) in names.iter().zip(pipe) {
            store.put_object(name, &keys::exp_pipe_key(counter), share)?;
        }
    }

    for (counter, perm) in values.permutations.iter().enumerate() {
        for (name, share) in names.iter().zip(perm) {
            store.put_object(name, &keys::perm_key(counter), share)?;
        }
    }

    // Party 1 last: its modulus marks the store as complete.
    for (name, key_share) in names.iter().zip(&values.key_shares).rev() {
        store.put_object(name, SSK_KEY, key_share)?;
        store.put_object(name, MODULUS_KEY, &values.modulus)?;
    }
    Ok(())
}

/// A streamed store seen as per-party, per-thread queues.
struct Streams<'a, S> {
    store: &'a mut S,
    threads: usize,
}

impl<S: StreamedStorage> Streams<'_, S> {
    /// Stream keys one party owns in one thread namespace.
    fn tags(parties: usize) -> Vec<String> {
        let mut tags: Vec<String> = [
            keys::TRIPLE_STORAGE,
            keys::BIT_STORAGE,
            keys::EXP_PIPE_STORAGE,
            keys::PERM_STORAGE,
            MODULUS_KEY,
            SSK_KEY,
        ]
        .into_iter()
        .map(String::from)
        .collect();
        tags.extend((1..=parties).map(keys::input_stream));
        tags
    }

    fn clear(&mut self, parties: usize) -> Result<(), StorageError> {
        let tags = Self::tags(parties);
        for party in 1..=parties {
            for thread in 0..self.threads {
                let name = keys::streamed_name(self.threads, party, thread);
                for tag in &tags {
                    self.store.truncate(&format!("{name}{tag}"))?;
                }
            }
        }
        Ok(())
    }

    /// Append `value` to stream `tag` of every thread namespace of `party`.
    fn put<T: serde::Serialize + ?Sized>(
        &mut self,
        party: usize,
        tag: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        for thread in 0..self.threads {
            let name = keys::streamed_name(self.threads, party, thread);
            self.store.put_next(&format!("{name}{tag}"), value)?;
        }
        Ok(())
    }

    /// Write one item, given as its per-party shares, to stream `tag`.
    fn put_item<T: serde::Serialize>(&mut self, tag: &str, shares: &[T]) -> Result<(), StorageError> {
        for (i, share) in shares.iter().enumerate() {
            self.put(i + 1, tag, share)?;
        }
        Ok(())
    }

    fn write(&mut self, values: &PreprocessedValues) -> Result<(), StorageError> {
        for triple in &values.triplets {
            self.put_item(keys::TRIPLE_STORAGE, triple)?;
        }
        for (owner, masks) in values.input_masks.iter().enumerate() {
            let tag = keys::input_stream(owner + 1);
            for mask in masks {
                self.put_item(&tag, mask)?;
            }
        }
        for bit in &values.bits {
            self.put_item(keys::BIT_STORAGE, bit)?;
        }
        for pipe in &values.exp_pipes {
            self.put_item(keys::EXP_PIPE_STORAGE, pipe)?;
        }
        for perm in &values.permutations {
            self.put_item(keys::PERM_STORAGE, perm)?;
        }
        for (i, key_share) in values.key_shares.iter().enumerate() {
            self.put(i + 1, SSK_KEY, key_share)?;
            self.put(i + 1, MODULUS_KEY, &values.modulus)?;
        }
        Ok(())
    }
}
