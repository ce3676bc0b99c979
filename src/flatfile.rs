//! Preprocessed material as plain files, one set per party.
//!
//! The batch tool writes, for every party `i` (counted from 0):
//!
//! * `Exp-pipe-p-P{i}`, `Triples-p-P{i}`, `Bits-p-P{i}`, `Perm-p-P{i}`:
//!   back-to-back share records of [`Codec::share_len`] bytes each.
//! * `Inputs-p-P{i}-{owner}`: input mask shares for masks owned by `owner`.
//!   In the owner's own file every share is followed by the mask itself.
//! * `Global-data-p-P{i}`: text, `"{modulus} {key_share}"`.
//!
//! All files are produced from one [`Dealer`], so a seeded run is
//! reproducible byte for byte.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use num_bigint::BigUint;
use rand::RngCore;
use thiserror::Error;

use crate::{
    codec::{Codec, CodecError},
    config::DealerConfig,
    schemes::spdz::{
        preprocessing::{Dealer, DealerError},
        Share,
    },
};

pub const TRIPLES_FILENAME: &str = "Triples-p-P";
pub const EXP_PIPE_FILENAME: &str = "Exp-pipe-p-P";
pub const GLOBAL_FILENAME: &str = "Global-data-p-P";
pub const INPUTS_FILENAME: &str = "Inputs-p-P";
pub const BITS_FILENAME: &str = "Bits-p-P";
pub const PERM_FILENAME: &str = "Perm-p-P";

#[derive(Error, Debug)]
pub enum FlatFileError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Dealer(#[from] DealerError),
    #[error("Malformed global data: {0:?}")]
    MalformedGlobal(String),
}

/// Path of `party`'s file of the kind given by `prefix`.
pub fn party_file(dir: &Path, prefix: &str, party: usize) -> PathBuf {
    dir.join(format!("{prefix}{party}"))
}

/// Path of `receiver`'s shares of the masks owned by `owner`.
pub fn inputs_file(dir: &Path, receiver: usize, owner: usize) -> PathBuf {
    dir.join(format!("{INPUTS_FILENAME}{receiver}-{owner}"))
}

/// Generate everything `config` asks for and write it below
/// `config.output_dir`, creating the directory if needed.
#[tracing::instrument(skip_all, fields(dir = %config.output_dir.display(), parties = config.parties))]
pub fn generate(config: &DealerConfig) -> Result<(), FlatFileError> {
    // The MAC key is the first thing drawn from the random source.
    let mut dealer = config.dealer()?;
    fs::create_dir_all(&config.output_dir)?;
    let mut writer = Writer {
        dir: &config.output_dir,
        codec: Codec::new(dealer.field()),
        dealer: &mut dealer,
    };
    let counts = &config.counts;
    writer.exp_pipes(counts.exp_pipes)?;
    writer.triples(counts.triples)?;
    writer.inputs(counts.input_masks)?;
    writer.bits(counts.bits)?;
    writer.permutations(counts.permutations, config)?;
    writer.global()
}

struct Writer<'a, R> {
    dir: &'a Path,
    codec: Codec,
    dealer: &'a mut Dealer<R>,
}

impl<R: RngCore> Writer<'_, R> {
    fn open(&self, prefix: &str) -> Result<Channels, FlatFileError> {
        let paths = (0..self.dealer.parties()).map(|i| party_file(self.dir, prefix, i));
        Channels::create(self.codec, paths)
    }

    fn exp_pipes(&mut self, amount: usize) -> Result<(), FlatFileError> {
        tracing::info!("Writing {amount} exponentiation pipes");
        let mut out = self.open(EXP_PIPE_FILENAME)?;
        for _ in 0..amount {
            let pipe = self.dealer.exp_pipe()?;
            for (party, shares) in pipe.iter().enumerate() {
                for share in shares {
                    out.put_share(party, share)?;
                }
            }
        }
        out.finish()?;
        tracing::info!("Done writing exponentiation pipes");
        Ok(())
    }

    fn triples(&mut self, amount: usize) -> Result<(), FlatFileError> {
        tracing::info!("Writing {amount} triples");
        let mut out = self.open(TRIPLES_FILENAME)?;
        for _ in 0..amount {
            for (party, triple) in self.dealer.triple().iter().enumerate() {
                let (a, b, c) = &triple.shares;
                out.put_share(party, a)?;
                out.put_share(party, b)?;
                out.put_share(party, c)?;
            }
        }
        out.finish()?;
        tracing::info!("Done writing triples");
        Ok(())
    }

    fn inputs(&mut self, amount: usize) -> Result<(), FlatFileError> {
        tracing::info!("Writing {amount} input masks per party");
        let parties = self.dealer.parties();
        for owner in 0..parties {
            let paths = (0..parties).map(|receiver| inputs_file(self.dir, receiver, owner));
            let mut out = Channels::create(self.codec, paths)?;
            for _ in 0..amount {
                for (party, mask) in self.dealer.input_mask(owner).iter().enumerate() {
                    out.put_share(party, &mask.share)?;
                    if let Some(mask) = &mask.mask {
                        out.put_element(party, mask)?;
                    }
                }
            }
            out.finish()?;
        }
        tracing::info!("Done writing input masks");
        Ok(())
    }

    fn bits(&mut self, amount: usize) -> Result<(), FlatFileError> {
        tracing::info!("Writing {amount} bits");
        let mut out = self.open(BITS_FILENAME)?;
        for _ in 0..amount {
            for (party, share) in self.dealer.bit().iter().enumerate() {
                out.put_share(party, share)?;
            }
        }
        out.finish()?;
        tracing::info!("Done writing bits");
        Ok(())
    }

    fn permutations(&mut self, amount: usize, config: &DealerConfig) -> Result<(), FlatFileError> {
        tracing::info!("Writing {amount} permutations");
        let mut out = self.open(PERM_FILENAME)?;
        for _ in 0..amount {
            let item = self.dealer.permutation(config.permutation_shape)?;
            for (party, block) in item.iter().enumerate() {
                for share in block.shares() {
                    out.put_share(party, share)?;
                }
            }
        }
        out.finish()?;
        tracing::info!("Done writing permutations");
        Ok(())
    }

    fn global(&mut self) -> Result<(), FlatFileError> {
        tracing::info!("Writing global data");
        let modulus = self.dealer.field().modulus().clone();
        for (party, share) in self.dealer.key_shares().iter().enumerate() {
            let path = party_file(self.dir, GLOBAL_FILENAME, party);
            fs::write(path, format!("{modulus} {share}"))?;
        }
        tracing::info!("Done writing global data");
        Ok(())
    }
}

/// One buffered file per party.
///
/// Dropping without [`Channels::finish`] still closes the files, but flush
/// errors are lost.
struct Channels {
    codec: Codec,
    files: Vec<BufWriter<File>>,
    buf: Vec<u8>,
}

impl Channels {
    fn create(
        codec: Codec,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Result<Self, FlatFileError> {
        let files = paths
            .into_iter()
            .map(|path| File::create(path).map(BufWriter::new))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            codec,
            files,
            buf: Vec::with_capacity(codec.share_len()),
        })
    }

    fn put_share(&mut self, party: usize, share: &Share) -> Result<(), FlatFileError> {
        self.buf.clear();
        self.codec.encode_share(share, &mut self.buf)?;
        self.files[party].write_all(&self.buf)?;
        Ok(())
    }

    fn put_element(&mut self, party: usize, value: &BigUint) -> Result<(), FlatFileError> {
        self.buf.clear();
        self.codec.encode_element(value, &mut self.buf)?;
        self.files[party].write_all(&self.buf)?;
        Ok(())
    }

    fn finish(self) -> Result<(), FlatFileError> {
        for mut file in self.files {
            file.flush()?;
        }
        Ok(())
    }
}

/// Reads share records back from one of the files above.
pub struct Reader<R> {
    inner: R,
    codec: Codec,
}

impl Reader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, codec: Codec) -> Result<Self, FlatFileError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), codec))
    }
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R, codec: Codec) -> Self {
        Self { inner, codec }
    }

    /// Next share, or `None` if the file ends cleanly.
    pub fn next_share(&mut self) -> Result<Option<Share>, FlatFileError> {
        let mut buf = vec![0; self.codec.share_len()];
        if !self.fill(&mut buf)? {
            return Ok(None);
        }
        Ok(Some(self.codec.decode_share(&buf)?))
    }

    /// Next bare element, such as the mask in an owner's input file.
    pub fn next_element(&mut self) -> Result<Option<BigUint>, FlatFileError> {
        let mut buf = vec![0; self.codec.width()];
        if !self.fill(&mut buf)? {
            return Ok(None);
        }
        Ok(Some(self.codec.decode_element(&buf)?))
    }

    /// `false` at end of input, an error if it ends inside `buf`.
    fn fill(&mut self, buf: &mut [u8]) -> Result<bool, FlatFileError> {
        let mut read = 0;
        while read < buf.len() {
            match self.inner.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        match read {
            0 => Ok(false),
            n if n == buf.len() => Ok(true),
            got => Err(CodecError::Truncated {
                expected: buf.len(),
                got,
            }
            .into()),
        }
    }
}

/// Parse a global data file into `(modulus, key_share)`.
pub fn read_global(path: impl AsRef<Path>) -> Result<(BigUint, BigUint), FlatFileError> {
    let text = fs::read_to_string(path)?;
    let mut parts = text.split_whitespace();
    let (Some(modulus), Some(share), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(FlatFileError::MalformedGlobal(text));
    };
    match (modulus.parse(), share.parse()) {
        (Ok(modulus), Ok(share)) => Ok((modulus, share)),
        _ => Err(FlatFileError::MalformedGlobal(text)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{ItemCounts, RandomSource};

    #[test]
    fn reader_stops_at_clean_end() {
        let codec = Codec::with_width(2);
        let bytes = [0, 1, 0, 2, 0, 3];
        let mut reader = Reader::new(&bytes[..], codec);
        let share = reader.next_share().unwrap().unwrap();
        assert_eq!(share, Share::new(BigUint::from(1u8), BigUint::from(2u8)));
        assert_eq!(reader.next_element().unwrap(), Some(BigUint::from(3u8)));
        assert_eq!(reader.next_share().unwrap(), None);
    }

    #[test]
    fn reader_rejects_partial_records() {
        let codec = Codec::with_width(2);
        let bytes = [0, 1, 0];
        let mut reader = Reader::new(&bytes[..], codec);
        assert!(matches!(
            reader.next_share(),
            Err(FlatFileError::Codec(CodecError::Truncated { expected: 4, got: 3 }))
        ));
    }

    #[test]
    fn global_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g");
        fs::write(&path, "65521 42").unwrap();
        assert_eq!(
            read_global(&path).unwrap(),
            (BigUint::from(65521u32), BigUint::from(42u8))
        );
        fs::write(&path, "65521").unwrap();
        assert!(matches!(read_global(&path), Err(FlatFileError::MalformedGlobal(_))));
        fs::write(&path, "65521 x").unwrap();
        assert!(matches!(read_global(&path), Err(FlatFileError::MalformedGlobal(_))));
    }

    #[test]
    fn writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let config = DealerConfig {
            modulus: BigUint::from(65521u32),
            parties: 3,
            counts: ItemCounts {
                triples: 2,
                input_masks: 1,
                bits: 4,
                exp_pipes: 1,
                permutations: 0,
            },
            pipe_length: 5,
            output_dir: out.clone(),
            random_source: RandomSource::Seeded(0),
            ..Default::default()
        };
        generate(&config).unwrap();

        let share = 4u64;
        let len = |path: PathBuf| fs::metadata(path).unwrap().len();
        for i in 0..3 {
            assert_eq!(len(party_file(&out, TRIPLES_FILENAME, i)), 2 * 3 * share);
            assert_eq!(len(party_file(&out, EXP_PIPE_FILENAME, i)), 5 * share);
            assert_eq!(len(party_file(&out, BITS_FILENAME, i)), 4 * share);
            assert_eq!(len(party_file(&out, PERM_FILENAME, i)), 0);
            for owner in 0..3 {
                let expected = if owner == i { share + 2 } else { share };
                assert_eq!(len(inputs_file(&out, i, owner)), expected);
            }
            let (modulus, _) = read_global(party_file(&out, GLOBAL_FILENAME, i)).unwrap();
            assert_eq!(modulus, BigUint::from(65521u32));
        }
    }

    #[test]
    fn missing_directory_parent_is_created_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let config = DealerConfig {
            modulus: BigUint::from(7u8),
            parties: 1,
            output_dir: dir.path().join("a/b/c"),
            random_source: RandomSource::Seeded(0),
            ..Default::default()
        };
        generate(&config).unwrap();
        assert!(party_file(&config.output_dir, GLOBAL_FILENAME, 0).exists());
    }

    #[test]
    fn bad_modulus_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = DealerConfig {
            modulus: BigUint::from(1u8),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        assert!(matches!(generate(&config), Err(FlatFileError::Dealer(_))));
        assert!(!config.output_dir.exists());
    }
}
