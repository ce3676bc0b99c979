//! Arguments of the flat-file batch tool.
//!
//! Flags take the form `-x=value`. All of `-m -t -i -b -e -p -d` are
//! required; `-r` (permutations) and `-s` (seed) are optional. Unknown and
//! malformed arguments are reported as warnings and otherwise ignored.

use std::{path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::config::{DealerConfig, RandomSource};

pub const USAGE: &str = "Please give the following arguments: \
-m=[modulus] -t=[#triples] -i=[#inputs (per player)] -b=[#bits] \
-e=[#exp pipes] -p=[#parties] -d=[directory (to store files)]. \
Optional: -r=[#permutations] -s=[seed]";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgsError {
    #[error("{}\nThe following arguments were missing: {}", USAGE, .0.join(" "))]
    Missing(Vec<&'static str>),
    #[error("Invalid value {value:?} for {flag}")]
    InvalidValue { flag: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub config: DealerConfig,
    pub warnings: Vec<String>,
}

#[derive(Default)]
struct Seen {
    modulus: bool,
    triples: bool,
    inputs: bool,
    bits: bool,
    exp_pipes: bool,
    parties: bool,
    dir: bool,
}

fn parse<T: FromStr>(flag: &'static str, value: &str) -> Result<T, ArgsError> {
    value.parse().map_err(|_| ArgsError::InvalidValue {
        flag,
        value: value.to_owned(),
    })
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<ParsedArgs, ArgsError> {
    let mut config = DealerConfig::default();
    let mut seen = Seen::default();
    let mut warnings = vec![];

    for arg in args {
        let split = (arg.len() >= 4).then(|| arg.get(..3).zip(arg.get(3..))).flatten();
        let Some((flag, value)) = split else {
            warnings.push(format!("Malformed argument {arg:?}"));
            continue;
        };
        match flag {
            "-m=" => {
                config.modulus = parse("-m=", value)?;
                seen.modulus = true;
            }
            "-t=" => {
                config.counts.triples = parse("-t=", value)?;
                seen.triples = true;
            }
            "-i=" => {
                config.counts.input_masks = parse("-i=", value)?;
                seen.inputs = true;
            }
            "-b=" => {
                config.counts.bits = parse("-b=", value)?;
                seen.bits = true;
            }
            "-e=" => {
                config.counts.exp_pipes = parse("-e=", value)?;
                seen.exp_pipes = true;
            }
            "-p=" => {
                config.parties = parse("-p=", value)?;
                seen.parties = true;
            }
            "-d=" => {
                config.output_dir = PathBuf::from(value);
                seen.dir = true;
            }
            "-r=" => config.counts.permutations = parse("-r=", value)?,
            "-s=" => config.random_source = RandomSource::Seeded(parse("-s=", value)?),
            _ => warnings.push(format!("Unrecognized argument {arg:?}")),
        }
    }

    let missing: Vec<_> = [
        (seen.modulus, "-m=[modulus]"),
        (seen.triples, "-t=[#triples]"),
        (seen.inputs, "-i=[#inputs]"),
        (seen.bits, "-b=[#bits]"),
        (seen.parties, "-p=[#parties]"),
        (seen.exp_pipes, "-e=[#exp pipes]"),
        (seen.dir, "-d=[directory]"),
    ]
    .into_iter()
    .filter(|(present, _)| !present)
    .map(|(_, flag)| flag)
    .collect();
    if !missing.is_empty() {
        return Err(ArgsError::Missing(missing));
    }
    Ok(ParsedArgs { config, warnings })
}
