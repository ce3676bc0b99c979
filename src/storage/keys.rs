//! Names under which preprocessed items are stored.
//!
//! Random-access stores use one namespace per party,
//! `SPDZ_STORAGE_{party}`, with keys such as `TRIPLE_{counter}`. Streamed
//! stores fold everything into the key,
//! `SPDZ_STORAGE_{threads}_{party}_{thread}_{tag}`, and hand values out in
//! the order they were put. Parties are counted from 1, threads from 0.

pub const STORAGE_NAME_PREFIX: &str = "SPDZ_STORAGE_";
pub const MODULUS_KEY: &str = "MODULUS";
pub const SSK_KEY: &str = "SSK";

pub const TRIPLE_KEY_PREFIX: &str = "TRIPLE_";
pub const INPUT_KEY_PREFIX: &str = "INPUT_";
pub const BIT_KEY_PREFIX: &str = "BIT_";
pub const EXP_PIPE_KEY_PREFIX: &str = "EXP_PIPE_";
pub const PERM_KEY_PREFIX: &str = "PERM_";

pub const TRIPLE_STORAGE: &str = "TRIPLE";
pub const INPUT_STORAGE: &str = "INPUT";
pub const BIT_STORAGE: &str = "BIT";
pub const EXP_PIPE_STORAGE: &str = "EXP_PIPE";
pub const PERM_STORAGE: &str = "PERM";

pub fn storage_name(party: usize) -> String {
    format!("{STORAGE_NAME_PREFIX}{party}")
}

pub fn triple_key(counter: usize) -> String {
    format!("{TRIPLE_KEY_PREFIX}{counter}")
}

pub fn input_key(owner: usize, counter: usize) -> String {
    format!("{INPUT_KEY_PREFIX}{owner}_{counter}")
}

pub fn bit_key(counter: usize) -> String {
    format!("{BIT_KEY_PREFIX}{counter}")
}

pub fn exp_pipe_key(counter: usize) -> String {
    format!("{EXP_PIPE_KEY_PREFIX}{counter}")
}

pub fn perm_key(counter: usize) -> String {
    format!("{PERM_KEY_PREFIX}{counter}")
}

/// Key prefix of one party's stream for one worker thread.
pub fn streamed_name(threads: usize, party: usize, thread: usize) -> String {
    format!("{STORAGE_NAME_PREFIX}{threads}_{party}_{thread}_")
}

/// Stream of input masks owned by `owner`.
pub fn input_stream(owner: usize) -> String {
    format!("{INPUT_STORAGE}{owner}")
}
