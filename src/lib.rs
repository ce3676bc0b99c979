#![deny(unsafe_code)]

pub mod algebra;
pub mod cli;
pub mod codec;
pub mod config;
pub mod flatfile;
pub mod schemes;
pub mod storage;

#[cfg(test)]
mod testing;
